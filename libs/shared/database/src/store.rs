use thiserror::Error;

use crate::supabase::error_status;

/// Failure at the persistence boundary, independent of the backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Uniqueness constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Malformed record: {0}")]
    Malformed(String),

    #[error("Store unavailable: {0}")]
    Backend(String),
}

impl From<anyhow::Error> for StoreError {
    fn from(err: anyhow::Error) -> Self {
        match error_status(&err) {
            Some(409) => StoreError::UniqueViolation(err.to_string()),
            Some(404) => StoreError::NotFound(err.to_string()),
            _ => StoreError::Backend(format!("{:#}", err)),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Malformed(err.to_string())
    }
}
