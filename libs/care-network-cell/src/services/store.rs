use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::{StoreError, SupabaseClient};

use crate::models::Relationship;

#[async_trait]
pub trait RelationshipStore: Send + Sync {
    /// Every relationship where `participant_id` is the patient or the counterpart.
    async fn load(&self, participant_id: &str) -> Result<Vec<Relationship>, StoreError>;

    /// Insert or replace by id.
    async fn upsert(&self, relationship: &Relationship) -> Result<Relationship, StoreError>;
}

pub struct SupabaseRelationshipStore {
    supabase: SupabaseClient,
}

impl SupabaseRelationshipStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn upsert_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            "Prefer",
            HeaderValue::from_static("resolution=merge-duplicates,return=representation"),
        );
        headers
    }
}

#[async_trait]
impl RelationshipStore for SupabaseRelationshipStore {
    async fn load(&self, participant_id: &str) -> Result<Vec<Relationship>, StoreError> {
        let path = format!(
            "/rest/v1/relationships?or=(patient_id.eq.{id},counterpart_id.eq.{id})&order=since.asc",
            id = participant_id
        );
        let relationships: Vec<Relationship> = self.supabase.request(Method::GET, &path, None).await?;
        debug!("Loaded {} relationships for {}", relationships.len(), participant_id);
        Ok(relationships)
    }

    async fn upsert(&self, relationship: &Relationship) -> Result<Relationship, StoreError> {
        let rows: Vec<Relationship> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/relationships?on_conflict=id",
                Some(serde_json::to_value(relationship)?),
                Some(Self::upsert_headers()),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Upsert returned no relationship".to_string()))
    }
}
