use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

// ==============================================================================
// RELATIONSHIP MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    /// Counterpart is the patient's primary doctor.
    PrimaryDoctor,
    /// Counterpart donates to the patient regularly.
    RegularDonor,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipKind::PrimaryDoctor => write!(f, "primary_doctor"),
            RelationshipKind::RegularDonor => write!(f, "regular_donor"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipStatus {
    Active,
    Inactive,
}

impl fmt::Display for RelationshipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipStatus::Active => write!(f, "active"),
            RelationshipStatus::Inactive => write!(f, "inactive"),
        }
    }
}

/// One edge of the care network, stored once and read from either side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: Uuid,
    pub patient_id: String,
    pub counterpart_id: String,
    pub kind: RelationshipKind,
    pub status: RelationshipStatus,
    pub since: DateTime<Utc>,
    /// For donor links: the patient's primary doctor when the link was made.
    #[serde(default)]
    pub assigned_doctor_id: Option<String>,
}

impl Relationship {
    pub fn new(patient_id: &str, counterpart_id: &str, kind: RelationshipKind, since: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            counterpart_id: counterpart_id.to_string(),
            kind,
            status: RelationshipStatus::Active,
            since,
            assigned_doctor_id: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RelationshipStatus::Active
    }

    pub fn connects(&self, patient_id: &str, counterpart_id: &str, kind: RelationshipKind) -> bool {
        self.kind == kind && self.patient_id == patient_id && self.counterpart_id == counterpart_id
    }
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AssignPrimaryDoctorRequest {
    pub patient_id: String,
    pub doctor_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinkRegularDonorRequest {
    pub patient_id: String,
    pub donor_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub patient_id: String,
    pub counterpart_id: String,
    pub kind: RelationshipKind,
    pub status: RelationshipStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipChange {
    pub relationship: Relationship,
    /// False when the request matched what was already recorded.
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RelationshipView {
    pub participant_id: String,
    pub relationships: Vec<Relationship>,
    pub total: usize,
}

impl RelationshipView {
    pub fn new(participant_id: &str, relationships: Vec<Relationship>) -> Self {
        Self {
            participant_id: participant_id.to_string(),
            total: relationships.len(),
            relationships,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum RelationshipError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Relationship not found: {0}")]
    NotFound(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<StoreError> for RelationshipError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(detail) => RelationshipError::NotFound(detail),
            other => RelationshipError::Persistence(other.to_string()),
        }
    }
}

impl From<RelationshipError> for AppError {
    fn from(err: RelationshipError) -> Self {
        match err {
            RelationshipError::Validation(msg) => AppError::ValidationError(msg),
            RelationshipError::NotFound(_) => AppError::NotFound(err.to_string()),
            RelationshipError::Persistence(msg) => AppError::Database(msg),
        }
    }
}
