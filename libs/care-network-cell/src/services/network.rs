use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::models::{
    Relationship, RelationshipChange, RelationshipError, RelationshipKind, RelationshipStatus, RelationshipView,
};
use crate::services::registry::{Outcome, RelationshipRegistry};
use crate::services::store::{RelationshipStore, SupabaseRelationshipStore};

pub struct CareNetworkService {
    store: Arc<dyn RelationshipStore>,
}

impl CareNetworkService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(SupabaseRelationshipStore::new(config)))
    }

    pub fn with_store(store: Arc<dyn RelationshipStore>) -> Self {
        Self { store }
    }

    async fn registry_for(&self, participant_id: &str) -> Result<RelationshipRegistry, RelationshipError> {
        Ok(RelationshipRegistry::new(self.store.load(participant_id).await?))
    }

    /// Writes in outcome order: the requested record first, then anything it
    /// supersedes, so a failed second write never leaves the patient without
    /// the new link.
    async fn persist(&self, outcome: Outcome) -> Result<RelationshipChange, RelationshipError> {
        let changed = outcome.is_change();
        let mut relationship = outcome.relationship;

        for write in &outcome.writes {
            let saved = self.store.upsert(write).await?;
            if saved.id == relationship.id {
                relationship = saved;
            }
        }

        Ok(RelationshipChange { relationship, changed })
    }

    pub async fn assign_primary_doctor(
        &self,
        patient_id: &str,
        doctor_id: &str,
    ) -> Result<RelationshipChange, RelationshipError> {
        let mut registry = self.registry_for(patient_id).await?;
        let outcome = registry.assign_primary_doctor(patient_id, doctor_id, Utc::now())?;

        if outcome.is_change() {
            info!("Assigning doctor {} as primary doctor of patient {}", doctor_id, patient_id);
        } else {
            debug!("Doctor {} already primary doctor of patient {}", doctor_id, patient_id);
        }
        self.persist(outcome).await
    }

    pub async fn link_regular_donor(
        &self,
        patient_id: &str,
        donor_id: &str,
    ) -> Result<RelationshipChange, RelationshipError> {
        let mut registry = self.registry_for(patient_id).await?;
        let outcome = registry.link_regular_donor(patient_id, donor_id, Utc::now())?;

        if outcome.is_change() {
            info!("Linking donor {} to patient {}", donor_id, patient_id);
        }
        self.persist(outcome).await
    }

    pub async fn update_status(
        &self,
        patient_id: &str,
        counterpart_id: &str,
        kind: RelationshipKind,
        status: RelationshipStatus,
    ) -> Result<RelationshipChange, RelationshipError> {
        let mut registry = self.registry_for(patient_id).await?;
        let outcome = registry.set_status(patient_id, counterpart_id, kind, status, Utc::now())?;

        if outcome.is_change() {
            info!("Marking {} {} -> {} as {}", kind, patient_id, counterpart_id, status);
        }
        self.persist(outcome).await
    }

    pub async fn donors_of_patient(&self, patient_id: &str) -> Result<RelationshipView, RelationshipError> {
        let registry = self.registry_for(patient_id).await?;
        Ok(view(patient_id, registry.donors_of(patient_id)))
    }

    pub async fn patients_of_donor(&self, donor_id: &str) -> Result<RelationshipView, RelationshipError> {
        let registry = self.registry_for(donor_id).await?;
        Ok(view(donor_id, registry.patients_of_donor(donor_id)))
    }

    pub async fn patients_of_doctor(&self, doctor_id: &str) -> Result<RelationshipView, RelationshipError> {
        let registry = self.registry_for(doctor_id).await?;

        // The doctor-side read does not include the patient's links to other
        // doctors, so the patient's own records decide who is current.
        let mut current = Vec::new();
        for relationship in registry.patients_of_doctor(doctor_id) {
            let patient_registry = self.registry_for(&relationship.patient_id).await?;
            if patient_registry.primary_doctor(&relationship.patient_id).map(|p| p.id) == Some(relationship.id) {
                current.push(relationship.clone());
            }
        }

        Ok(RelationshipView::new(doctor_id, current))
    }
}

fn view(participant_id: &str, relationships: Vec<&Relationship>) -> RelationshipView {
    RelationshipView::new(participant_id, relationships.into_iter().cloned().collect())
}
