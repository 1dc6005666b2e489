use chrono::{DateTime, Utc};

use crate::models::{Relationship, RelationshipError, RelationshipKind, RelationshipStatus};

/// Result of a registry command: the relationship the caller asked about and
/// the records that must be written to make it so. No writes means the
/// registry already said this.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub relationship: Relationship,
    pub writes: Vec<Relationship>,
}

impl Outcome {
    fn unchanged(relationship: Relationship) -> Self {
        Self {
            relationship,
            writes: Vec::new(),
        }
    }

    pub fn is_change(&self) -> bool {
        !self.writes.is_empty()
    }
}

/// Patient-centred care network. Each `(patient, counterpart, kind)` has at
/// most one record; every "my donors" / "my patients" list is a query here.
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    records: Vec<Relationship>,
}

impl RelationshipRegistry {
    pub fn new(records: Vec<Relationship>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[Relationship] {
        &self.records
    }

    // ==========================================================================
    // VIEWS
    // ==========================================================================

    /// Latest active primary-doctor link for the patient.
    pub fn primary_doctor(&self, patient_id: &str) -> Option<&Relationship> {
        self.records
            .iter()
            .filter(|r| r.kind == RelationshipKind::PrimaryDoctor && r.patient_id == patient_id && r.is_active())
            .max_by_key(|r| r.since)
    }

    pub fn donors_of(&self, patient_id: &str) -> Vec<&Relationship> {
        self.active_where(|r| r.kind == RelationshipKind::RegularDonor && r.patient_id == patient_id)
    }

    pub fn patients_of_donor(&self, donor_id: &str) -> Vec<&Relationship> {
        self.active_where(|r| r.kind == RelationshipKind::RegularDonor && r.counterpart_id == donor_id)
    }

    pub fn patients_of_doctor(&self, doctor_id: &str) -> Vec<&Relationship> {
        let mut patients = self.active_where(|r| r.kind == RelationshipKind::PrimaryDoctor && r.counterpart_id == doctor_id);
        // A patient left with two active primaries after a partial write only
        // counts for the doctor that `primary_doctor` would report.
        patients.retain(|r| self.primary_doctor(&r.patient_id).map(|p| p.id) == Some(r.id));
        patients
    }

    fn active_where<F>(&self, predicate: F) -> Vec<&Relationship>
    where
        F: Fn(&Relationship) -> bool,
    {
        let mut matches: Vec<&Relationship> = self
            .records
            .iter()
            .filter(|r| r.is_active() && predicate(r))
            .collect();
        matches.sort_by_key(|r| r.since);
        matches
    }

    fn find(&self, patient_id: &str, counterpart_id: &str, kind: RelationshipKind) -> Option<&Relationship> {
        self.records.iter().find(|r| r.connects(patient_id, counterpart_id, kind))
    }

    // ==========================================================================
    // COMMANDS
    // ==========================================================================

    /// Makes `doctor_id` the patient's only active primary doctor.
    pub fn assign_primary_doctor(
        &mut self,
        patient_id: &str,
        doctor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome, RelationshipError> {
        validate_pair(patient_id, doctor_id)?;

        let others_active: Vec<Relationship> = self
            .records
            .iter()
            .filter(|r| {
                r.kind == RelationshipKind::PrimaryDoctor
                    && r.patient_id == patient_id
                    && r.counterpart_id != doctor_id
                    && r.is_active()
            })
            .cloned()
            .collect();

        let current = self.find(patient_id, doctor_id, RelationshipKind::PrimaryDoctor).cloned();
        if let Some(existing) = &current {
            if existing.is_active() && others_active.is_empty() {
                return Ok(Outcome::unchanged(existing.clone()));
            }
        }

        let relationship = match current {
            Some(existing) if existing.is_active() => existing,
            Some(mut inactive) => {
                inactive.status = RelationshipStatus::Active;
                inactive.since = now;
                inactive
            }
            None => Relationship::new(patient_id, doctor_id, RelationshipKind::PrimaryDoctor, now),
        };

        let mut writes = vec![relationship.clone()];
        for mut previous in others_active {
            previous.status = RelationshipStatus::Inactive;
            writes.push(previous);
        }

        self.apply(&writes);
        Ok(Outcome { relationship, writes })
    }

    /// Links a regular donor, stamping the patient's current primary doctor.
    pub fn link_regular_donor(
        &mut self,
        patient_id: &str,
        donor_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Outcome, RelationshipError> {
        validate_pair(patient_id, donor_id)?;

        let assigned_doctor_id = self.primary_doctor(patient_id).map(|r| r.counterpart_id.clone());

        let relationship = match self.find(patient_id, donor_id, RelationshipKind::RegularDonor).cloned() {
            Some(existing) if existing.is_active() => return Ok(Outcome::unchanged(existing)),
            Some(mut inactive) => {
                inactive.status = RelationshipStatus::Active;
                inactive.since = now;
                inactive.assigned_doctor_id = assigned_doctor_id;
                inactive
            }
            None => Relationship {
                assigned_doctor_id,
                ..Relationship::new(patient_id, donor_id, RelationshipKind::RegularDonor, now)
            },
        };

        let writes = vec![relationship.clone()];
        self.apply(&writes);
        Ok(Outcome { relationship, writes })
    }

    /// Activates or deactivates an existing relationship.
    pub fn set_status(
        &mut self,
        patient_id: &str,
        counterpart_id: &str,
        kind: RelationshipKind,
        status: RelationshipStatus,
        now: DateTime<Utc>,
    ) -> Result<Outcome, RelationshipError> {
        let existing = self
            .find(patient_id, counterpart_id, kind)
            .cloned()
            .ok_or_else(|| {
                RelationshipError::NotFound(format!("{} {} -> {}", kind, patient_id, counterpart_id))
            })?;

        match (kind, status) {
            _ if existing.status == status => Ok(Outcome::unchanged(existing)),
            (RelationshipKind::PrimaryDoctor, RelationshipStatus::Active) => {
                self.assign_primary_doctor(patient_id, counterpart_id, now)
            }
            (RelationshipKind::RegularDonor, RelationshipStatus::Active) => {
                self.link_regular_donor(patient_id, counterpart_id, now)
            }
            (_, RelationshipStatus::Inactive) => {
                let mut relationship = existing;
                relationship.status = RelationshipStatus::Inactive;
                let writes = vec![relationship.clone()];
                self.apply(&writes);
                Ok(Outcome { relationship, writes })
            }
        }
    }

    fn apply(&mut self, writes: &[Relationship]) {
        for write in writes {
            match self.records.iter_mut().find(|r| r.id == write.id) {
                Some(record) => *record = write.clone(),
                None => self.records.push(write.clone()),
            }
        }
    }
}

fn validate_pair(patient_id: &str, counterpart_id: &str) -> Result<(), RelationshipError> {
    if patient_id.trim().is_empty() || counterpart_id.trim().is_empty() {
        return Err(RelationshipError::Validation(
            "Both participant ids are required".to_string(),
        ));
    }
    if patient_id == counterpart_id {
        return Err(RelationshipError::Validation(
            "A patient cannot be linked to themselves".to_string(),
        ));
    }
    Ok(())
}
