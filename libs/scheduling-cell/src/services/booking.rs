use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::StoreError;

use crate::models::{BookedInterval, BookingStatus, ConflictCheckResponse, SchedulingError, Slot};
use crate::services::availability::within_working_hours;
use crate::services::conflict::conflicting_bookings;
use crate::services::store::{ScheduleStore, SupabaseScheduleStore};
use crate::services::workflow::{BookingState, BookingWorkflow};

pub struct BookingService {
    store: Arc<dyn ScheduleStore>,
}

impl BookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_store(Arc::new(SupabaseScheduleStore::new(config)))
    }

    pub fn with_store(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    /// Commit a chosen slot. The conflict check runs against a snapshot read
    /// here, not the one the slot list was computed from.
    pub async fn commit_booking(
        &self,
        practitioner_id: &str,
        slot: Slot,
        patient_id: Option<String>,
    ) -> Result<(BookedInterval, BookingState), SchedulingError> {
        info!(
            "Committing booking for practitioner {} on {} at {}",
            practitioner_id, slot.date, slot.start_time
        );

        self.ensure_practitioner(practitioner_id).await?;

        let windows = self.store.working_windows(practitioner_id).await?;
        if !within_working_hours(&windows, &slot) {
            return Err(SchedulingError::Validation(format!(
                "Slot {}-{} on {} is outside the practitioner's working hours",
                slot.start_time, slot.end_time, slot.date
            )));
        }

        let date = slot.date;
        let mut workflow = BookingWorkflow::new(practitioner_id, date);
        workflow.choose(slot)?;

        let live = self.store.bookings_for_date(practitioner_id, date).await?;
        let slot = workflow.verify_against(&live)?;

        let booking = BookedInterval::new(practitioner_id, patient_id, &slot);
        match self.store.insert_booking(&booking).await {
            Ok(saved) => {
                workflow.confirm(saved.clone())?;
                info!("Booking {} confirmed for practitioner {}", saved.id, practitioner_id);
                Ok((saved, workflow.state().clone()))
            }
            Err(StoreError::UniqueViolation(detail)) => {
                warn!("Store rejected booking as duplicate: {}", detail);
                Err(workflow.reject())
            }
            Err(other) => Err(SchedulingError::Persistence(other.to_string())),
        }
    }

    pub async fn cancel_booking(
        &self,
        practitioner_id: &str,
        booking_id: Uuid,
    ) -> Result<BookedInterval, SchedulingError> {
        debug!("Cancelling booking {} for practitioner {}", booking_id, practitioner_id);

        let not_found = || SchedulingError::BookingNotFound(booking_id.to_string());
        let mut booking = self
            .store
            .find_booking(practitioner_id, booking_id)
            .await
            .map_err(|err| SchedulingError::from_lookup(err, not_found()))?
            .ok_or_else(not_found)?;

        booking.cancel()?;

        match self.store.update_booking_status(booking_id, BookingStatus::Cancelled).await {
            Ok(updated) => Ok(updated),
            Err(err) => Err(SchedulingError::from_lookup(err, not_found())),
        }
    }

    /// Check a proposed interval against the live booking snapshot
    pub async fn check_conflicts(
        &self,
        practitioner_id: &str,
        proposed: &Slot,
    ) -> Result<ConflictCheckResponse, SchedulingError> {
        self.ensure_practitioner(practitioner_id).await?;

        let live = self.store.bookings_for_date(practitioner_id, proposed.date).await?;
        let overlapping: Vec<BookedInterval> = conflicting_bookings(&live, proposed).cloned().collect();
        if !overlapping.is_empty() {
            debug!("{} booking(s) overlap the proposed interval", overlapping.len());
        }

        Ok(ConflictCheckResponse {
            has_conflict: !overlapping.is_empty(),
            conflicting_bookings: overlapping,
        })
    }

    async fn ensure_practitioner(&self, practitioner_id: &str) -> Result<(), SchedulingError> {
        let practitioner = self.store.find_practitioner(practitioner_id).await.map_err(|err| {
            SchedulingError::from_lookup(err, SchedulingError::PractitionerNotFound(practitioner_id.to_string()))
        })?;
        match practitioner {
            Some(practitioner) if practitioner.is_accepting_bookings => Ok(()),
            _ => Err(SchedulingError::PractitionerNotFound(practitioner_id.to_string())),
        }
    }
}
