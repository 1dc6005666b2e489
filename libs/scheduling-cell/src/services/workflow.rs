use std::fmt;

use chrono::NaiveDate;
use tracing::warn;

use crate::models::{BookedInterval, SchedulingError, Slot};
use crate::services::conflict::conflicting_bookings;

#[derive(Debug, Clone, PartialEq)]
pub enum BookingState {
    Requested,
    SlotChosen { slot: Slot },
    Confirmed { booking: BookedInterval },
    ConflictRejected { slot: Slot },
}

impl BookingState {
    fn name(&self) -> &'static str {
        match self {
            BookingState::Requested => "requested",
            BookingState::SlotChosen { .. } => "slot_chosen",
            BookingState::Confirmed { .. } => "confirmed",
            BookingState::ConflictRejected { .. } => "conflict_rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingState::Confirmed { .. } | BookingState::ConflictRejected { .. })
    }
}

impl fmt::Display for BookingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `Requested -> SlotChosen -> Confirmed | ConflictRejected`.
///
/// Terminal states accept no further transitions: after a rejection the
/// caller starts a new workflow from fresh availability.
#[derive(Debug, Clone)]
pub struct BookingWorkflow {
    practitioner_id: String,
    date: NaiveDate,
    state: BookingState,
}

impl BookingWorkflow {
    pub fn new(practitioner_id: &str, date: NaiveDate) -> Self {
        Self {
            practitioner_id: practitioner_id.to_string(),
            date,
            state: BookingState::Requested,
        }
    }

    pub fn state(&self) -> &BookingState {
        &self.state
    }

    pub fn choose(&mut self, slot: Slot) -> Result<(), SchedulingError> {
        self.expect_requested("slot_chosen")?;

        if slot.date != self.date {
            return Err(SchedulingError::Validation(format!(
                "Slot date {} does not match requested date {}",
                slot.date, self.date
            )));
        }

        self.state = BookingState::SlotChosen { slot };
        Ok(())
    }

    /// Authoritative commit-time check against the live snapshot. On conflict
    /// the workflow ends in `ConflictRejected`.
    pub fn verify_against(&mut self, live: &[BookedInterval]) -> Result<Slot, SchedulingError> {
        let slot = self.chosen_slot("verify")?.clone();

        let conflicts = conflicting_bookings(live, &slot).count();
        if conflicts > 0 {
            warn!(
                "Slot {}-{} on {} for practitioner {} lost to {} booking(s)",
                slot.start_time, slot.end_time, slot.date, self.practitioner_id, conflicts
            );
            return Err(self.reject());
        }

        Ok(slot)
    }

    pub fn confirm(&mut self, booking: BookedInterval) -> Result<(), SchedulingError> {
        self.chosen_slot("confirmed")?;
        self.state = BookingState::Confirmed { booking };
        Ok(())
    }

    /// Ends the workflow in `ConflictRejected` and returns the matching error.
    pub fn reject(&mut self) -> SchedulingError {
        match std::mem::replace(&mut self.state, BookingState::Requested) {
            BookingState::SlotChosen { slot } => {
                let err = SchedulingError::slot_conflict(&slot);
                self.state = BookingState::ConflictRejected { slot };
                err
            }
            other => {
                let err = SchedulingError::InvalidTransition {
                    from: other.to_string(),
                    to: "conflict_rejected".to_string(),
                };
                self.state = other;
                err
            }
        }
    }

    fn expect_requested(&self, to: &str) -> Result<(), SchedulingError> {
        match self.state {
            BookingState::Requested => Ok(()),
            ref other => Err(SchedulingError::InvalidTransition {
                from: other.to_string(),
                to: to.to_string(),
            }),
        }
    }

    fn chosen_slot(&self, to: &str) -> Result<&Slot, SchedulingError> {
        match &self.state {
            BookingState::SlotChosen { slot } => Ok(slot),
            other => Err(SchedulingError::InvalidTransition {
                from: other.to_string(),
                to: to.to_string(),
            }),
        }
    }
}
