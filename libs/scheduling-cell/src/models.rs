use std::fmt;

use chrono::{Duration, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shared_database::StoreError;
use shared_models::error::AppError;

// ==============================================================================
// SCHEDULE MODELS
// ==============================================================================

/// A recurring weekly interval during which a practitioner accepts bookings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingWindow {
    #[serde(with = "day_of_week")]
    pub day_of_week: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub slot_duration_minutes: u32,
    #[serde(default)]
    pub max_slots_per_day: Option<usize>,
}

impl WorkingWindow {
    pub fn new(day_of_week: Weekday, start_time: NaiveTime, end_time: NaiveTime, slot_duration_minutes: u32) -> Self {
        Self {
            day_of_week,
            start_time,
            end_time,
            slot_duration_minutes,
            max_slots_per_day: None,
        }
    }

    pub fn with_max_slots(mut self, max_slots_per_day: usize) -> Self {
        self.max_slots_per_day = Some(max_slots_per_day);
        self
    }

    pub fn slot_duration(&self) -> Duration {
        Duration::minutes(i64::from(self.slot_duration_minutes))
    }

    pub fn contains(&self, slot: &Slot) -> bool {
        self.start_time <= slot.start_time && slot.end_time <= self.end_time
    }

    pub fn validate(&self) -> Result<(), SchedulingError> {
        if self.start_time >= self.end_time {
            return Err(SchedulingError::Validation(format!(
                "Working window on {} starts at {} but ends at {}",
                self.day_of_week, self.start_time, self.end_time
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BookingStatus {
    #[serde(
        rename = "scheduled",
        alias = "active",
        alias = "confirmed",
        alias = "in_progress",
        alias = "completed",
        alias = "no-show",
        alias = "no_show"
    )]
    Active,
    #[serde(rename = "cancelled", alias = "canceled")]
    Cancelled,
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingStatus::Active => write!(f, "scheduled"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookedInterval {
    pub id: Uuid,
    pub practitioner_id: String,
    #[serde(default)]
    pub patient_id: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: BookingStatus,
}

impl BookedInterval {
    pub fn new(practitioner_id: &str, patient_id: Option<String>, slot: &Slot) -> Self {
        Self {
            id: Uuid::new_v4(),
            practitioner_id: practitioner_id.to_string(),
            patient_id,
            date: slot.date,
            start_time: slot.start_time,
            end_time: slot.end_time,
            status: BookingStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == BookingStatus::Active
    }

    /// The only permitted status change: active -> cancelled.
    pub fn cancel(&mut self) -> Result<(), SchedulingError> {
        match self.status {
            BookingStatus::Active => {
                self.status = BookingStatus::Cancelled;
                Ok(())
            }
            BookingStatus::Cancelled => Err(SchedulingError::InvalidTransition {
                from: BookingStatus::Cancelled.to_string(),
                to: BookingStatus::Cancelled.to_string(),
            }),
        }
    }
}

/// A fixed-duration interval on one date. Also used as the proposed interval
/// for a booking.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl Slot {
    pub fn new(date: NaiveDate, start_time: NaiveTime, end_time: NaiveTime) -> Result<Self, SchedulingError> {
        if start_time >= end_time {
            return Err(SchedulingError::Validation(format!(
                "Slot start {} must be before end {}",
                start_time, end_time
            )));
        }
        Ok(Self { date, start_time, end_time })
    }

    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Practitioner {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_accepting")]
    pub is_accepting_bookings: bool,
}

fn default_accepting() -> bool {
    true
}

// ==============================================================================
// REQUEST / RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
    pub duration_minutes: Option<u32>,
    pub max_daily: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailableSlotsResponse {
    pub practitioner_id: String,
    pub date: NaiveDate,
    pub available_slots: Vec<Slot>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IntervalRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookSlotRequest {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub patient_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictCheckResponse {
    pub has_conflict: bool,
    pub conflicting_bookings: Vec<BookedInterval>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum SchedulingError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Practitioner not found: {0}")]
    PractitionerNotFound(String),

    #[error("Booking not found: {0}")]
    BookingNotFound(String),

    #[error("The slot {start}-{end} on {date} is no longer available; request availability again and choose another slot")]
    SlotConflict {
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
    },

    #[error("Invalid booking transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl SchedulingError {
    pub fn slot_conflict(slot: &Slot) -> Self {
        SchedulingError::SlotConflict {
            date: slot.date,
            start: slot.start_time,
            end: slot.end_time,
        }
    }
}

impl SchedulingError {
    /// Store failure from a lookup where a missing row means `missing`.
    pub fn from_lookup(err: StoreError, missing: SchedulingError) -> Self {
        match err {
            StoreError::NotFound(_) => missing,
            other => other.into(),
        }
    }
}

/// A missing row outside a lookup is a store fault, not a 404.
impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        SchedulingError::Persistence(err.to_string())
    }
}

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match err {
            SchedulingError::Validation(msg) => AppError::ValidationError(msg),
            SchedulingError::PractitionerNotFound(_) | SchedulingError::BookingNotFound(_) => {
                AppError::NotFound(err.to_string())
            }
            SchedulingError::SlotConflict { .. } | SchedulingError::InvalidTransition { .. } => {
                AppError::Conflict(err.to_string())
            }
            SchedulingError::Persistence(msg) => AppError::Database(msg),
        }
    }
}

// ==============================================================================
// SERDE HELPERS
// ==============================================================================

/// Weekdays are stored as lowercase names ("monday"); numeric 0-6 with
/// 0 = Sunday is accepted on input.
pub mod day_of_week {
    use chrono::Weekday;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn name(day: Weekday) -> &'static str {
        match day {
            Weekday::Mon => "monday",
            Weekday::Tue => "tuesday",
            Weekday::Wed => "wednesday",
            Weekday::Thu => "thursday",
            Weekday::Fri => "friday",
            Weekday::Sat => "saturday",
            Weekday::Sun => "sunday",
        }
    }

    pub fn from_index(index: u64) -> Option<Weekday> {
        match index {
            0 => Some(Weekday::Sun),
            1 => Some(Weekday::Mon),
            2 => Some(Weekday::Tue),
            3 => Some(Weekday::Wed),
            4 => Some(Weekday::Thu),
            5 => Some(Weekday::Fri),
            6 => Some(Weekday::Sat),
            _ => None,
        }
    }

    pub fn serialize<S: Serializer>(day: &Weekday, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(name(*day))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Weekday, D::Error> {
        struct WeekdayVisitor;

        impl<'de> Visitor<'de> for WeekdayVisitor {
            type Value = Weekday;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a weekday name or a number 0 (Sunday) through 6 (Saturday)")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Weekday, E> {
                value
                    .trim()
                    .parse::<Weekday>()
                    .map_err(|_| E::custom(format!("unknown weekday '{}'", value)))
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Weekday, E> {
                from_index(value).ok_or_else(|| E::custom(format!("weekday index {} out of range", value)))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Weekday, E> {
                u64::try_from(value)
                    .ok()
                    .and_then(from_index)
                    .ok_or_else(|| E::custom(format!("weekday index {} out of range", value)))
            }
        }

        deserializer.deserialize_any(WeekdayVisitor)
    }
}
