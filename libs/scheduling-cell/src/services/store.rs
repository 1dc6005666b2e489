use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Method;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{StoreError, SupabaseClient};

use crate::models::{BookedInterval, BookingStatus, Practitioner, WorkingWindow};

/// Read/write access to the system of record for schedules and bookings.
/// Every call reads a fresh snapshot; nothing is cached between requests.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn find_practitioner(&self, practitioner_id: &str) -> Result<Option<Practitioner>, StoreError>;

    async fn working_windows(&self, practitioner_id: &str) -> Result<Vec<WorkingWindow>, StoreError>;

    async fn bookings_for_date(
        &self,
        practitioner_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<BookedInterval>, StoreError>;

    async fn find_booking(
        &self,
        practitioner_id: &str,
        booking_id: Uuid,
    ) -> Result<Option<BookedInterval>, StoreError>;

    /// Must surface the `(resource, date, start_time, active)` uniqueness
    /// constraint as [`StoreError::UniqueViolation`].
    async fn insert_booking(&self, booking: &BookedInterval) -> Result<BookedInterval, StoreError>;

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<BookedInterval, StoreError>;
}

pub struct SupabaseScheduleStore {
    supabase: SupabaseClient,
}

impl SupabaseScheduleStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }
}

#[async_trait]
impl ScheduleStore for SupabaseScheduleStore {
    async fn find_practitioner(&self, practitioner_id: &str) -> Result<Option<Practitioner>, StoreError> {
        let path = format!("/rest/v1/practitioners?id=eq.{}", practitioner_id);
        let rows: Vec<Practitioner> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn working_windows(&self, practitioner_id: &str) -> Result<Vec<WorkingWindow>, StoreError> {
        let path = format!(
            "/rest/v1/working_windows?practitioner_id=eq.{}&order=start_time.asc",
            practitioner_id
        );
        let windows: Vec<WorkingWindow> = self.supabase.request(Method::GET, &path, None).await?;
        debug!("Loaded {} working windows for practitioner {}", windows.len(), practitioner_id);
        Ok(windows)
    }

    async fn bookings_for_date(
        &self,
        practitioner_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<BookedInterval>, StoreError> {
        let path = format!(
            "/rest/v1/booked_intervals?practitioner_id=eq.{}&date=eq.{}&order=start_time.asc",
            practitioner_id, date
        );
        let bookings: Vec<BookedInterval> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(bookings)
    }

    async fn find_booking(
        &self,
        practitioner_id: &str,
        booking_id: Uuid,
    ) -> Result<Option<BookedInterval>, StoreError> {
        let path = format!(
            "/rest/v1/booked_intervals?id=eq.{}&practitioner_id=eq.{}",
            booking_id, practitioner_id
        );
        let rows: Vec<BookedInterval> = self.supabase.request(Method::GET, &path, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn insert_booking(&self, booking: &BookedInterval) -> Result<BookedInterval, StoreError> {
        let rows: Vec<BookedInterval> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/booked_intervals",
                Some(serde_json::to_value(booking)?),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::Backend("Insert returned no booking".to_string()))
    }

    async fn update_booking_status(
        &self,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<BookedInterval, StoreError> {
        let path = format!("/rest/v1/booked_intervals?id=eq.{}", booking_id);
        let rows: Vec<BookedInterval> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(json!({ "status": status })),
                Some(SupabaseClient::return_representation()),
            )
            .await?;

        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", booking_id)))
    }
}
