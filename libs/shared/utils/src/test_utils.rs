use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;

pub struct TestConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub ranking_service_url: Option<String>,
    pub ranking_timeout_ms: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
            ranking_service_url: None,
            ranking_timeout_ms: 500,
        }
    }
}

impl TestConfig {
    pub fn with_store(url: &str) -> Self {
        Self {
            supabase_url: url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_ranking_service(mut self, url: &str) -> Self {
        self.ranking_service_url = Some(url.to_string());
        self
    }

    pub fn with_ranking_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.ranking_timeout_ms = timeout_ms;
        self
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            ranking_service_url: self.ranking_service_url.clone(),
            ranking_timeout_ms: self.ranking_timeout_ms,
            ranking_health_timeout_ms: self.ranking_timeout_ms,
            ..AppConfig::default()
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

/// Row builders shaped like the store's tables.
pub struct MockSupabaseResponses;

impl MockSupabaseResponses {
    pub fn practitioner_row(practitioner_id: &str) -> Value {
        json!({
            "id": practitioner_id,
            "name": "Dr. Test",
            "is_accepting_bookings": true,
            "created_at": Utc::now().to_rfc3339()
        })
    }

    pub fn working_window_row(
        practitioner_id: &str,
        day_of_week: &str,
        start_time: &str,
        end_time: &str,
        slot_duration_minutes: u32,
    ) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "practitioner_id": practitioner_id,
            "day_of_week": day_of_week,
            "start_time": start_time,
            "end_time": end_time,
            "slot_duration_minutes": slot_duration_minutes,
            "max_slots_per_day": null
        })
    }

    pub fn booking_row(
        practitioner_id: &str,
        date: &str,
        start_time: &str,
        end_time: &str,
        status: &str,
    ) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "practitioner_id": practitioner_id,
            "patient_id": Uuid::new_v4().to_string(),
            "date": date,
            "start_time": start_time,
            "end_time": end_time,
            "status": status
        })
    }

    pub fn donor_row(
        donor_id: &str,
        blood_type: &str,
        city: &str,
        state: &str,
        total_donations: u32,
        available_for_emergency: bool,
    ) -> Value {
        json!({
            "id": donor_id,
            "blood_type": blood_type,
            "city": city,
            "state": state,
            "last_donation_date": null,
            "next_eligible_date": null,
            "total_donations": total_donations,
            "available_for_emergency": available_for_emergency
        })
    }

    pub fn relationship_row(patient_id: &str, counterpart_id: &str, kind: &str, status: &str) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "patient_id": patient_id,
            "counterpart_id": counterpart_id,
            "kind": kind,
            "status": status,
            "since": Utc::now().to_rfc3339(),
            "assigned_doctor_id": null
        })
    }
}
