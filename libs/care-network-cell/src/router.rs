use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn care_network_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/primary-doctor", post(handlers::assign_primary_doctor))
        .route("/regular-donor", post(handlers::link_regular_donor))
        .route("/status", put(handlers::update_relationship_status))
        .route("/patients/{patient_id}/donors", get(handlers::get_patient_donors))
        .route("/donors/{donor_id}/patients", get(handlers::get_donor_patients))
        .route("/doctors/{doctor_id}/patients", get(handlers::get_doctor_patients))
        .with_state(state)
}
