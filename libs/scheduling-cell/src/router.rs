use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{practitioner_id}/slots", get(handlers::get_available_slots))
        .route("/{practitioner_id}/conflicts", post(handlers::check_conflicts))
        .route("/{practitioner_id}/bookings", post(handlers::book_slot))
        .route("/{practitioner_id}/bookings/{booking_id}/cancel", post(handlers::cancel_booking))
        .with_state(state)
}
