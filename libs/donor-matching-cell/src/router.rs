use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_config::AppConfig;

use crate::handlers;

pub fn donor_matching_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/match", post(handlers::match_donors))
        .route("/compatibility", get(handlers::check_compatibility))
        .route("/ranking-service/health", get(handlers::ranking_service_health))
        .with_state(state)
}
