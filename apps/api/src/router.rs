use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use care_network_cell::router::care_network_routes;
use donor_matching_cell::router::donor_matching_routes;
use scheduling_cell::router::scheduling_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/", get(|| async { "CareMatch API is running!" }))
        .nest("/practitioners", scheduling_routes(state.clone()))
        .nest("/donors", donor_matching_routes(state.clone()))
        .nest("/relationships", care_network_routes(state))
}
