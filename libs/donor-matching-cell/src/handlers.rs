use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{BloodType, CompatibilityQuery, CompatibilityResponse, MatchRequest, MatchResponse};
use crate::services::{
    compatibility::{can_donate_to, can_receive_from, is_compatible},
    matching::DonorMatchingService,
    scorer::{HttpDonorScorer, ScorerHealth},
};

fn parse_blood_type(raw: Option<&str>) -> Result<Option<BloodType>, AppError> {
    raw.map(str::parse::<BloodType>).transpose().map_err(AppError::from)
}

#[axum::debug_handler]
pub async fn match_donors(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<MatchRequest>,
) -> Result<Json<MatchResponse>, AppError> {
    let criteria = request.into_criteria(Utc::now().date_naive())?;
    let matching_service = DonorMatchingService::new(&state);

    let predictions = matching_service.match_donors(&criteria).await?;

    Ok(Json(MatchResponse::new(predictions)))
}

#[axum::debug_handler]
pub async fn check_compatibility(
    Query(query): Query<CompatibilityQuery>,
) -> Result<Json<CompatibilityResponse>, AppError> {
    let donor = parse_blood_type(query.donor.as_deref())?;
    let recipient = parse_blood_type(query.recipient.as_deref())?;

    if donor.is_none() && recipient.is_none() {
        return Err(AppError::ValidationError(
            "Provide a donor and/or recipient blood type".to_string(),
        ));
    }

    Ok(Json(CompatibilityResponse {
        donor,
        recipient,
        compatible: donor.zip(recipient).map(|(donor, recipient)| is_compatible(donor, recipient)),
        donor_can_give_to: donor.map(can_donate_to),
        recipient_can_receive_from: recipient.map(can_receive_from),
    }))
}

#[axum::debug_handler]
pub async fn ranking_service_health(State(state): State<Arc<AppConfig>>) -> Json<Value> {
    let health = match HttpDonorScorer::from_config(&state) {
        Some(scorer) => scorer.health(state.ranking_health_timeout()).await,
        None => ScorerHealth::Offline {
            message: "Ranking service is not configured".to_string(),
        },
    };

    Json(json!(health))
}
