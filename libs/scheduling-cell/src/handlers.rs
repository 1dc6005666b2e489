use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::{parse_date, parse_id, parse_time};

use crate::models::{AvailabilityQuery, AvailableSlotsResponse, BookSlotRequest, IntervalRequest, Slot};
use crate::services::{availability::AvailabilityService, booking::BookingService};

fn parse_slot(date: &str, start_time: &str, end_time: &str) -> Result<Slot, AppError> {
    let slot = Slot::new(parse_date(date)?, parse_time(start_time)?, parse_time(end_time)?)?;
    Ok(slot)
}

#[axum::debug_handler]
pub async fn get_available_slots(
    State(state): State<Arc<AppConfig>>,
    Path(practitioner_id): Path<String>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<AvailableSlotsResponse>, AppError> {
    let practitioner_id = parse_id("practitioner_id", &practitioner_id)?.to_string();
    let date = parse_date(&query.date)?;
    let availability_service = AvailabilityService::new(&state);

    let available_slots = availability_service
        .get_available_slots(&practitioner_id, date, query.duration_minutes, query.max_daily)
        .await?;

    Ok(Json(AvailableSlotsResponse {
        practitioner_id,
        date,
        total: available_slots.len(),
        available_slots,
    }))
}

#[axum::debug_handler]
pub async fn check_conflicts(
    State(state): State<Arc<AppConfig>>,
    Path(practitioner_id): Path<String>,
    Json(request): Json<IntervalRequest>,
) -> Result<Json<Value>, AppError> {
    let practitioner_id = parse_id("practitioner_id", &practitioner_id)?;
    let proposed = parse_slot(&request.date, &request.start_time, &request.end_time)?;
    let booking_service = BookingService::new(&state);

    let response = booking_service.check_conflicts(practitioner_id, &proposed).await?;

    Ok(Json(json!(response)))
}

#[axum::debug_handler]
pub async fn book_slot(
    State(state): State<Arc<AppConfig>>,
    Path(practitioner_id): Path<String>,
    Json(request): Json<BookSlotRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let practitioner_id = parse_id("practitioner_id", &practitioner_id)?;
    let slot = parse_slot(&request.date, &request.start_time, &request.end_time)?;
    let booking_service = BookingService::new(&state);

    let (booking, workflow_state) = booking_service
        .commit_booking(practitioner_id, slot, request.patient_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "booking": booking,
            "state": workflow_state.to_string(),
        })),
    ))
}

#[axum::debug_handler]
pub async fn cancel_booking(
    State(state): State<Arc<AppConfig>>,
    Path((practitioner_id, booking_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    let practitioner_id = parse_id("practitioner_id", &practitioner_id)?;
    let booking_id = Uuid::parse_str(&booking_id)
        .map_err(|_| AppError::ValidationError(format!("Invalid booking id '{}'", booking_id)))?;
    let booking_service = BookingService::new(&state);

    let booking = booking_service.cancel_booking(practitioner_id, booking_id).await?;

    Ok(Json(json!({ "booking": booking })))
}
