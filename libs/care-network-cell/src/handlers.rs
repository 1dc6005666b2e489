use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::parse_id;

use crate::models::{
    AssignPrimaryDoctorRequest, LinkRegularDonorRequest, RelationshipChange, RelationshipView, UpdateStatusRequest,
};
use crate::services::network::CareNetworkService;

fn change_status(change: &RelationshipChange) -> StatusCode {
    if change.changed {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

#[axum::debug_handler]
pub async fn assign_primary_doctor(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<AssignPrimaryDoctorRequest>,
) -> Result<(StatusCode, Json<RelationshipChange>), AppError> {
    let network_service = CareNetworkService::new(&state);

    let change = network_service
        .assign_primary_doctor(
            parse_id("patient_id", &request.patient_id)?,
            parse_id("doctor_id", &request.doctor_id)?,
        )
        .await?;

    Ok((change_status(&change), Json(change)))
}

#[axum::debug_handler]
pub async fn link_regular_donor(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<LinkRegularDonorRequest>,
) -> Result<(StatusCode, Json<RelationshipChange>), AppError> {
    let network_service = CareNetworkService::new(&state);

    let change = network_service
        .link_regular_donor(
            parse_id("patient_id", &request.patient_id)?,
            parse_id("donor_id", &request.donor_id)?,
        )
        .await?;

    Ok((change_status(&change), Json(change)))
}

#[axum::debug_handler]
pub async fn update_relationship_status(
    State(state): State<Arc<AppConfig>>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<RelationshipChange>, AppError> {
    let network_service = CareNetworkService::new(&state);

    let change = network_service
        .update_status(
            parse_id("patient_id", &request.patient_id)?,
            parse_id("counterpart_id", &request.counterpart_id)?,
            request.kind,
            request.status,
        )
        .await?;

    Ok(Json(change))
}

#[axum::debug_handler]
pub async fn get_patient_donors(
    State(state): State<Arc<AppConfig>>,
    Path(patient_id): Path<String>,
) -> Result<Json<RelationshipView>, AppError> {
    let network_service = CareNetworkService::new(&state);
    Ok(Json(network_service.donors_of_patient(parse_id("patient_id", &patient_id)?).await?))
}

#[axum::debug_handler]
pub async fn get_donor_patients(
    State(state): State<Arc<AppConfig>>,
    Path(donor_id): Path<String>,
) -> Result<Json<RelationshipView>, AppError> {
    let network_service = CareNetworkService::new(&state);
    Ok(Json(network_service.patients_of_donor(parse_id("donor_id", &donor_id)?).await?))
}

#[axum::debug_handler]
pub async fn get_doctor_patients(
    State(state): State<Arc<AppConfig>>,
    Path(doctor_id): Path<String>,
) -> Result<Json<RelationshipView>, AppError> {
    let network_service = CareNetworkService::new(&state);
    Ok(Json(network_service.patients_of_doctor(parse_id("doctor_id", &doctor_id)?).await?))
}
