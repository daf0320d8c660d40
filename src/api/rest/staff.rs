use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::error::AppError;
use crate::models::staff::DeliveryStaff;
use crate::services::staff::{self, NewStaff, StaffAccount, StaffDetails};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/staff", get(list_staff).post(create_staff))
        .route("/staff/available", get(available_staff))
        .route("/staff/me", get(my_record))
        .route(
            "/staff/:id",
            get(get_staff).put(update_staff).delete(delete_staff),
        )
        .route("/staff/:id/availability", patch(set_availability))
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

async fn list_staff(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<DeliveryStaff>>, AppError> {
    Ok(Json(staff::list_staff(&state, &identity)?))
}

async fn available_staff(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<DeliveryStaff>>, AppError> {
    Ok(Json(staff::list_available(&state, &identity)?))
}

async fn my_record(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<DeliveryStaff>, AppError> {
    Ok(Json(staff::my_staff_record(&state, &identity)?))
}

async fn get_staff(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryStaff>, AppError> {
    Ok(Json(staff::get_staff(&state, &identity, id)?))
}

async fn create_staff(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<NewStaff>,
) -> Result<(StatusCode, Json<StaffAccount>), AppError> {
    let created = staff::create_staff(&state, &identity, payload)?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_staff(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<StaffDetails>,
) -> Result<Json<DeliveryStaff>, AppError> {
    Ok(Json(staff::update_staff(&state, &identity, id, payload)?))
}

async fn set_availability(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<AvailabilityRequest>,
) -> Result<Json<DeliveryStaff>, AppError> {
    Ok(Json(staff::set_availability(
        &state,
        &identity,
        id,
        payload.is_available,
    )?))
}

async fn delete_staff(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    staff::delete_staff(&state, &identity, id)?;
    Ok(StatusCode::NO_CONTENT)
}
