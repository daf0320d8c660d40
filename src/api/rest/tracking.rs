use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::error::AppError;
use crate::models::checkpoint::Checkpoint;
use crate::services::tracking::{self, NewCheckpoint, TrackingView};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/tracking/checkin", post(check_in))
        .route("/tracking/order/:order_id", get(order_checkpoints))
        .route("/tracking/location/:order_id", get(latest_location))
        .route("/tracking/track/:code", get(track_by_code))
}

async fn check_in(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<NewCheckpoint>,
) -> Result<(StatusCode, Json<Checkpoint>), AppError> {
    let checkpoint = tracking::check_in(&state, &identity, payload)?;
    Ok((StatusCode::CREATED, Json(checkpoint)))
}

async fn order_checkpoints(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<Checkpoint>>, AppError> {
    Ok(Json(tracking::list_for_order(&state, &identity, order_id)?))
}

async fn latest_location(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Checkpoint>, AppError> {
    Ok(Json(tracking::latest(&state, &identity, order_id)?))
}

async fn track_by_code(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Result<Json<TrackingView>, AppError> {
    Ok(Json(tracking::track_by_code(&state, &code)?))
}
