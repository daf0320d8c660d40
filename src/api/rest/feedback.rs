use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::error::AppError;
use crate::models::feedback::Feedback;
use crate::services::feedback::{self, NewFeedback};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/feedback", post(post_feedback))
        .route("/feedback/order/:order_id", get(order_feedback))
        .route("/feedback/my", get(my_feedback))
}

async fn post_feedback(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<NewFeedback>,
) -> Result<(StatusCode, Json<Feedback>), AppError> {
    let feedback = feedback::post_feedback(&state, &identity, payload)?;
    Ok((StatusCode::CREATED, Json(feedback)))
}

async fn order_feedback(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(order_id): Path<Uuid>,
) -> Result<Json<Vec<Feedback>>, AppError> {
    Ok(Json(feedback::feedback_for_order(&state, &identity, order_id)?))
}

async fn my_feedback(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<Feedback>>, AppError> {
    Ok(Json(feedback::my_feedback(&state, &identity)?))
}
