use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::user::UserAccount;
use crate::services::accounts::{self, Credentials, LoginResponse, Registration, ResetTicket};
use crate::state::AppState;

/// Routes reachable without a bearer token.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Credentials>,
) -> Result<Json<LoginResponse>, AppError> {
    Ok(Json(accounts::login(&state, payload)?))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Registration>,
) -> Result<(StatusCode, Json<UserAccount>), AppError> {
    let user = accounts::register(&state, payload)?;
    Ok((StatusCode::CREATED, Json(user)))
}

// No mail transport is wired in, so the ticket goes back to the caller.
async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ResetTicket>, AppError> {
    Ok(Json(accounts::forgot_password(&state, &payload.email)?))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    accounts::reset_password(&state, &payload.token, &payload.new_password)?;
    Ok(Json(MessageResponse {
        message: "password updated",
    }))
}
