use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, put};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::error::AppError;
use crate::models::user::UserAccount;
use crate::services::accounts::{self, AccountUpdate, NewAccount, PasswordChange, ProfileUpdate};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/:id/password", put(set_password))
        .route("/profile/me", get(profile).put(update_profile))
        .route("/profile/change-password", patch(change_password))
}

#[derive(Deserialize)]
pub struct SetPasswordRequest {
    pub new_password: String,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<UserAccount>>, AppError> {
    Ok(Json(accounts::list_users(&state, &identity)?))
}

async fn get_user(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<UserAccount>, AppError> {
    Ok(Json(accounts::get_user(&state, &identity, id)?))
}

async fn create_user(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<NewAccount>,
) -> Result<(StatusCode, Json<UserAccount>), AppError> {
    let user = accounts::create_user(&state, &identity, payload)?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<AccountUpdate>,
) -> Result<Json<UserAccount>, AppError> {
    Ok(Json(accounts::update_user(&state, &identity, id, payload)?))
}

async fn set_password(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<SetPasswordRequest>,
) -> Result<StatusCode, AppError> {
    accounts::set_user_password(&state, &identity, id, &payload.new_password)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    accounts::delete_user(&state, &identity, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<UserAccount>, AppError> {
    Ok(Json(accounts::profile(&state, &identity)?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<ProfileUpdate>,
) -> Result<Json<UserAccount>, AppError> {
    Ok(Json(accounts::update_profile(&state, &identity, payload)?))
}

async fn change_password(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<PasswordChange>,
) -> Result<StatusCode, AppError> {
    accounts::change_password(&state, &identity, payload)?;
    Ok(StatusCode::NO_CONTENT)
}
