use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::error::AppError;
use crate::models::order::{DeliveryOrder, OrderStatus};
use crate::services::orders::{self, NewOrder, OrderUpdate, StatusUpdate};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/orders", get(list_orders).post(create_order))
        .route("/orders/my", get(my_orders))
        .route("/orders/status/:status", get(orders_by_status))
        .route("/orders/staff/:staff_id", get(orders_by_staff))
        .route(
            "/orders/:id",
            get(get_order).put(update_order).delete(delete_order),
        )
        .route("/orders/:id/status", patch(update_status))
        .route("/orders/:id/assign-staff/:staff_id", patch(assign_staff))
        .route("/orders/:id/pay", post(pay_order))
        .route("/orders/:id/confirm-received", post(confirm_received))
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<DeliveryOrder>>, AppError> {
    Ok(Json(orders::list_orders(&state, &identity)?))
}

async fn my_orders(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<DeliveryOrder>>, AppError> {
    Ok(Json(orders::list_my_orders(&state, &identity)?))
}

async fn orders_by_status(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(code): Path<u8>,
) -> Result<Json<Vec<DeliveryOrder>>, AppError> {
    let status = OrderStatus::try_from(code).map_err(AppError::Validation)?;
    Ok(Json(orders::list_by_status(&state, &identity, status)?))
}

async fn orders_by_staff(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(staff_id): Path<Uuid>,
) -> Result<Json<Vec<DeliveryOrder>>, AppError> {
    Ok(Json(orders::list_by_staff(&state, &identity, staff_id)?))
}

async fn create_order(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<NewOrder>,
) -> Result<(StatusCode, Json<DeliveryOrder>), AppError> {
    let order = orders::create_order(&state, &identity, payload)?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryOrder>, AppError> {
    Ok(Json(orders::get_order(&state, &identity, id)?))
}

async fn update_order(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<OrderUpdate>,
) -> Result<Json<DeliveryOrder>, AppError> {
    Ok(Json(orders::update_order(&state, &identity, id, payload)?))
}

async fn delete_order(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    orders::delete_order(&state, &identity, id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_status(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdate>,
) -> Result<Json<DeliveryOrder>, AppError> {
    Ok(Json(orders::update_status(&state, &identity, id, payload)?))
}

async fn assign_staff(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path((id, staff_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<DeliveryOrder>, AppError> {
    Ok(Json(orders::assign_staff(&state, &identity, id, staff_id)?))
}

async fn pay_order(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryOrder>, AppError> {
    Ok(Json(orders::pay_order(&state, &identity, id)?))
}

async fn confirm_received(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveryOrder>, AppError> {
    Ok(Json(orders::confirm_received(&state, &identity, id)?))
}
