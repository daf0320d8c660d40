use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use axum::Router;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::error::AppError;
use crate::models::customer::Customer;
use crate::services::customers;
use crate::services::orders::CustomerDetails;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

async fn list_customers(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<Customer>>, AppError> {
    Ok(Json(customers::list_customers(&state, &identity)?))
}

async fn get_customer(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(customers::get_customer(&state, &identity, id)?))
}

async fn create_customer(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Json(payload): Json<CustomerDetails>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    let customer = customers::create_customer(&state, &identity, payload)?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn update_customer(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerDetails>,
) -> Result<Json<Customer>, AppError> {
    Ok(Json(customers::update_customer(&state, &identity, id, payload)?))
}

async fn delete_customer(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    customers::delete_customer(&state, &identity, id)?;
    Ok(StatusCode::NO_CONTENT)
}
