use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::auth::identity::Identity;
use crate::error::AppError;
use crate::models::order::{DeliveryType, PackageType};
use crate::services::reports::{
    self, CategoryOrders, DailyOrders, StaffOrders, Summary, DEFAULT_REPORT_DAYS,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/reports/summary", get(summary))
        .route("/reports/orders-by-day", get(orders_by_day))
        .route("/reports/orders-by-staff", get(orders_by_staff))
        .route("/reports/by-delivery-type", get(by_delivery_type))
        .route("/reports/by-package-type", get(by_package_type))
}

#[derive(Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

async fn summary(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Summary>, AppError> {
    Ok(Json(reports::summary(&state, &identity)?))
}

async fn orders_by_day(
    State(state): State<Arc<AppState>>,
    identity: Identity,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<DailyOrders>>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_REPORT_DAYS);
    Ok(Json(reports::orders_by_day(&state, &identity, days)?))
}

async fn orders_by_staff(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<StaffOrders>>, AppError> {
    Ok(Json(reports::orders_by_staff(&state, &identity)?))
}

async fn by_delivery_type(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<CategoryOrders<DeliveryType>>>, AppError> {
    Ok(Json(reports::orders_by_delivery_type(&state, &identity)?))
}

async fn by_package_type(
    State(state): State<Arc<AppState>>,
    identity: Identity,
) -> Result<Json<Vec<CategoryOrders<PackageType>>>, AppError> {
    Ok(Json(reports::orders_by_package_type(&state, &identity)?))
}
