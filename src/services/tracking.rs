use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::auth::policy::{authorize, Operation};
use crate::error::AppError;
use crate::geo::{trail_length_km, validate_point};
use crate::models::checkpoint::{Checkpoint, GeoPoint};
use crate::models::order::{DeliveryOrder, OrderStatus};
use crate::services::orders::{find_order, find_order_by_code};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct NewCheckpoint {
    pub order_id: Uuid,
    pub location: GeoPoint,
    #[serde(default)]
    pub location_name: String,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackingView {
    pub order: DeliveryOrder,
    /// Oldest first.
    pub checkpoints: Vec<Checkpoint>,
    pub current_status: OrderStatus,
    pub last_update: DateTime<Utc>,
    pub trail_km: f64,
}

/// Appends a checkpoint. The timestamp is always assigned here.
pub fn check_in(
    state: &AppState,
    identity: &Identity,
    request: NewCheckpoint,
) -> Result<Checkpoint, AppError> {
    authorize(identity, Operation::CheckIn)?;
    validate_point(&request.location)?;

    // Order stays read-locked until the push lands; delete clears the trail after removal.
    let order = state
        .orders
        .get(&request.order_id)
        .ok_or_else(|| AppError::NotFound(format!("order {} not found", request.order_id)))?;

    let checkpoint = Checkpoint {
        id: Uuid::new_v4(),
        order_id: request.order_id,
        location: request.location,
        location_name: request.location_name.trim().to_string(),
        checked_in_at: Utc::now(),
        notes: request.notes,
    };

    state
        .checkpoints
        .entry(checkpoint.order_id)
        .or_default()
        .push(checkpoint.clone());
    drop(order);
    state.metrics.checkins_total.inc();

    info!(
        order_id = %checkpoint.order_id,
        lat = checkpoint.location.lat,
        lng = checkpoint.location.lng,
        by = %identity.user_id,
        "checkpoint recorded"
    );

    Ok(checkpoint)
}

fn trail(state: &AppState, order_id: Uuid) -> Vec<Checkpoint> {
    state
        .checkpoints
        .get(&order_id)
        .map(|entry| entry.value().clone())
        .unwrap_or_default()
}

/// Checkpoints for an order, newest first.
pub fn list_for_order(
    state: &AppState,
    identity: &Identity,
    order_id: Uuid,
) -> Result<Vec<Checkpoint>, AppError> {
    authorize(identity, Operation::ReadTracking)?;
    find_order(state, order_id)?;

    let mut checkpoints = trail(state, order_id);
    checkpoints.reverse();
    Ok(checkpoints)
}

pub fn latest(
    state: &AppState,
    identity: &Identity,
    order_id: Uuid,
) -> Result<Checkpoint, AppError> {
    authorize(identity, Operation::ReadTracking)?;

    trail(state, order_id)
        .pop()
        .ok_or_else(|| AppError::NotFound(format!("no location recorded for order {order_id}")))
}

/// Public lookup by order code; needs no identity.
pub fn track_by_code(state: &AppState, code: &str) -> Result<TrackingView, AppError> {
    let order = find_order_by_code(state, code)?;
    let checkpoints = trail(state, order.id);

    let points: Vec<GeoPoint> = checkpoints.iter().map(|c| c.location).collect();
    let last_update = checkpoints
        .last()
        .map(|c| c.checked_in_at)
        .unwrap_or(order.created_at);

    Ok(TrackingView {
        current_status: order.status,
        trail_km: trail_length_km(&points),
        last_update,
        checkpoints,
        order,
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::models::user::Role;
    use crate::services::orders::{create_order, CustomerDetails, NewOrder};
    use crate::models::money::Money;
    use crate::models::order::{DeliveryType, GoodsDescriptor, PackageType, PaymentMethod};

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            username: role.to_string(),
            role,
            email: String::new(),
            display_name: String::new(),
        }
    }

    fn seeded() -> (Arc<AppState>, DeliveryOrder) {
        let state = Arc::new(AppState::new(Config::for_tests()));
        let order = create_order(
            &state,
            &identity(Role::Customer),
            NewOrder {
                order_code: Some("TRACK-1".to_string()),
                customer: CustomerDetails {
                    full_name: "Le Hoa".to_string(),
                    phone: "0909".to_string(),
                    address: "3 Hai Ba Trung".to_string(),
                    ward: String::new(),
                    district: String::new(),
                    city: String::new(),
                },
                goods: GoodsDescriptor {
                    product_code: "X".to_string(),
                    package_type: PackageType::Sack,
                    weight_kg: 2.0,
                    size: "S".to_string(),
                    distance_km: 8.0,
                    is_fragile: false,
                    is_valuable: false,
                    is_vehicle: false,
                    delivery_type: DeliveryType::Standard,
                },
                collect_money: false,
                collection_amount: Money::ZERO,
                payment_method: PaymentMethod::Standard,
                notes: None,
            },
        )
        .unwrap();
        (state, order)
    }

    fn at(order_id: Uuid, lat: f64, lng: f64, name: &str) -> NewCheckpoint {
        NewCheckpoint {
            order_id,
            location: GeoPoint { lat, lng },
            location_name: name.to_string(),
            notes: String::new(),
        }
    }

    #[test]
    fn trail_is_append_only_and_ordered() {
        let (state, order) = seeded();
        let shipper = identity(Role::Shipper);

        check_in(&state, &shipper, at(order.id, 10.77, 106.70, "hub")).unwrap();
        check_in(&state, &shipper, at(order.id, 10.78, 106.71, "street")).unwrap();
        check_in(&state, &shipper, at(order.id, 10.79, 106.72, "door")).unwrap();

        let newest_first = list_for_order(&state, &shipper, order.id).unwrap();
        let names: Vec<&str> = newest_first.iter().map(|c| c.location_name.as_str()).collect();
        assert_eq!(names, vec!["door", "street", "hub"]);

        assert_eq!(latest(&state, &shipper, order.id).unwrap().location_name, "door");

        let view = track_by_code(&state, "TRACK-1").unwrap();
        assert_eq!(view.checkpoints.first().unwrap().location_name, "hub");
        assert_eq!(view.last_update, view.checkpoints.last().unwrap().checked_in_at);
        assert!(view.trail_km > 0.0);
    }

    #[test]
    fn customers_cannot_check_in() {
        let (state, order) = seeded();
        let err = check_in(&state, &identity(Role::Customer), at(order.id, 1.0, 1.0, "x"))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[test]
    fn check_in_requires_existing_order_and_valid_point() {
        let (state, order) = seeded();
        let shipper = identity(Role::Shipper);

        assert!(matches!(
            check_in(&state, &shipper, at(Uuid::new_v4(), 1.0, 1.0, "x")),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            check_in(&state, &shipper, at(order.id, 120.0, 1.0, "x")),
            Err(AppError::Validation(_))
        ));
        assert!(state.checkpoints.is_empty());
    }

    #[test]
    fn deleted_order_keeps_no_trail() {
        let (state, order) = seeded();
        let admin = identity(Role::Admin);
        check_in(&state, &admin, at(order.id, 10.0, 106.0, "hub")).unwrap();

        crate::services::orders::delete_order(&state, &admin, order.id).unwrap();
        assert!(matches!(
            check_in(&state, &admin, at(order.id, 10.1, 106.1, "late")),
            Err(AppError::NotFound(_))
        ));
        assert!(!state.checkpoints.contains_key(&order.id));
    }

    #[test]
    fn untracked_order_reports_creation_time() {
        let (state, order) = seeded();
        let view = track_by_code(&state, &order.order_code).unwrap();
        assert!(view.checkpoints.is_empty());
        assert_eq!(view.last_update, order.created_at);
        assert_eq!(view.trail_km, 0.0);
        assert!(matches!(
            latest(&state, &identity(Role::Admin), order.id),
            Err(AppError::NotFound(_))
        ));
    }
}
