use chrono::Utc;
use dashmap::mapref::entry::Entry;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::auth::policy::{authorize, authorize_owner, Operation};
use crate::engine::lifecycle::{self, StatusChange};
use crate::engine::order_code::generate_order_code;
use crate::engine::pricing::{calculate_fee, validate_goods};
use crate::error::AppError;
use crate::models::customer::Customer;
use crate::models::money::Money;
use crate::models::order::{DeliveryOrder, GoodsDescriptor, OrderStatus, PaymentMethod};
use crate::state::AppState;

const CODE_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    #[serde(default)]
    pub ward: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub city: String,
}

impl CustomerDetails {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.full_name.trim().is_empty() {
            return Err(AppError::Validation("customer name cannot be empty".to_string()));
        }
        if self.phone.trim().is_empty() {
            return Err(AppError::Validation("customer phone cannot be empty".to_string()));
        }
        if self.address.trim().is_empty() {
            return Err(AppError::Validation("delivery address cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn into_customer(self, id: Uuid) -> Customer {
        Customer {
            id,
            full_name: self.full_name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            address: self.address.trim().to_string(),
            ward: self.ward,
            district: self.district,
            city: self.city,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrder {
    #[serde(default)]
    pub order_code: Option<String>,
    pub customer: CustomerDetails,
    pub goods: GoodsDescriptor,
    #[serde(default)]
    pub collect_money: bool,
    #[serde(default)]
    pub collection_amount: Money,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Descriptive fields an admin may overwrite. Fee, payment method, payment
/// state and lifecycle fields are never touched by an update.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderUpdate {
    pub customer: CustomerDetails,
    pub goods: GoodsDescriptor,
    #[serde(default)]
    pub collect_money: bool,
    #[serde(default)]
    pub collection_amount: Money,
}

fn validate_collection_amount(amount: Money) -> Result<(), AppError> {
    if amount.is_negative() {
        return Err(AppError::Validation(
            "collection_amount cannot be negative".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(default)]
    pub staff_id: Option<Uuid>,
    #[serde(default)]
    pub notes: Option<String>,
}

pub fn create_order(
    state: &AppState,
    identity: &Identity,
    request: NewOrder,
) -> Result<DeliveryOrder, AppError> {
    authorize(identity, Operation::CreateOrder)?;
    request.customer.validate()?;
    validate_collection_amount(request.collection_amount)?;

    let shipping_fee = calculate_fee(&request.goods)?;
    let now = Utc::now();
    let order_id = Uuid::new_v4();
    let order_code = reserve_order_code(state, request.order_code.as_deref(), order_id)?;

    let customer = request.customer.into_customer(Uuid::new_v4());
    let is_paid = request.payment_method.is_prepaid();

    let mut order = DeliveryOrder {
        id: order_id,
        order_code,
        created_at: now,
        created_by: Some(identity.user_id),
        customer_id: customer.id,
        customer: customer.clone(),
        goods: request.goods,
        collect_money: request.collect_money,
        collection_amount: request.collection_amount,
        payment_method: request.payment_method,
        shipping_fee,
        is_paid,
        paid_amount: is_paid.then_some(shipping_fee),
        payment_time: is_paid.then_some(now),
        status: OrderStatus::NotReceived,
        assigned_staff_id: None,
        received_at: None,
        delivery_started_at: None,
        delivered_at: None,
        notes: Vec::new(),
        confirmed_received: false,
        confirmed_at: None,
    };
    if let Some(notes) = request.notes.as_deref() {
        lifecycle::append_note(&mut order, notes, now);
    }

    // Everything that can fail has run; both records land together.
    state.customers.insert(customer.id, customer);
    state.orders.insert(order.id, order.clone());

    state
        .metrics
        .orders_created_total
        .with_label_values(&[order.payment_method.label()])
        .inc();
    state
        .metrics
        .shipping_fee
        .observe(order.shipping_fee.minor() as f64 / 100.0);

    info!(
        order_id = %order.id,
        order_code = %order.order_code,
        created_by = %identity.user_id,
        fee = %order.shipping_fee,
        prepaid = order.is_paid,
        "order created"
    );

    Ok(order)
}

fn reserve_order_code(
    state: &AppState,
    requested: Option<&str>,
    order_id: Uuid,
) -> Result<String, AppError> {
    if let Some(code) = requested.map(str::trim).filter(|code| !code.is_empty()) {
        return match state.order_codes.entry(code.to_string()) {
            Entry::Occupied(_) => Err(AppError::Conflict(format!(
                "order code {code} is already in use"
            ))),
            Entry::Vacant(slot) => {
                slot.insert(order_id);
                Ok(code.to_string())
            }
        };
    }

    for _ in 0..CODE_ATTEMPTS {
        let code = generate_order_code(&state.config.order_code_prefix, Utc::now());
        if let Entry::Vacant(slot) = state.order_codes.entry(code.clone()) {
            slot.insert(order_id);
            return Ok(code);
        }
        warn!(order_code = %code, "generated order code collided; retrying");
    }

    Err(AppError::Internal(
        "could not allocate a unique order code".to_string(),
    ))
}

fn newest_first(mut orders: Vec<DeliveryOrder>) -> Vec<DeliveryOrder> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

fn collect_where<F>(state: &AppState, keep: F) -> Vec<DeliveryOrder>
where
    F: Fn(&DeliveryOrder) -> bool,
{
    let orders = state
        .orders
        .iter()
        .filter(|entry| keep(entry.value()))
        .map(|entry| entry.value().clone())
        .collect();
    newest_first(orders)
}

pub fn list_orders(state: &AppState, identity: &Identity) -> Result<Vec<DeliveryOrder>, AppError> {
    authorize(identity, Operation::ListOrders)?;
    Ok(collect_where(state, |_| true))
}

pub fn list_my_orders(
    state: &AppState,
    identity: &Identity,
) -> Result<Vec<DeliveryOrder>, AppError> {
    authorize(identity, Operation::ListMyOrders)?;
    Ok(orders_by_creator(state, identity.user_id))
}

pub fn orders_by_creator(state: &AppState, user_id: Uuid) -> Vec<DeliveryOrder> {
    collect_where(state, |order| order.is_created_by(user_id))
}

pub fn list_by_status(
    state: &AppState,
    identity: &Identity,
    status: OrderStatus,
) -> Result<Vec<DeliveryOrder>, AppError> {
    authorize(identity, Operation::ListOrders)?;
    Ok(collect_where(state, |order| order.status == status))
}

pub fn list_by_staff(
    state: &AppState,
    identity: &Identity,
    staff_id: Uuid,
) -> Result<Vec<DeliveryOrder>, AppError> {
    authorize(identity, Operation::ListOrders)?;
    Ok(collect_where(state, |order| {
        order.assigned_staff_id == Some(staff_id)
    }))
}

pub fn find_order(state: &AppState, id: Uuid) -> Result<DeliveryOrder, AppError> {
    state
        .orders
        .get(&id)
        .map(|order| order.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))
}

pub fn find_order_by_code(state: &AppState, code: &str) -> Result<DeliveryOrder, AppError> {
    let id = state
        .order_codes
        .get(code)
        .map(|entry| *entry.value())
        .ok_or_else(|| AppError::NotFound(format!("order {code} not found")))?;
    find_order(state, id)
}

pub fn get_order(state: &AppState, identity: &Identity, id: Uuid) -> Result<DeliveryOrder, AppError> {
    authorize(identity, Operation::ReadOrder)?;
    find_order(state, id)
}

/// Overwrites descriptive fields. Last write wins; there is no version check.
pub fn update_order(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    update: OrderUpdate,
) -> Result<DeliveryOrder, AppError> {
    authorize(identity, Operation::UpdateOrder)?;
    update.customer.validate()?;
    validate_goods(&update.goods)?;
    validate_collection_amount(update.collection_amount)?;

    let updated = {
        let mut order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

        let customer_id = order.customer_id;
        order.customer = update.customer.into_customer(customer_id);
        order.goods = update.goods;
        order.collect_money = update.collect_money;
        order.collection_amount = update.collection_amount;
        order.clone()
    };

    state
        .customers
        .insert(updated.customer_id, updated.customer.clone());

    info!(order_id = %id, updated_by = %identity.user_id, "order updated");
    Ok(updated)
}

pub fn update_status(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    update: StatusUpdate,
) -> Result<DeliveryOrder, AppError> {
    authorize(identity, Operation::UpdateOrderStatus)?;

    // Only a pickup attaches staff; resolve it before touching the order.
    let staff_id = match (update.status, update.staff_id) {
        (OrderStatus::ReceivedNotShipped, Some(staff_id)) => {
            if !state.staff.contains_key(&staff_id) {
                return Err(AppError::NotFound(format!("staff {staff_id} not found")));
            }
            Some(staff_id)
        }
        _ => None,
    };

    let updated = {
        let mut order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

        let from = order.status;
        lifecycle::apply_status_change(
            &mut order,
            StatusChange {
                to: update.status,
                staff_id,
                note: update.notes,
            },
            Utc::now(),
        )?;

        info!(
            order_id = %id,
            from = from.label(),
            to = update.status.label(),
            by = %identity.user_id,
            "order status changed"
        );
        order.clone()
    };

    state
        .metrics
        .order_status_transitions_total
        .with_label_values(&[update.status.label()])
        .inc();

    Ok(updated)
}

pub fn assign_staff(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    staff_id: Uuid,
) -> Result<DeliveryOrder, AppError> {
    authorize(identity, Operation::AssignStaff)?;

    if !state.staff.contains_key(&staff_id) {
        return Err(AppError::NotFound(format!("staff {staff_id} not found")));
    }

    let mut order = state
        .orders
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    order.assigned_staff_id = Some(staff_id);

    info!(order_id = %id, staff_id = %staff_id, "staff assigned");
    Ok(order.clone())
}

pub fn pay_order(state: &AppState, identity: &Identity, id: Uuid) -> Result<DeliveryOrder, AppError> {
    let updated = {
        let mut order = state
            .orders
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

        authorize_owner(identity, Operation::PayOrder, order.created_by)?;
        lifecycle::mark_paid(&mut order, Utc::now())?;
        order.clone()
    };

    state.metrics.payments_total.inc();
    info!(order_id = %id, amount = %updated.shipping_fee, "order paid");
    Ok(updated)
}

pub fn confirm_received(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
) -> Result<DeliveryOrder, AppError> {
    let mut order = state
        .orders
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;

    authorize_owner(identity, Operation::ConfirmReceived, order.created_by)?;
    lifecycle::confirm_received(&mut order, Utc::now())?;

    info!(order_id = %id, "receipt confirmed by customer");
    Ok(order.clone())
}

pub fn delete_order(state: &AppState, identity: &Identity, id: Uuid) -> Result<(), AppError> {
    authorize(identity, Operation::DeleteOrder)?;

    let (_, order) = state
        .orders
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    state.order_codes.remove(&order.order_code);
    state.checkpoints.remove(&id);

    info!(order_id = %id, order_code = %order.order_code, "order deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::config::Config;
    use crate::models::order::{DeliveryType, PackageType};
    use crate::models::staff::DeliveryStaff;
    use crate::models::user::Role;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(Config::for_tests()))
    }

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            username: format!("{role}"),
            role,
            email: String::new(),
            display_name: String::new(),
        }
    }

    fn new_order(payment_method: PaymentMethod) -> NewOrder {
        NewOrder {
            order_code: None,
            customer: CustomerDetails {
                full_name: "Tran Mai".to_string(),
                phone: "0912345678".to_string(),
                address: "12 Le Loi".to_string(),
                ward: "Ben Nghe".to_string(),
                district: "1".to_string(),
                city: "HCM".to_string(),
            },
            goods: GoodsDescriptor {
                product_code: "P-1".to_string(),
                package_type: PackageType::Laptop,
                weight_kg: 0.0,
                size: "M".to_string(),
                distance_km: 5.0,
                is_fragile: false,
                is_valuable: false,
                is_vehicle: false,
                delivery_type: DeliveryType::Express,
            },
            collect_money: false,
            collection_amount: Money::ZERO,
            payment_method,
            notes: None,
        }
    }

    fn add_staff(state: &AppState) -> Uuid {
        let id = Uuid::new_v4();
        state.staff.insert(
            id,
            DeliveryStaff {
                id,
                full_name: "Pham Nam".to_string(),
                phone: "0987654321".to_string(),
                vehicle_type: "motorbike".to_string(),
                vehicle_plate: "59X1-12345".to_string(),
                is_available: true,
                account_id: None,
                updated_at: Utc::now(),
            },
        );
        id
    }

    #[test]
    fn create_prices_and_codes_the_order() {
        let state = state();
        let customer = identity(Role::Customer);

        let order = create_order(&state, &customer, new_order(PaymentMethod::Standard)).unwrap();

        assert_eq!(order.shipping_fee, Money::from_major(65_000));
        assert!(order.order_code.starts_with("DH"));
        assert_eq!(order.created_by, Some(customer.user_id));
        assert_eq!(order.status, OrderStatus::NotReceived);
        assert!(!order.is_paid);
        assert!(state.customers.contains_key(&order.customer_id));
    }

    #[test]
    fn prepaid_methods_start_paid() {
        let state = state();
        let customer = identity(Role::Customer);

        let order = create_order(&state, &customer, new_order(PaymentMethod::Online)).unwrap();
        assert!(order.is_paid);
        assert_eq!(order.paid_amount, Some(order.shipping_fee));
        assert!(order.payment_time.is_some());
    }

    #[test]
    fn shipper_cannot_create_orders() {
        let state = state();
        let err = create_order(&state, &identity(Role::Shipper), new_order(PaymentMethod::Standard))
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert!(state.orders.is_empty());
        assert!(state.customers.is_empty());
    }

    #[test]
    fn duplicate_supplied_code_is_a_conflict() {
        let state = state();
        let customer = identity(Role::Customer);
        let mut request = new_order(PaymentMethod::Standard);
        request.order_code = Some("WEB-001".to_string());

        create_order(&state, &customer, request.clone()).unwrap();
        let err = create_order(&state, &customer, request).unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(state.orders.len(), 1);
        assert_eq!(state.customers.len(), 1);
    }

    #[test]
    fn invalid_goods_leave_no_customer_behind() {
        let state = state();
        let mut request = new_order(PaymentMethod::Standard);
        request.goods.distance_km = -3.0;

        let err = create_order(&state, &identity(Role::Admin), request).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(state.customers.is_empty());
        assert!(state.order_codes.is_empty());
    }

    #[test]
    fn my_orders_only_returns_callers_orders() {
        let state = state();
        let alice = identity(Role::Customer);
        let bob = identity(Role::Customer);
        let admin = identity(Role::Admin);

        for who in [&alice, &bob, &alice, &admin, &bob, &alice] {
            create_order(&state, who, new_order(PaymentMethod::Standard)).unwrap();
        }

        let mine = list_my_orders(&state, &alice).unwrap();
        assert_eq!(mine.len(), 3);
        assert!(mine.iter().all(|order| order.created_by == Some(alice.user_id)));
        assert_eq!(orders_by_creator(&state, bob.user_id).len(), 2);
        assert_eq!(list_orders(&state, &bob).unwrap().len(), 6);
    }

    #[test]
    fn pickup_with_unknown_staff_changes_nothing() {
        let state = state();
        let order = create_order(&state, &identity(Role::Customer), new_order(PaymentMethod::Standard))
            .unwrap();

        let err = update_status(
            &state,
            &identity(Role::Shipper),
            order.id,
            StatusUpdate {
                status: OrderStatus::ReceivedNotShipped,
                staff_id: Some(Uuid::new_v4()),
                notes: Some("picked up".to_string()),
            },
        )
        .unwrap_err();

        assert!(matches!(err, AppError::NotFound(_)));
        let stored = find_order(&state, order.id).unwrap();
        assert_eq!(stored.status, OrderStatus::NotReceived);
        assert!(stored.received_at.is_none());
        assert!(stored.notes.is_empty());
    }

    #[test]
    fn pickup_assigns_staff_and_filters_by_staff() {
        let state = state();
        let staff_id = add_staff(&state);
        let order = create_order(&state, &identity(Role::Customer), new_order(PaymentMethod::Standard))
            .unwrap();

        let updated = update_status(
            &state,
            &identity(Role::Shipper),
            order.id,
            StatusUpdate {
                status: OrderStatus::ReceivedNotShipped,
                staff_id: Some(staff_id),
                notes: None,
            },
        )
        .unwrap();

        assert_eq!(updated.assigned_staff_id, Some(staff_id));
        assert!(updated.received_at.is_some());
        let admin = identity(Role::Admin);
        assert_eq!(list_by_staff(&state, &admin, staff_id).unwrap().len(), 1);
        assert_eq!(
            list_by_status(&state, &admin, OrderStatus::ReceivedNotShipped)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn assign_staff_requires_both_records() {
        let state = state();
        let admin = identity(Role::Admin);
        let staff_id = add_staff(&state);
        let order = create_order(&state, &admin, new_order(PaymentMethod::Standard)).unwrap();

        assert!(matches!(
            assign_staff(&state, &admin, order.id, Uuid::new_v4()),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            assign_staff(&state, &admin, Uuid::new_v4(), staff_id),
            Err(AppError::NotFound(_))
        ));
        let updated = assign_staff(&state, &admin, order.id, staff_id).unwrap();
        assert_eq!(updated.assigned_staff_id, Some(staff_id));
    }

    #[test]
    fn only_the_creator_pays_and_only_once() {
        let state = state();
        let owner = identity(Role::Customer);
        let stranger = identity(Role::Customer);
        let order = create_order(&state, &owner, new_order(PaymentMethod::Standard)).unwrap();

        assert!(matches!(
            pay_order(&state, &stranger, order.id),
            Err(AppError::Forbidden(_))
        ));

        let paid = pay_order(&state, &owner, order.id).unwrap();
        assert!(paid.is_paid);
        assert_eq!(paid.paid_amount, Some(order.shipping_fee));

        assert!(matches!(
            pay_order(&state, &owner, order.id),
            Err(AppError::Conflict(_))
        ));
        let stored = find_order(&state, order.id).unwrap();
        assert_eq!(stored.paid_amount, paid.paid_amount);
        assert_eq!(stored.payment_time, paid.payment_time);
    }

    #[test]
    fn update_keeps_fee_and_lifecycle() {
        let state = state();
        let admin = identity(Role::Admin);
        let order = create_order(&state, &admin, new_order(PaymentMethod::Standard)).unwrap();

        let mut goods = order.goods.clone();
        goods.distance_km = 50.0;
        let updated = update_order(
            &state,
            &admin,
            order.id,
            OrderUpdate {
                customer: new_order(PaymentMethod::Standard).customer,
                goods,
                collect_money: true,
                collection_amount: Money::from_major(500_000),
            },
        )
        .unwrap();

        assert_eq!(updated.shipping_fee, order.shipping_fee);
        assert_eq!(updated.goods.distance_km, 50.0);
        assert!(updated.collect_money);
        assert_eq!(updated.customer.id, order.customer_id);
    }

    #[test]
    fn update_rejects_negative_collection_amount() {
        let state = state();
        let admin = identity(Role::Admin);
        let order = create_order(&state, &admin, new_order(PaymentMethod::Standard)).unwrap();

        let err = update_order(
            &state,
            &admin,
            order.id,
            OrderUpdate {
                customer: new_order(PaymentMethod::Standard).customer,
                goods: order.goods.clone(),
                collect_money: true,
                collection_amount: Money::from_minor(-1),
            },
        )
        .unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        let stored = state.orders.get(&order.id).unwrap().clone();
        assert_eq!(stored.collection_amount, Money::ZERO);
        assert!(!stored.collect_money);
    }

    #[test]
    fn update_leaves_payment_method_and_state_alone() {
        let state = state();
        let admin = identity(Role::Admin);
        let prepaid = create_order(&state, &admin, new_order(PaymentMethod::Online)).unwrap();
        let cod = create_order(&state, &admin, new_order(PaymentMethod::Standard)).unwrap();

        // A client still sending the method gets it ignored, not applied.
        let body = serde_json::json!({
            "customer": {
                "full_name": "Tran Mai",
                "phone": "0912345678",
                "address": "12 Le Loi"
            },
            "goods": serde_json::to_value(&cod.goods).unwrap(),
            "payment_method": 3
        });
        let update: OrderUpdate = serde_json::from_value(body).unwrap();

        let updated = update_order(&state, &admin, cod.id, update.clone()).unwrap();
        assert_eq!(updated.payment_method, PaymentMethod::Standard);
        assert!(!updated.is_paid);

        let updated = update_order(&state, &admin, prepaid.id, update).unwrap();
        assert_eq!(updated.payment_method, PaymentMethod::Online);
        assert!(updated.is_paid);
        assert_eq!(updated.paid_amount, Some(prepaid.shipping_fee));
    }

    #[test]
    fn delete_releases_code_and_trail() {
        let state = state();
        let admin = identity(Role::Admin);
        let order = create_order(&state, &admin, new_order(PaymentMethod::Standard)).unwrap();

        assert!(matches!(
            delete_order(&state, &identity(Role::Customer), order.id),
            Err(AppError::Forbidden(_))
        ));
        delete_order(&state, &admin, order.id).unwrap();

        assert!(state.orders.is_empty());
        assert!(state.order_codes.is_empty());
        assert!(matches!(
            find_order_by_code(&state, &order.order_code),
            Err(AppError::NotFound(_))
        ));
    }
}
