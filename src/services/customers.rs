use tracing::info;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::auth::policy::{authorize, Operation};
use crate::error::AppError;
use crate::models::customer::Customer;
use crate::services::orders::CustomerDetails;
use crate::state::AppState;

pub fn list_customers(state: &AppState, identity: &Identity) -> Result<Vec<Customer>, AppError> {
    authorize(identity, Operation::ManageCustomers)?;
    let mut customers: Vec<Customer> = state.customers.iter().map(|e| e.value().clone()).collect();
    customers.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    Ok(customers)
}

pub fn get_customer(state: &AppState, identity: &Identity, id: Uuid) -> Result<Customer, AppError> {
    authorize(identity, Operation::ManageCustomers)?;
    state
        .customers
        .get(&id)
        .map(|e| e.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("customer {id} not found")))
}

pub fn create_customer(
    state: &AppState,
    identity: &Identity,
    details: CustomerDetails,
) -> Result<Customer, AppError> {
    authorize(identity, Operation::ManageCustomers)?;
    details.validate()?;

    let customer = details.into_customer(Uuid::new_v4());
    state.customers.insert(customer.id, customer.clone());
    info!(customer_id = %customer.id, "customer created");
    Ok(customer)
}

/// Updates the customer record and the snapshot held by each of its orders.
pub fn update_customer(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    details: CustomerDetails,
) -> Result<Customer, AppError> {
    authorize(identity, Operation::ManageCustomers)?;
    details.validate()?;
    if !state.customers.contains_key(&id) {
        return Err(AppError::NotFound(format!("customer {id} not found")));
    }

    let customer = details.into_customer(id);
    state.customers.insert(id, customer.clone());
    for mut order in state.orders.iter_mut() {
        if order.customer_id == id {
            order.customer = customer.clone();
        }
    }

    Ok(customer)
}

pub fn delete_customer(state: &AppState, identity: &Identity, id: Uuid) -> Result<(), AppError> {
    authorize(identity, Operation::ManageCustomers)?;

    let referenced = state.orders.iter().filter(|e| e.value().customer_id == id).count();
    if referenced > 0 {
        return Err(AppError::Conflict(format!(
            "customer {id} is referenced by {referenced} order(s)"
        )));
    }

    state
        .customers
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("customer {id} not found")))?;
    info!(customer_id = %id, "customer deleted");
    Ok(())
}
