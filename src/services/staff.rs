use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::auth::policy::{authorize, Operation};
use crate::error::AppError;
use crate::models::staff::DeliveryStaff;
use crate::models::user::{Role, UserAccount};
use crate::services::accounts::{insert_account, NewAccount};
use crate::state::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct StaffDetails {
    pub full_name: String,
    pub phone: String,
    #[serde(default)]
    pub vehicle_type: String,
    #[serde(default)]
    pub vehicle_plate: String,
}

impl StaffDetails {
    fn validate(&self) -> Result<(), AppError> {
        if self.full_name.trim().is_empty() {
            return Err(AppError::Validation("staff name cannot be empty".to_string()));
        }
        if self.phone.trim().is_empty() {
            return Err(AppError::Validation("staff phone cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    #[serde(flatten)]
    pub details: StaffDetails,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// A new roster entry together with its shipper login. The initial password
/// is only ever returned here.
#[derive(Debug, Clone, Serialize)]
pub struct StaffAccount {
    pub staff: DeliveryStaff,
    pub account: UserAccount,
    pub initial_password: String,
}

fn find_staff(state: &AppState, id: Uuid) -> Result<DeliveryStaff, AppError> {
    state
        .staff
        .get(&id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("staff {id} not found")))
}

fn sorted(mut staff: Vec<DeliveryStaff>) -> Vec<DeliveryStaff> {
    staff.sort_by(|a, b| a.full_name.cmp(&b.full_name));
    staff
}

pub fn list_staff(state: &AppState, identity: &Identity) -> Result<Vec<DeliveryStaff>, AppError> {
    authorize(identity, Operation::ReadStaff)?;
    Ok(sorted(state.staff.iter().map(|e| e.value().clone()).collect()))
}

pub fn list_available(
    state: &AppState,
    identity: &Identity,
) -> Result<Vec<DeliveryStaff>, AppError> {
    authorize(identity, Operation::ReadStaff)?;
    Ok(sorted(
        state
            .staff
            .iter()
            .filter(|e| e.value().is_available)
            .map(|e| e.value().clone())
            .collect(),
    ))
}

pub fn get_staff(state: &AppState, identity: &Identity, id: Uuid) -> Result<DeliveryStaff, AppError> {
    authorize(identity, Operation::ReadStaff)?;
    find_staff(state, id)
}

/// The roster entry linked to the caller's account, falling back to a match
/// on display name for entries created before accounts were linked.
pub fn my_staff_record(state: &AppState, identity: &Identity) -> Result<DeliveryStaff, AppError> {
    authorize(identity, Operation::ReadOwnStaffRecord)?;

    let linked = state
        .staff
        .iter()
        .find(|e| e.value().account_id == Some(identity.user_id))
        .map(|e| e.value().clone());
    if let Some(staff) = linked {
        return Ok(staff);
    }

    state
        .staff
        .iter()
        .find(|e| {
            !identity.display_name.is_empty() && e.value().full_name == identity.display_name
        })
        .map(|e| e.value().clone())
        .ok_or_else(|| AppError::NotFound("no staff record for this account".to_string()))
}

pub fn create_staff(
    state: &AppState,
    identity: &Identity,
    request: NewStaff,
) -> Result<StaffAccount, AppError> {
    authorize(identity, Operation::ManageStaff)?;
    request.details.validate()?;

    let initial_password = request
        .password
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| state.config.default_staff_password.clone());

    let account = insert_account(
        state,
        NewAccount {
            username: request.username,
            password: initial_password.clone(),
            full_name: request.details.full_name.trim().to_string(),
            email: request.email,
            phone: request.details.phone.trim().to_string(),
            role: Role::Shipper,
        },
    )?;

    let staff = DeliveryStaff {
        id: Uuid::new_v4(),
        full_name: request.details.full_name.trim().to_string(),
        phone: request.details.phone.trim().to_string(),
        vehicle_type: request.details.vehicle_type,
        vehicle_plate: request.details.vehicle_plate,
        is_available: true,
        account_id: Some(account.id),
        updated_at: Utc::now(),
    };
    state.staff.insert(staff.id, staff.clone());

    info!(staff_id = %staff.id, account_id = %account.id, "staff member added");

    Ok(StaffAccount {
        staff,
        account,
        initial_password,
    })
}

pub fn update_staff(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    details: StaffDetails,
) -> Result<DeliveryStaff, AppError> {
    authorize(identity, Operation::ManageStaff)?;
    details.validate()?;

    let mut staff = state
        .staff
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("staff {id} not found")))?;
    staff.full_name = details.full_name.trim().to_string();
    staff.phone = details.phone.trim().to_string();
    staff.vehicle_type = details.vehicle_type;
    staff.vehicle_plate = details.vehicle_plate;
    staff.updated_at = Utc::now();

    Ok(staff.clone())
}

/// Admins may toggle anyone; shippers only their own linked record.
pub fn set_availability(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    is_available: bool,
) -> Result<DeliveryStaff, AppError> {
    authorize(identity, Operation::UpdateStaffAvailability)?;

    let mut staff = state
        .staff
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("staff {id} not found")))?;
    if !identity.is_admin() && staff.account_id != Some(identity.user_id) {
        return Err(AppError::Forbidden(
            "shippers may only change their own availability".to_string(),
        ));
    }

    staff.is_available = is_available;
    staff.updated_at = Utc::now();
    info!(staff_id = %id, is_available, "staff availability changed");

    Ok(staff.clone())
}

/// Removes the roster entry. Orders keep their historical assignment and the
/// linked shipper account stays active until removed through user management.
pub fn delete_staff(state: &AppState, identity: &Identity, id: Uuid) -> Result<(), AppError> {
    authorize(identity, Operation::ManageStaff)?;
    state
        .staff
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("staff {id} not found")))?;

    info!(staff_id = %id, by = %identity.user_id, "staff member removed");
    Ok(())
}
