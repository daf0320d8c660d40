//! Role and ownership rules gating every operation.
//!
//! Decisions are made against the caller's token claims. Ownership checks need
//! the entity, so services load it first and then call [`require_owner`].

use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::error::AppError;
use crate::models::user::Role;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListOrders,
    ReadOrder,
    ListMyOrders,
    CreateOrder,
    UpdateOrder,
    UpdateOrderStatus,
    AssignStaff,
    PayOrder,
    ConfirmReceived,
    DeleteOrder,
    PostFeedback,
    ReadFeedback,
    ListMyFeedback,
    ReadStaff,
    ManageStaff,
    UpdateStaffAvailability,
    ReadOwnStaffRecord,
    ManageCustomers,
    ViewReports,
    ManageUsers,
    ManageOwnProfile,
    CheckIn,
    ReadTracking,
}

const ANY: &[Role] = &[Role::Admin, Role::Shipper, Role::Customer];
const ADMIN: &[Role] = &[Role::Admin];
const CUSTOMER: &[Role] = &[Role::Customer];
const ADMIN_OR_CUSTOMER: &[Role] = &[Role::Admin, Role::Customer];
const ADMIN_OR_SHIPPER: &[Role] = &[Role::Admin, Role::Shipper];

impl Operation {
    pub fn allowed_roles(self) -> &'static [Role] {
        use Operation::*;

        match self {
            ListOrders | ReadOrder | ListMyOrders => ANY,
            CreateOrder => ADMIN_OR_CUSTOMER,
            UpdateOrder => ADMIN,
            // Shippers may move any order, not only ones assigned to them.
            UpdateOrderStatus => ADMIN_OR_SHIPPER,
            AssignStaff | DeleteOrder => ADMIN,
            PayOrder | ConfirmReceived | PostFeedback | ListMyFeedback => CUSTOMER,
            ReadFeedback => ANY,
            ReadStaff => ANY,
            ManageStaff => ADMIN,
            UpdateStaffAvailability | ReadOwnStaffRecord => ADMIN_OR_SHIPPER,
            ManageCustomers | ViewReports | ManageUsers => ADMIN,
            ManageOwnProfile => ANY,
            CheckIn => ADMIN_OR_SHIPPER,
            ReadTracking => ANY,
        }
    }
}

pub fn authorize(identity: &Identity, operation: Operation) -> Result<(), AppError> {
    if operation.allowed_roles().contains(&identity.role) {
        return Ok(());
    }

    tracing::debug!(
        user_id = %identity.user_id,
        role = %identity.role,
        ?operation,
        "operation denied by role"
    );
    Err(AppError::Forbidden(format!(
        "role {} may not perform {:?}",
        identity.role, operation
    )))
}

/// Role check followed by an ownership check against `owner`.
pub fn authorize_owner(
    identity: &Identity,
    operation: Operation,
    owner: Option<Uuid>,
) -> Result<(), AppError> {
    authorize(identity, operation)?;
    require_owner(identity, owner)
}

pub fn require_owner(identity: &Identity, owner: Option<Uuid>) -> Result<(), AppError> {
    if owner == Some(identity.user_id) {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "only the creator of this order may do that".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{authorize, authorize_owner, Operation};
    use crate::auth::identity::Identity;
    use crate::error::AppError;
    use crate::models::user::Role;

    fn identity(role: Role) -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            username: format!("{role}-user"),
            role,
            email: String::new(),
            display_name: String::new(),
        }
    }

    fn allowed(role: Role, operation: Operation) -> bool {
        authorize(&identity(role), operation).is_ok()
    }

    #[test]
    fn order_rules_match_role_matrix() {
        use Role::*;

        let cases = [
            (Operation::ListOrders, [true, true, true]),
            (Operation::ListMyOrders, [true, true, true]),
            (Operation::CreateOrder, [true, false, true]),
            (Operation::UpdateOrderStatus, [true, true, false]),
            (Operation::AssignStaff, [true, false, false]),
            (Operation::PayOrder, [false, false, true]),
            (Operation::DeleteOrder, [true, false, false]),
            (Operation::PostFeedback, [false, false, true]),
        ];

        for (operation, expected) in cases {
            let actual = [
                allowed(Admin, operation),
                allowed(Shipper, operation),
                allowed(Customer, operation),
            ];
            assert_eq!(actual, expected, "{operation:?}");
        }
    }

    #[test]
    fn administrative_areas_are_admin_only() {
        for operation in [
            Operation::ManageStaff,
            Operation::ManageCustomers,
            Operation::ViewReports,
            Operation::ManageUsers,
        ] {
            assert!(allowed(Role::Admin, operation));
            assert!(!allowed(Role::Shipper, operation));
            assert!(!allowed(Role::Customer, operation));
        }
        assert!(allowed(Role::Customer, Operation::ReadStaff));
    }

    #[test]
    fn ownership_is_checked_after_role() {
        let customer = identity(Role::Customer);
        let other = Uuid::new_v4();

        assert!(authorize_owner(&customer, Operation::PayOrder, Some(customer.user_id)).is_ok());
        assert!(matches!(
            authorize_owner(&customer, Operation::PayOrder, Some(other)),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            authorize_owner(&customer, Operation::PayOrder, None),
            Err(AppError::Forbidden(_))
        ));

        let admin = identity(Role::Admin);
        assert!(matches!(
            authorize_owner(&admin, Operation::PayOrder, Some(admin.user_id)),
            Err(AppError::Forbidden(_))
        ));
    }
}
