use chrono::{Duration, Utc};
use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::identity::Identity;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::policy::{authorize, Operation};
use crate::error::AppError;
use crate::models::user::{Role, UserAccount};
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64,
    pub user: UserAccount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

/// Account fields accepted from an admin.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    #[serde(default)]
    pub current_password: Option<String>,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetTicket {
    pub token: String,
    pub expires_at: chrono::DateTime<Utc>,
}

fn username_key(username: &str) -> String {
    username.trim().to_lowercase()
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn email_taken(state: &AppState, email: &str, except: Option<Uuid>) -> bool {
    let email = email.trim();
    !email.is_empty()
        && state.users.iter().any(|entry| {
            Some(entry.key().to_owned()) != except && entry.value().email.eq_ignore_ascii_case(email)
        })
}

fn find_user(state: &AppState, id: Uuid) -> Result<UserAccount, AppError> {
    state
        .users
        .get(&id)
        .map(|user| user.value().clone())
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))
}

/// Inserts a new account, enforcing username and email uniqueness.
pub(crate) fn insert_account(state: &AppState, account: NewAccount) -> Result<UserAccount, AppError> {
    let username = account.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("username cannot be empty".to_string()));
    }
    validate_password(&account.password)?;
    if email_taken(state, &account.email, None) {
        return Err(AppError::Conflict(format!(
            "email {} is already registered",
            account.email.trim()
        )));
    }

    let password_hash = hash_password(&account.password)?;
    let user = UserAccount {
        id: Uuid::new_v4(),
        username: username.clone(),
        password_hash,
        full_name: account.full_name.trim().to_string(),
        email: account.email.trim().to_string(),
        phone: account.phone.trim().to_string(),
        role: account.role,
        external_id: None,
        reset_token: None,
        reset_token_expires_at: None,
    };

    match state.usernames.entry(username_key(&username)) {
        Entry::Occupied(_) => {
            return Err(AppError::Conflict(format!(
                "username {username} is already taken"
            )));
        }
        Entry::Vacant(slot) => {
            slot.insert(user.id);
        }
    }
    state.users.insert(user.id, user.clone());

    info!(user_id = %user.id, username = %user.username, role = %user.role, "account created");
    Ok(user)
}

pub fn register(state: &AppState, registration: Registration) -> Result<UserAccount, AppError> {
    insert_account(
        state,
        NewAccount {
            username: registration.username,
            password: registration.password,
            full_name: registration.full_name,
            email: registration.email,
            phone: registration.phone,
            role: Role::Customer,
        },
    )
}

pub fn login(state: &AppState, credentials: Credentials) -> Result<LoginResponse, AppError> {
    let rejected = || AppError::Unauthorized("invalid username or password".to_string());

    let user_id = state
        .usernames
        .get(&username_key(&credentials.username))
        .map(|entry| *entry.value())
        .ok_or_else(rejected)?;
    let user = find_user(state, user_id).map_err(|_| rejected())?;

    if !verify_password(&credentials.password, &user.password_hash) {
        warn!(username = %user.username, "failed login attempt");
        return Err(rejected());
    }

    let token = state.jwt.issue(&user)?;
    info!(user_id = %user.id, role = %user.role, "login succeeded");

    Ok(LoginResponse {
        token,
        expires_in: state.jwt.lifetime_secs(),
        user,
    })
}

/// Issues a single-use reset token for the account registered under `email`.
/// Delivery of the token is left to the caller.
pub fn forgot_password(state: &AppState, email: &str) -> Result<ResetTicket, AppError> {
    let email = email.trim();
    let mut user = state
        .users
        .iter_mut()
        .find(|entry| !email.is_empty() && entry.value().email.eq_ignore_ascii_case(email))
        .ok_or_else(|| AppError::NotFound(format!("no account registered for {email}")))?;

    let ticket = ResetTicket {
        token: Uuid::new_v4().simple().to_string(),
        expires_at: Utc::now() + Duration::minutes(state.config.reset_token_ttl_mins),
    };
    user.reset_token = Some(ticket.token.clone());
    user.reset_token_expires_at = Some(ticket.expires_at);

    info!(user_id = %user.id, "password reset requested");
    Ok(ticket)
}

pub fn reset_password(state: &AppState, token: &str, new_password: &str) -> Result<(), AppError> {
    validate_password(new_password)?;
    let now = Utc::now();

    let mut user = state
        .users
        .iter_mut()
        .find(|entry| {
            let user = entry.value();
            user.reset_token.as_deref() == Some(token)
                && user.reset_token_expires_at.is_some_and(|expiry| expiry > now)
        })
        .ok_or_else(|| AppError::Validation("reset token is invalid or expired".to_string()))?;

    user.password_hash = hash_password(new_password)?;
    user.reset_token = None;
    user.reset_token_expires_at = None;

    info!(user_id = %user.id, "password reset completed");
    Ok(())
}

pub fn list_users(state: &AppState, identity: &Identity) -> Result<Vec<UserAccount>, AppError> {
    authorize(identity, Operation::ManageUsers)?;
    let mut users: Vec<UserAccount> = state.users.iter().map(|e| e.value().clone()).collect();
    users.sort_by(|a, b| a.username.cmp(&b.username));
    Ok(users)
}

pub fn get_user(state: &AppState, identity: &Identity, id: Uuid) -> Result<UserAccount, AppError> {
    authorize(identity, Operation::ManageUsers)?;
    find_user(state, id)
}

pub fn create_user(
    state: &AppState,
    identity: &Identity,
    account: NewAccount,
) -> Result<UserAccount, AppError> {
    authorize(identity, Operation::ManageUsers)?;
    insert_account(state, account)
}

pub fn update_user(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    update: AccountUpdate,
) -> Result<UserAccount, AppError> {
    authorize(identity, Operation::ManageUsers)?;
    if let Some(email) = update.email.as_deref() {
        if email_taken(state, email, Some(id)) {
            return Err(AppError::Conflict(format!("email {email} is already registered")));
        }
    }

    let mut user = state
        .users
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;
    if let Some(full_name) = update.full_name {
        user.full_name = full_name;
    }
    if let Some(email) = update.email {
        user.email = email.trim().to_string();
    }
    if let Some(phone) = update.phone {
        user.phone = phone;
    }
    if let Some(role) = update.role {
        user.role = role;
    }

    info!(user_id = %id, by = %identity.user_id, "account updated");
    Ok(user.clone())
}

pub fn set_user_password(
    state: &AppState,
    identity: &Identity,
    id: Uuid,
    new_password: &str,
) -> Result<(), AppError> {
    authorize(identity, Operation::ManageUsers)?;
    validate_password(new_password)?;

    let mut user = state
        .users
        .get_mut(&id)
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;
    user.password_hash = hash_password(new_password)?;
    Ok(())
}

pub fn delete_user(state: &AppState, identity: &Identity, id: Uuid) -> Result<(), AppError> {
    authorize(identity, Operation::ManageUsers)?;
    if id == identity.user_id {
        return Err(AppError::Validation("admins cannot delete themselves".to_string()));
    }

    let (_, user) = state
        .users
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("user {id} not found")))?;
    state.usernames.remove(&username_key(&user.username));

    info!(user_id = %id, by = %identity.user_id, "account deleted");
    Ok(())
}

pub fn profile(state: &AppState, identity: &Identity) -> Result<UserAccount, AppError> {
    authorize(identity, Operation::ManageOwnProfile)?;
    find_user(state, identity.user_id)
}

pub fn update_profile(
    state: &AppState,
    identity: &Identity,
    update: ProfileUpdate,
) -> Result<UserAccount, AppError> {
    authorize(identity, Operation::ManageOwnProfile)?;
    if let Some(email) = update.email.as_deref() {
        if email_taken(state, email, Some(identity.user_id)) {
            return Err(AppError::Conflict(format!("email {email} is already registered")));
        }
    }

    let mut user = state
        .users
        .get_mut(&identity.user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", identity.user_id)))?;
    if let Some(full_name) = update.full_name {
        user.full_name = full_name;
    }
    if let Some(email) = update.email {
        user.email = email.trim().to_string();
    }
    if let Some(phone) = update.phone {
        user.phone = phone;
    }
    Ok(user.clone())
}

/// Changes the caller's password. A supplied current password must verify.
pub fn change_password(
    state: &AppState,
    identity: &Identity,
    change: PasswordChange,
) -> Result<(), AppError> {
    authorize(identity, Operation::ManageOwnProfile)?;
    validate_password(&change.new_password)?;

    let mut user = state
        .users
        .get_mut(&identity.user_id)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", identity.user_id)))?;

    if let Some(current) = change.current_password.as_deref().filter(|p| !p.is_empty()) {
        if !verify_password(current, &user.password_hash) {
            return Err(AppError::Validation("current password is incorrect".to_string()));
        }
    }

    user.password_hash = hash_password(&change.new_password)?;
    info!(user_id = %identity.user_id, "password changed");
    Ok(())
}

/// Creates the bootstrap admin unless the username already exists.
pub fn ensure_admin(state: &AppState, username: &str, password: &str) -> Result<(), AppError> {
    if state.usernames.contains_key(&username_key(username)) {
        return Ok(());
    }

    insert_account(
        state,
        NewAccount {
            username: username.to_string(),
            password: password.to_string(),
            full_name: "Administrator".to_string(),
            email: String::new(),
            phone: String::new(),
            role: Role::Admin,
        },
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::Config;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(Config::for_tests()))
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            password: "secret-123".to_string(),
            full_name: "Vo Thu".to_string(),
            email: email.to_string(),
            phone: String::new(),
        }
    }

    fn as_identity(user: &UserAccount) -> Identity {
        Identity {
            user_id: user.id,
            username: user.username.clone(),
            role: user.role,
            email: user.email.clone(),
            display_name: user.full_name.clone(),
        }
    }

    #[test]
    fn register_then_login_issues_customer_token() {
        let state = state();
        let user = register(&state, registration("thu", "thu@example.com")).unwrap();
        assert_eq!(user.role, Role::Customer);

        let response = login(
            &state,
            Credentials {
                username: "THU".to_string(),
                password: "secret-123".to_string(),
            },
        )
        .unwrap();

        let claims = state.jwt.validate(&response.token).unwrap();
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.role, Role::Customer);
    }

    #[test]
    fn wrong_password_is_unauthorized() {
        let state = state();
        register(&state, registration("thu", "")).unwrap();
        let err = login(
            &state,
            Credentials {
                username: "thu".to_string(),
                password: "nope-nope".to_string(),
            },
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn duplicate_username_or_email_conflicts() {
        let state = state();
        register(&state, registration("thu", "thu@example.com")).unwrap();

        assert!(matches!(
            register(&state, registration("Thu", "other@example.com")),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(
            register(&state, registration("other", "THU@example.com")),
            Err(AppError::Conflict(_))
        ));
        assert_eq!(state.users.len(), 1);
    }

    #[test]
    fn reset_token_is_single_use() {
        let state = state();
        register(&state, registration("thu", "thu@example.com")).unwrap();

        let ticket = forgot_password(&state, "thu@example.com").unwrap();
        reset_password(&state, &ticket.token, "brand-new-pass").unwrap();
        assert!(matches!(
            reset_password(&state, &ticket.token, "another-pass"),
            Err(AppError::Validation(_))
        ));

        let ok = login(
            &state,
            Credentials {
                username: "thu".to_string(),
                password: "brand-new-pass".to_string(),
            },
        );
        assert!(ok.is_ok());
    }

    #[test]
    fn expired_reset_token_is_rejected() {
        let state = state();
        let user = register(&state, registration("thu", "thu@example.com")).unwrap();
        let ticket = forgot_password(&state, "thu@example.com").unwrap();
        state.users.get_mut(&user.id).unwrap().reset_token_expires_at =
            Some(Utc::now() - Duration::minutes(1));

        assert!(matches!(
            reset_password(&state, &ticket.token, "brand-new-pass"),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn change_password_checks_current_when_given() {
        let state = state();
        let user = register(&state, registration("thu", "")).unwrap();
        let me = as_identity(&user);

        let wrong = PasswordChange {
            current_password: Some("not-it".to_string()),
            new_password: "next-pass-1".to_string(),
        };
        assert!(matches!(
            change_password(&state, &me, wrong),
            Err(AppError::Validation(_))
        ));

        let right = PasswordChange {
            current_password: Some("secret-123".to_string()),
            new_password: "next-pass-1".to_string(),
        };
        change_password(&state, &me, right).unwrap();
        let stored = state.users.get(&user.id).unwrap().password_hash.clone();
        assert!(verify_password("next-pass-1", &stored));
    }

    #[test]
    fn user_management_is_admin_only() {
        let state = state();
        let customer = register(&state, registration("thu", "")).unwrap();
        assert!(matches!(
            list_users(&state, &as_identity(&customer)),
            Err(AppError::Forbidden(_))
        ));

        ensure_admin(&state, "root", "root-pass").unwrap();
        ensure_admin(&state, "root", "root-pass").unwrap();
        let admin_id = *state.usernames.get("root").unwrap().value();
        let admin = as_identity(&state.users.get(&admin_id).unwrap().clone());

        assert_eq!(list_users(&state, &admin).unwrap().len(), 2);
        delete_user(&state, &admin, customer.id).unwrap();
        assert!(state.usernames.get("thu").is_none());
        assert!(matches!(
            delete_user(&state, &admin, admin.user_id),
            Err(AppError::Validation(_))
        ));
    }
}
