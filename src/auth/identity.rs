use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::auth::token::{extract_bearer_token, Claims};
use crate::error::AppError;
use crate::models::user::Role;
use crate::state::AppState;

/// The caller behind a request, taken from verified token claims and passed
/// explicitly into every service call.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub email: String,
    pub display_name: String,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Identity {
            user_id: claims.sub,
            username: claims.username,
            role: claims.role,
            email: claims.email,
            display_name: claims.name,
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Identity {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let token = extract_bearer_token(header)
            .ok_or_else(|| AppError::Unauthorized("malformed authorization header".to_string()))?;

        let claims = state.jwt.validate(token)?;
        Ok(Identity::from(claims))
    }
}
