//! Bearer token issuance and validation.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, TokenData, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::{Role, UserAccount};

/// Claims carried by every access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user account id)
    pub sub: Uuid,
    pub username: String,
    pub role: Role,
    pub email: String,
    /// Display name
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    pub fn lifetime_secs(&self) -> i64 {
        self.lifetime_secs
    }

    pub fn issue(&self, account: &UserAccount) -> Result<String, AppError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: account.id,
            username: account.username.clone(),
            role: account.role,
            email: account.email.clone(),
            name: account.full_name.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("failed to sign token: {e}")))
    }

    pub fn validate(&self, token: &str) -> Result<Claims, AppError> {
        let token_data: TokenData<Claims> = decode(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::Unauthorized(format!("invalid token: {e}")))?;

        Ok(token_data.claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    fn account(role: Role) -> UserAccount {
        UserAccount {
            id: Uuid::new_v4(),
            username: "linh".to_string(),
            password_hash: String::new(),
            full_name: "Nguyen Linh".to_string(),
            email: "linh@example.com".to_string(),
            phone: "0901234567".to_string(),
            role,
            external_id: None,
            reset_token: None,
            reset_token_expires_at: None,
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let manager = JwtManager::new("test-secret-test-secret".to_string(), 3600);
        let user = account(Role::Shipper);

        let token = manager.issue(&user).unwrap();
        let claims = manager.validate(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.username, "linh");
        assert_eq!(claims.role, Role::Shipper);
        assert_eq!(claims.name, "Nguyen Linh");
    }

    #[test]
    fn test_foreign_signature_rejected() {
        let issuer = JwtManager::new("issuer-secret-issuer".to_string(), 3600);
        let verifier = JwtManager::new("other-secret-other!!".to_string(), 3600);

        let token = issuer.issue(&account(Role::Admin)).unwrap();
        assert!(matches!(
            verifier.validate(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        let manager = JwtManager::new("test-secret-test-secret".to_string(), -3600);
        let token = manager.issue(&account(Role::Customer)).unwrap();
        assert!(manager.validate(&token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Basic abc"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
    }
}
