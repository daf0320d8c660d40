use std::env;

use crate::error::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub jwt_secret: String,
    pub jwt_ttl_secs: i64,
    pub order_code_prefix: String,
    pub reset_token_ttl_mins: i64,
    pub default_staff_password: String,
    pub seed_admin: Option<SeedAdmin>,
}

#[derive(Debug, Clone)]
pub struct SeedAdmin {
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal("JWT_SECRET must be set".to_string()))?;
        if jwt_secret.len() < 16 {
            return Err(AppError::Internal(
                "JWT_SECRET must be at least 16 bytes".to_string(),
            ));
        }

        let seed_admin = match (env::var("SEED_ADMIN_USERNAME"), env::var("SEED_ADMIN_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(SeedAdmin { username, password }),
            _ => None,
        };

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            jwt_secret,
            jwt_ttl_secs: parse_or_default("JWT_TTL_SECS", 86_400)?,
            order_code_prefix: env::var("ORDER_CODE_PREFIX").unwrap_or_else(|_| "DH".to_string()),
            reset_token_ttl_mins: parse_or_default("RESET_TOKEN_TTL_MINS", 15)?,
            default_staff_password: env::var("DEFAULT_STAFF_PASSWORD")
                .unwrap_or_else(|_| "123456".to_string()),
            seed_admin,
        })
    }

    /// Settings for tests and local tooling; never read from the environment.
    pub fn for_tests() -> Self {
        Self {
            http_port: 0,
            log_level: "debug".to_string(),
            jwt_secret: "test-secret-test-secret".to_string(),
            jwt_ttl_secs: 3_600,
            order_code_prefix: "DH".to_string(),
            reset_token_ttl_mins: 15,
            default_staff_password: "123456".to_string(),
            seed_admin: None,
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
