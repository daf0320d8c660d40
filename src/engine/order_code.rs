use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Builds `<prefix><yyyyMMddHHmmssSSS><3 digits>`. The suffix is drawn from a
/// random v4 UUID; callers still check the result against existing codes.
pub fn generate_order_code(prefix: &str, now: DateTime<Utc>) -> String {
    let suffix = 100 + (Uuid::new_v4().as_u128() % 900) as u16;
    format!("{prefix}{}{suffix}", now.format("%Y%m%d%H%M%S%3f"))
}
