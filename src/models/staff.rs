use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStaff {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub vehicle_type: String,
    pub vehicle_plate: String,
    pub is_available: bool,
    /// Shipper login created alongside the roster entry.
    pub account_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}
