use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub ward: String,
    pub district: String,
    pub city: String,
}
