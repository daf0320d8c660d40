use dashmap::DashMap;
use uuid::Uuid;

use crate::auth::token::JwtManager;
use crate::config::Config;
use crate::models::checkpoint::Checkpoint;
use crate::models::customer::Customer;
use crate::models::feedback::Feedback;
use crate::models::order::DeliveryOrder;
use crate::models::staff::DeliveryStaff;
use crate::models::user::UserAccount;
use crate::observability::metrics::Metrics;

pub struct AppState {
    pub config: Config,
    pub jwt: JwtManager,
    pub customers: DashMap<Uuid, Customer>,
    pub orders: DashMap<Uuid, DeliveryOrder>,
    /// order code -> order id
    pub order_codes: DashMap<String, Uuid>,
    pub staff: DashMap<Uuid, DeliveryStaff>,
    /// order id -> checkpoints in insertion order
    pub checkpoints: DashMap<Uuid, Vec<Checkpoint>>,
    pub users: DashMap<Uuid, UserAccount>,
    /// lowercased username -> user id
    pub usernames: DashMap<String, Uuid>,
    pub feedback: DashMap<Uuid, Feedback>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.jwt_ttl_secs);

        Self {
            config,
            jwt,
            customers: DashMap::new(),
            orders: DashMap::new(),
            order_codes: DashMap::new(),
            staff: DashMap::new(),
            checkpoints: DashMap::new(),
            users: DashMap::new(),
            usernames: DashMap::new(),
            feedback: DashMap::new(),
            metrics: Metrics::new(),
        }
    }
}
