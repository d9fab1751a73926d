use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A license/whitelist configuration scoping one sellable item to one server.
///
/// `external_group_id` ties together every config that licenses the same
/// upstream resource. A creator duplicating a configuration across two
/// communities produces two ProductConfigs with the same group id, and those
/// share one license pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductConfig {
    pub product_config_id: Uuid,
    pub server_id: Uuid,
    pub external_group_id: String,
    pub grant_role_id: Option<String>,
    pub redemption_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Proof that one external principal redeemed a license under one config.
/// Written by the platform bot; read-only to the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedemptionRecord {
    pub redemption_id: Uuid,
    pub product_config_id: Uuid,
    pub external_user_id: String,
    pub game_account_id: String,
    pub game_account_name: Option<String>,
    pub redeemed_at: DateTime<Utc>,
}
