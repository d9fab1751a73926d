use std::collections::HashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::product::ProductConfig;

/// One reconciled server as presented to the caller: the server row plus its
/// product configurations and the computed whitelist count per config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledServer {
    pub server_id: Uuid,
    pub guild_id: String,
    pub guild_name: String,
    pub guild_icon: Option<String>,
    pub member_count: i32,
    pub claimed_by: Option<Uuid>,
    pub bot_configured: bool,
    pub products: Vec<ProductConfig>,
    pub whitelist_counts: HashMap<Uuid, i64>,
}

/// Snapshot written into the entitlement cache after a reconciliation.
/// Always overwritten whole, never patched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub servers: Vec<ReconciledServer>,
    pub timestamp: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(servers: Vec<ReconciledServer>) -> Self {
        Self {
            servers,
            timestamp: Utc::now(),
        }
    }
}
