use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A community server the platform bot has been installed into.
///
/// `guild_id` is the immutable platform-assigned id. `claimed_by` links the
/// server to the operator who administers it; a server is claimed by at most
/// one operator and the claim is never cleared by the sync engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub server_id: Uuid,
    pub guild_id: String,
    pub guild_name: String,
    pub guild_icon: Option<String>,
    pub member_count: i32,
    pub claimed_by: Option<Uuid>,
    pub bot_configured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
