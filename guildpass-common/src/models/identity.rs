use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The operator's linked account on the external chat platform.
///
/// At most one active identity per operator. Created on the first successful
/// token exchange and updated in place on every refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatIdentity {
    pub chat_identity_id: Uuid,
    pub operator_id: Uuid,
    pub external_user_id: String,
    pub external_username: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatIdentity {
    /// Whether the access token has passed its expiry timestamp.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(at) => at <= now,
            None => false,
        }
    }
}
