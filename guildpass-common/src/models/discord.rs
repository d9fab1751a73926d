use serde::{Deserialize, Serialize};

/// ADMINISTRATOR permission bit in the platform's permission bitmask.
pub const ADMINISTRATOR_BIT: u64 = 0x8;

/// One guild entry as returned by the user-delegated token exchange.
///
/// `permissions` arrives as a decimal string; a value that fails to parse is
/// treated as no permissions at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OauthGuild {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    #[serde(default)]
    pub owner: bool,
    #[serde(default)]
    pub permissions: String,
}

impl OauthGuild {
    /// Admin-eligibility predicate: the operator either owns the guild or
    /// holds the ADMINISTRATOR bit.
    pub fn is_admin_eligible(&self) -> bool {
        if self.owner {
            return true;
        }
        self.permissions
            .parse::<u64>()
            .map(|bits| bits & ADMINISTRATOR_BIT != 0)
            .unwrap_or(false)
    }
}
