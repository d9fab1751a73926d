use async_trait::async_trait;
use uuid::Uuid;
use crate::error::Error;
use crate::models::identity::ChatIdentity;
use crate::models::policy::{CommandPolicy, ConfigurableCommand};
use crate::models::product::{ProductConfig, RedemptionRecord};
use crate::models::server::Server;

#[async_trait]
pub trait ServerRepository: Send + Sync {
    async fn get_by_guild_id(&self, guild_id: &str) -> Result<Option<Server>, Error>;

    /// Fetch every known server whose external guild id is in the given set.
    /// Ids with no local record are simply absent from the result.
    async fn list_by_guild_ids(&self, guild_ids: &[String]) -> Result<Vec<Server>, Error>;

    async fn list_claimed_by(&self, operator_id: Uuid) -> Result<Vec<Server>, Error>;

    /// Conditional claim: assigns `operator_id` and marks the bot configured
    /// only while `claimed_by` is still null. Returns whether this call won
    /// the claim; a losing racer's call is a no-op.
    async fn claim_if_unclaimed(&self, guild_id: &str, operator_id: Uuid) -> Result<bool, Error>;
}

#[async_trait]
pub trait ProductConfigRepository: Send + Sync {
    async fn get_by_id(&self, product_config_id: Uuid) -> Result<Option<ProductConfig>, Error>;

    async fn list_for_server(&self, server_id: Uuid) -> Result<Vec<ProductConfig>, Error>;

    /// Every config sharing the external group id, across all servers.
    async fn list_by_group_id(&self, external_group_id: &str) -> Result<Vec<ProductConfig>, Error>;
}

#[async_trait]
pub trait RedemptionRepository: Send + Sync {
    async fn list_for_products(
        &self,
        product_config_ids: &[Uuid],
    ) -> Result<Vec<RedemptionRecord>, Error>;
}

#[async_trait]
pub trait CommandPolicyRepository: Send + Sync {
    async fn get_policy(
        &self,
        server_id: Uuid,
        command: ConfigurableCommand,
    ) -> Result<Option<CommandPolicy>, Error>;

    async fn list_policies(&self, server_id: Uuid) -> Result<Vec<CommandPolicy>, Error>;

    /// Upsert keyed by (server_id, command).
    async fn upsert_policy(&self, policy: &CommandPolicy) -> Result<(), Error>;
}

#[async_trait]
pub trait ChatIdentityRepository: Send + Sync {
    async fn get_for_operator(&self, operator_id: Uuid) -> Result<Option<ChatIdentity>, Error>;

    /// Insert or update the single identity row for the identity's operator.
    async fn upsert_identity(&self, identity: &ChatIdentity) -> Result<(), Error>;

    async fn delete_for_operator(&self, operator_id: Uuid) -> Result<(), Error>;
}
