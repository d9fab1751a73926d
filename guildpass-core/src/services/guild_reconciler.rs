// File: src/services/guild_reconciler.rs
//
// Reconciles the operator's upstream server memberships against local
// records. Two acquisition strategies share one output shape:
//
//   A. user-delegated — the raw guild list from the token exchange, filtered
//      by the admin-eligibility predicate, with a conditional claim on any
//      matching unclaimed record;
//   B. bot-authoritative — pre-verified results from the bot lookup, which
//      need no claim writes at all.
//
// The engine never creates server rows on behalf of a user; guilds with no
// local record are dropped because the bot was never installed there.
// Transient network/storage failures degrade to the last cached snapshot (or
// an empty list) rather than surfacing to the caller.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use guildpass_common::error::Error;
use guildpass_common::models::cache::{CacheEntry, ReconciledServer};
use guildpass_common::models::discord::OauthGuild;
use guildpass_common::models::server::Server;
use guildpass_common::traits::repository_traits::{ProductConfigRepository, ServerRepository};

use crate::cache::EntitlementCache;
use crate::platforms::discord::BotLookupApi;
use crate::services::whitelist_aggregator::WhitelistAggregator;

pub struct GuildReconciler {
    server_repo: Arc<dyn ServerRepository>,
    product_repo: Arc<dyn ProductConfigRepository>,
    bot_lookup: Arc<dyn BotLookupApi>,
    aggregator: Arc<WhitelistAggregator>,
    cache: Arc<EntitlementCache>,
}

impl GuildReconciler {
    pub fn new(
        server_repo: Arc<dyn ServerRepository>,
        product_repo: Arc<dyn ProductConfigRepository>,
        bot_lookup: Arc<dyn BotLookupApi>,
        aggregator: Arc<WhitelistAggregator>,
        cache: Arc<EntitlementCache>,
    ) -> Self {
        Self {
            server_repo,
            product_repo,
            bot_lookup,
            aggregator,
            cache,
        }
    }

    /// Strategy A: reconcile from the guild list returned by the token
    /// exchange. Unclaimed matching servers are claimed for the operator;
    /// guilds without a local record are dropped. Idempotent: a second run
    /// over the same list performs no further claim writes.
    pub async fn reconcile_delegated(
        &self,
        operator_id: Uuid,
        guilds: &[OauthGuild],
    ) -> Result<Vec<ReconciledServer>, Error> {
        match self.delegated_inner(operator_id, guilds).await {
            Ok(servers) => Ok(servers),
            Err(e) => {
                warn!("delegated reconciliation failed for operator {operator_id}: {e}");
                Ok(self.cached_or_empty(operator_id).await)
            }
        }
    }

    /// Strategy B: reconcile from the bot-authoritative lookup. Results are
    /// pre-verified server-side, so no claim writes happen; a still-unclaimed
    /// record is presented as the operator's without touching storage. An
    /// empty result is a normal answer, not a re-link prompt.
    pub async fn reconcile_bot_authoritative(
        &self,
        operator_id: Uuid,
        external_user_id: &str,
    ) -> Result<Vec<ReconciledServer>, Error> {
        match self.bot_inner(operator_id, external_user_id).await {
            Ok(servers) => Ok(servers),
            Err(e) => {
                warn!("bot-authoritative sync failed for operator {operator_id}: {e}");
                Ok(self.cached_or_empty(operator_id).await)
            }
        }
    }

    async fn delegated_inner(
        &self,
        operator_id: Uuid,
        guilds: &[OauthGuild],
    ) -> Result<Vec<ReconciledServer>, Error> {
        let eligible_ids: Vec<String> = guilds
            .iter()
            .filter(|g| g.is_admin_eligible())
            .map(|g| g.id.clone())
            .collect();
        debug!(
            "operator {operator_id}: {} of {} guilds admin-eligible",
            eligible_ids.len(),
            guilds.len()
        );

        let mut servers = self.server_repo.list_by_guild_ids(&eligible_ids).await?;

        for server in servers.iter_mut() {
            if server.claimed_by.is_none() {
                let won = self
                    .server_repo
                    .claim_if_unclaimed(&server.guild_id, operator_id)
                    .await?;
                if won {
                    info!("operator {operator_id} claimed server {}", server.guild_id);
                    server.claimed_by = Some(operator_id);
                    server.bot_configured = true;
                } else if let Some(fresh) =
                    self.server_repo.get_by_guild_id(&server.guild_id).await?
                {
                    // Someone else won the race; pick up their claim.
                    server.claimed_by = fresh.claimed_by;
                    server.bot_configured = fresh.bot_configured;
                }
            }
        }

        let reconciled = self.assemble(&servers, None).await?;
        self.write_cache(operator_id, &reconciled).await;
        Ok(reconciled)
    }

    async fn bot_inner(
        &self,
        operator_id: Uuid,
        external_user_id: &str,
    ) -> Result<Vec<ReconciledServer>, Error> {
        let entries = self.bot_lookup.list_operator_servers(external_user_id).await?;
        if entries.is_empty() {
            debug!("bot lookup returned no servers for operator {operator_id}");
        }

        let mut servers = Vec::new();
        for entry in &entries {
            match self.server_repo.get_by_guild_id(&entry.guild_id).await? {
                Some(server) => servers.push(server),
                None => {
                    // Lookup knows the guild but persistence does not; the
                    // installation flow has not written the row yet.
                    warn!("bot lookup returned unknown guild {}", entry.guild_id);
                }
            }
        }

        let reconciled = self.assemble(&servers, Some(operator_id)).await?;
        self.write_cache(operator_id, &reconciled).await;
        Ok(reconciled)
    }

    /// Attach each server's product configs and the aggregated whitelist
    /// counts. `implicit_claimant` marks still-unclaimed rows as belonging to
    /// the operator in the view only (bot-authoritative path).
    async fn assemble(
        &self,
        servers: &[Server],
        implicit_claimant: Option<Uuid>,
    ) -> Result<Vec<ReconciledServer>, Error> {
        let mut products_by_server = HashMap::new();
        let mut all_products = Vec::new();
        for server in servers {
            let products = self.product_repo.list_for_server(server.server_id).await?;
            all_products.extend(products.iter().cloned());
            products_by_server.insert(server.server_id, products);
        }

        let counts = self.aggregator.aggregate(&all_products).await?;

        let mut out = Vec::new();
        for server in servers {
            let products: Vec<_> = products_by_server
                .remove(&server.server_id)
                .unwrap_or_default();
            let whitelist_counts = products
                .iter()
                .filter_map(|p| {
                    counts
                        .get(&p.product_config_id)
                        .map(|c| (p.product_config_id, *c))
                })
                .collect();
            out.push(ReconciledServer {
                server_id: server.server_id,
                guild_id: server.guild_id.clone(),
                guild_name: server.guild_name.clone(),
                guild_icon: server.guild_icon.clone(),
                member_count: server.member_count,
                claimed_by: server.claimed_by.or(implicit_claimant),
                bot_configured: server.bot_configured,
                products,
                whitelist_counts,
            });
        }
        Ok(out)
    }

    /// Last-known snapshot for the operator, or an empty list. The stale flag
    /// is irrelevant here: degraded data beats no data.
    async fn cached_or_empty(&self, operator_id: Uuid) -> Vec<ReconciledServer> {
        self.cache
            .read(operator_id)
            .await
            .map(|c| c.entry.servers)
            .unwrap_or_default()
    }

    async fn write_cache(&self, operator_id: Uuid, servers: &[ReconciledServer]) {
        let entry = CacheEntry::new(servers.to_vec());
        if let Err(e) = self.cache.write(operator_id, &entry).await {
            // A failed cache write costs one render of latency, nothing more.
            warn!("cache write failed for operator {operator_id}: {e}");
        }
    }
}
