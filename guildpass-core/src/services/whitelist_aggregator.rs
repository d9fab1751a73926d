// File: src/services/whitelist_aggregator.rs
//
// Computes the authoritative whitelist count per product config. Configs
// sharing an external group id share one license pool, possibly across
// servers, so the count must expand to the whole group before deduplicating
// by redeeming principal. Counting within a single server undercounts
// whenever a creator has copied a configuration to a second community.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use guildpass_common::error::Error;
use guildpass_common::models::product::{ProductConfig, RedemptionRecord};
use guildpass_common::traits::repository_traits::{ProductConfigRepository, RedemptionRepository};

pub struct WhitelistAggregator {
    product_repo: Arc<dyn ProductConfigRepository>,
    redemption_repo: Arc<dyn RedemptionRepository>,
}

impl WhitelistAggregator {
    pub fn new(
        product_repo: Arc<dyn ProductConfigRepository>,
        redemption_repo: Arc<dyn RedemptionRepository>,
    ) -> Self {
        Self {
            product_repo,
            redemption_repo,
        }
    }

    /// Deduplicated redemption count for every config in the input, keyed by
    /// config id. Every config sharing a group id reports the same count.
    pub async fn aggregate(
        &self,
        configs: &[ProductConfig],
    ) -> Result<HashMap<Uuid, i64>, Error> {
        let mut groups: HashMap<&str, Vec<Uuid>> = HashMap::new();
        for cfg in configs {
            groups
                .entry(cfg.external_group_id.as_str())
                .or_default()
                .push(cfg.product_config_id);
        }

        let mut counts = HashMap::new();
        for (group_id, members) in groups {
            let expanded = self.expand_group(group_id, &members).await?;
            let records = self.redemption_repo.list_for_products(&expanded).await?;

            let principals: HashSet<&str> = records
                .iter()
                .map(|r| r.external_user_id.as_str())
                .collect();
            let count = principals.len() as i64;
            debug!(
                "group {group_id}: {} configs, {} redemptions, {count} unique principals",
                expanded.len(),
                records.len()
            );

            for config_id in expanded {
                counts.insert(config_id, count);
            }
        }
        Ok(counts)
    }

    /// The whitelist membership for one config's group, deduplicated by
    /// principal (first redemption per principal wins).
    pub async fn list_whitelist(
        &self,
        product_config_id: Uuid,
    ) -> Result<Vec<RedemptionRecord>, Error> {
        let config = self
            .product_repo
            .get_by_id(product_config_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("product config {product_config_id}")))?;

        let expanded = self
            .expand_group(&config.external_group_id, &[product_config_id])
            .await?;
        let records = self.redemption_repo.list_for_products(&expanded).await?;

        let mut seen: HashSet<String> = HashSet::new();
        let mut out = Vec::new();
        for record in records {
            if seen.insert(record.external_user_id.clone()) {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// All config ids sharing the group id, across every server, merged with
    /// the ids already in hand (in case persistence lags behind the caller).
    async fn expand_group(&self, group_id: &str, known: &[Uuid]) -> Result<Vec<Uuid>, Error> {
        let mut ids: Vec<Uuid> = self
            .product_repo
            .list_by_group_id(group_id)
            .await?
            .into_iter()
            .map(|c| c.product_config_id)
            .collect();
        for id in known {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }
        Ok(ids)
    }
}
