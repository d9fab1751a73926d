// tests/reconciler_tests.rs

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use uuid::Uuid;

use guildpass_common::models::cache::CacheEntry;
use guildpass_common::models::discord::OauthGuild;
use guildpass_common::models::product::{ProductConfig, RedemptionRecord};
use guildpass_common::models::server::Server;
use guildpass_common::traits::repository_traits::{
    ProductConfigRepository, RedemptionRepository, ServerRepository,
};
use guildpass_core::Error;
use guildpass_core::cache::{EntitlementCache, InMemoryCacheStore};
use guildpass_core::platforms::discord::{BotLookupApi, BotServerEntry};
use guildpass_core::services::{GuildReconciler, WhitelistAggregator};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

#[derive(Default)]
struct MockServerRepo {
    servers: Mutex<HashMap<String, Server>>,
    claim_writes: AtomicUsize,
}

impl MockServerRepo {
    fn with_servers(servers: Vec<Server>) -> Self {
        let repo = Self::default();
        {
            let mut g = repo.servers.lock().unwrap();
            for s in servers {
                g.insert(s.guild_id.clone(), s);
            }
        }
        repo
    }
}

#[async_trait]
impl ServerRepository for MockServerRepo {
    async fn get_by_guild_id(&self, guild_id: &str) -> Result<Option<Server>, Error> {
        Ok(self.servers.lock().unwrap().get(guild_id).cloned())
    }

    async fn list_by_guild_ids(&self, guild_ids: &[String]) -> Result<Vec<Server>, Error> {
        let g = self.servers.lock().unwrap();
        Ok(guild_ids.iter().filter_map(|id| g.get(id).cloned()).collect())
    }

    async fn list_claimed_by(&self, operator_id: Uuid) -> Result<Vec<Server>, Error> {
        let g = self.servers.lock().unwrap();
        Ok(g.values()
            .filter(|s| s.claimed_by == Some(operator_id))
            .cloned()
            .collect())
    }

    async fn claim_if_unclaimed(&self, guild_id: &str, operator_id: Uuid) -> Result<bool, Error> {
        let mut g = self.servers.lock().unwrap();
        match g.get_mut(guild_id) {
            Some(s) if s.claimed_by.is_none() => {
                s.claimed_by = Some(operator_id);
                s.bot_configured = true;
                self.claim_writes.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[derive(Default)]
struct MockProductRepo {
    configs: Mutex<Vec<ProductConfig>>,
}

#[async_trait]
impl ProductConfigRepository for MockProductRepo {
    async fn get_by_id(&self, product_config_id: Uuid) -> Result<Option<ProductConfig>, Error> {
        Ok(self
            .configs
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.product_config_id == product_config_id)
            .cloned())
    }

    async fn list_for_server(&self, server_id: Uuid) -> Result<Vec<ProductConfig>, Error> {
        Ok(self
            .configs
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.server_id == server_id)
            .cloned()
            .collect())
    }

    async fn list_by_group_id(&self, external_group_id: &str) -> Result<Vec<ProductConfig>, Error> {
        Ok(self
            .configs
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.external_group_id == external_group_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
struct MockRedemptionRepo {
    records: Mutex<Vec<RedemptionRecord>>,
}

#[async_trait]
impl RedemptionRepository for MockRedemptionRepo {
    async fn list_for_products(
        &self,
        product_config_ids: &[Uuid],
    ) -> Result<Vec<RedemptionRecord>, Error> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| product_config_ids.contains(&r.product_config_id))
            .cloned()
            .collect())
    }
}

struct MockBotLookup {
    entries: Vec<BotServerEntry>,
    fail: bool,
}

#[async_trait]
impl BotLookupApi for MockBotLookup {
    async fn list_operator_servers(
        &self,
        _external_user_id: &str,
    ) -> Result<Vec<BotServerEntry>, Error> {
        if self.fail {
            return Err(Error::Parse("lookup timed out".to_string()));
        }
        Ok(self.entries.clone())
    }
}

fn server(guild_id: &str) -> Server {
    let now = Utc::now();
    Server {
        server_id: Uuid::new_v4(),
        guild_id: guild_id.to_string(),
        guild_name: format!("guild-{guild_id}"),
        guild_icon: None,
        member_count: 100,
        claimed_by: None,
        bot_configured: false,
        created_at: now,
        updated_at: now,
    }
}

fn guild(id: &str, owner: bool, permissions: &str) -> OauthGuild {
    OauthGuild {
        id: id.to_string(),
        name: format!("guild-{id}"),
        icon: None,
        owner,
        permissions: permissions.to_string(),
    }
}

fn bot_entry(guild_id: &str) -> BotServerEntry {
    BotServerEntry {
        id: Uuid::new_v4().to_string(),
        guild_id: guild_id.to_string(),
        guild_name: format!("guild-{guild_id}"),
        guild_icon: None,
        member_count: 100,
        is_configured: true,
        user_id: "ext-user-1".to_string(),
    }
}

struct Fixture {
    server_repo: Arc<MockServerRepo>,
    reconciler: Arc<GuildReconciler>,
    cache: Arc<EntitlementCache>,
}

fn fixture(servers: Vec<Server>, lookup: MockBotLookup) -> Fixture {
    init_tracing();
    let server_repo = Arc::new(MockServerRepo::with_servers(servers));
    let product_repo = Arc::new(MockProductRepo::default());
    let redemption_repo = Arc::new(MockRedemptionRepo::default());
    let aggregator = Arc::new(WhitelistAggregator::new(
        product_repo.clone(),
        redemption_repo,
    ));
    let cache = Arc::new(EntitlementCache::new(
        Arc::new(InMemoryCacheStore::new()),
        Duration::seconds(300),
    ));
    let reconciler = Arc::new(GuildReconciler::new(
        server_repo.clone(),
        product_repo,
        Arc::new(lookup),
        aggregator,
        cache.clone(),
    ));
    Fixture {
        server_repo,
        reconciler,
        cache,
    }
}

fn no_lookup() -> MockBotLookup {
    MockBotLookup {
        entries: Vec::new(),
        fail: false,
    }
}

#[tokio::test]
async fn delegated_path_filters_by_admin_eligibility() -> Result<(), Error> {
    let fx = fixture(vec![server("A"), server("B"), server("C")], no_lookup());
    let operator = Uuid::new_v4();

    let guilds = vec![
        guild("A", true, "0"),
        guild("B", false, "8"),
        guild("C", false, "0"),
    ];
    let result = fx.reconciler.reconcile_delegated(operator, &guilds).await?;

    let mut ids: Vec<&str> = result.iter().map(|s| s.guild_id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["A", "B"]);
    assert!(result.iter().all(|s| s.claimed_by == Some(operator)));
    Ok(())
}

#[tokio::test]
async fn unknown_guilds_are_silently_dropped() -> Result<(), Error> {
    // bot never installed in D, so no local record exists and none is created
    let fx = fixture(vec![server("A")], no_lookup());
    let operator = Uuid::new_v4();

    let guilds = vec![guild("A", true, "0"), guild("D", true, "0")];
    let result = fx.reconciler.reconcile_delegated(operator, &guilds).await?;

    assert_eq!(result.len(), 1);
    assert_eq!(result[0].guild_id, "A");
    Ok(())
}

#[tokio::test]
async fn reconciliation_is_idempotent() -> Result<(), Error> {
    let fx = fixture(vec![server("A"), server("B")], no_lookup());
    let operator = Uuid::new_v4();
    let guilds = vec![guild("A", true, "0"), guild("B", false, "8")];

    let first = fx.reconciler.reconcile_delegated(operator, &guilds).await?;
    assert_eq!(fx.server_repo.claim_writes.load(Ordering::SeqCst), 2);

    let second = fx.reconciler.reconcile_delegated(operator, &guilds).await?;
    assert_eq!(fx.server_repo.claim_writes.load(Ordering::SeqCst), 2);

    let first_ids: Vec<&str> = first.iter().map(|s| s.guild_id.as_str()).collect();
    let second_ids: Vec<&str> = second.iter().map(|s| s.guild_id.as_str()).collect();
    assert_eq!(first_ids, second_ids);
    Ok(())
}

#[tokio::test]
async fn racing_operators_claim_exactly_once() -> Result<(), Error> {
    let fx = fixture(vec![server("X")], no_lookup());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let reconciler = fx.reconciler.clone();
        let operator = Uuid::new_v4();
        handles.push(tokio::spawn(async move {
            let guilds = vec![guild("X", true, "0")];
            reconciler.reconcile_delegated(operator, &guilds).await
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked")?;
    }

    assert_eq!(fx.server_repo.claim_writes.load(Ordering::SeqCst), 1);
    let claimed = fx
        .server_repo
        .get_by_guild_id("X")
        .await?
        .expect("server exists");
    assert!(claimed.claimed_by.is_some());
    Ok(())
}

#[tokio::test]
async fn delegated_reconciliation_populates_cache() -> Result<(), Error> {
    let fx = fixture(vec![server("A")], no_lookup());
    let operator = Uuid::new_v4();

    fx.reconciler
        .reconcile_delegated(operator, &[guild("A", true, "0")])
        .await?;

    let hit = fx.cache.read(operator).await.expect("cache populated");
    assert!(!hit.stale);
    assert_eq!(hit.entry.servers.len(), 1);
    assert_eq!(hit.entry.servers[0].guild_id, "A");
    Ok(())
}

#[tokio::test]
async fn bot_path_with_empty_result_is_success() -> Result<(), Error> {
    let fx = fixture(vec![], no_lookup());
    let result = fx
        .reconciler
        .reconcile_bot_authoritative(Uuid::new_v4(), "ext-user-1")
        .await?;
    assert!(result.is_empty());
    Ok(())
}

#[tokio::test]
async fn bot_path_performs_no_claim_writes() -> Result<(), Error> {
    let fx = fixture(
        vec![server("A")],
        MockBotLookup {
            entries: vec![bot_entry("A")],
            fail: false,
        },
    );
    let operator = Uuid::new_v4();

    let result = fx
        .reconciler
        .reconcile_bot_authoritative(operator, "ext-user-1")
        .await?;

    assert_eq!(result.len(), 1);
    // presented as the operator's without a storage write
    assert_eq!(result[0].claimed_by, Some(operator));
    assert_eq!(fx.server_repo.claim_writes.load(Ordering::SeqCst), 0);
    let row = fx.server_repo.get_by_guild_id("A").await?.unwrap();
    assert!(row.claimed_by.is_none());
    Ok(())
}

#[tokio::test]
async fn bot_path_failure_falls_back_to_cached_snapshot() -> Result<(), Error> {
    let fx = fixture(
        vec![],
        MockBotLookup {
            entries: Vec::new(),
            fail: true,
        },
    );
    let operator = Uuid::new_v4();

    // last-known snapshot from an earlier reconciliation
    let snapshot = CacheEntry {
        servers: vec![guildpass_common::models::cache::ReconciledServer {
            server_id: Uuid::new_v4(),
            guild_id: "A".to_string(),
            guild_name: "guild-A".to_string(),
            guild_icon: None,
            member_count: 100,
            claimed_by: Some(operator),
            bot_configured: true,
            products: Vec::new(),
            whitelist_counts: HashMap::new(),
        }],
        timestamp: Utc::now(),
    };
    fx.cache.write(operator, &snapshot).await?;

    let result = fx
        .reconciler
        .reconcile_bot_authoritative(operator, "ext-user-1")
        .await?;
    assert_eq!(result.len(), 1);
    assert_eq!(result[0].guild_id, "A");
    Ok(())
}

#[tokio::test]
async fn bot_path_failure_without_cache_degrades_to_empty() -> Result<(), Error> {
    let fx = fixture(
        vec![],
        MockBotLookup {
            entries: Vec::new(),
            fail: true,
        },
    );
    let result = fx
        .reconciler
        .reconcile_bot_authoritative(Uuid::new_v4(), "ext-user-1")
        .await?;
    assert!(result.is_empty());
    Ok(())
}
