// File: src/cache/entitlement_cache.rs
//
// Stale-while-revalidate store for reconciled server snapshots. An expired
// entry is still handed back (flagged stale) so the caller can render
// immediately while a background reconciliation replaces it.

use std::sync::Arc;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::warn;
use uuid::Uuid;

use guildpass_common::error::Error;
use guildpass_common::models::cache::CacheEntry;

/// Default time-to-live for a cache entry.
pub const DEFAULT_TTL_SECONDS: i64 = 300;

/// Raw key/value backend. Backend failures are never fatal: the cache layer
/// downgrades them to a miss.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, Error>;
    async fn put(&self, key: &str, value: String) -> Result<(), Error>;
    async fn remove(&self, key: &str) -> Result<(), Error>;
}

/// Process-local store backed by a DashMap.
#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: DashMap<String, String>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for InMemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, Error> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), Error> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), Error> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A cache read: the entry plus whether it has outlived the TTL.
#[derive(Debug, Clone)]
pub struct CachedEntitlements {
    pub entry: CacheEntry,
    pub stale: bool,
}

pub struct EntitlementCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    write_lock: tokio::sync::Mutex<()>,
}

impl EntitlementCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn with_default_ttl(store: Arc<dyn CacheStore>) -> Self {
        Self::new(store, Duration::seconds(DEFAULT_TTL_SECONDS))
    }

    fn cache_key(operator_id: Uuid) -> String {
        format!("entitlement_cache_{}", operator_id)
    }

    /// Read the snapshot for an operator. An entry past its TTL is returned
    /// with `stale: true` rather than discarded. Any store or decode failure
    /// reads as a miss.
    pub async fn read(&self, operator_id: Uuid) -> Option<CachedEntitlements> {
        self.read_at(operator_id, Utc::now()).await
    }

    /// `read` with an explicit "now", so the staleness boundary can be
    /// exercised without depending on the wall clock.
    pub async fn read_at(
        &self,
        operator_id: Uuid,
        now: chrono::DateTime<Utc>,
    ) -> Option<CachedEntitlements> {
        let key = Self::cache_key(operator_id);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("cache read failed for {key}: {e} (treating as miss)");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("cache entry for {key} failed to decode: {e} (treating as miss)");
                return None;
            }
        };

        let stale = now - entry.timestamp >= self.ttl;
        Some(CachedEntitlements { entry, stale })
    }

    /// Write a snapshot. Last-write-wins by entry timestamp: an entry older
    /// than the one already stored is dropped, so a superseded background
    /// refresh cannot clobber a newer explicit one.
    pub async fn write(&self, operator_id: Uuid, entry: &CacheEntry) -> Result<(), Error> {
        let key = Self::cache_key(operator_id);

        // The compare and the put must be atomic against other writers, or
        // an older entry can land after a newer writer's check.
        let _guard = self.write_lock.lock().await;

        if let Ok(Some(raw)) = self.store.get(&key).await {
            if let Ok(existing) = serde_json::from_str::<CacheEntry>(&raw) {
                if existing.timestamp > entry.timestamp {
                    return Ok(());
                }
            }
        }

        let raw = serde_json::to_string(entry)?;
        self.store.put(&key, raw).await
    }

    pub async fn invalidate(&self, operator_id: Uuid) -> Result<(), Error> {
        self.store.remove(&Self::cache_key(operator_id)).await
    }
}
