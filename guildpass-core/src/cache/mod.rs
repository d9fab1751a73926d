// File: src/cache/mod.rs

pub mod entitlement_cache;

pub use entitlement_cache::{CacheStore, CachedEntitlements, EntitlementCache, InMemoryCacheStore};
