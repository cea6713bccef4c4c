//! In-memory cache registry (thread-safe, async).
//!
//! Uses DashMap for lock-free concurrent access with per-key sharding.
//! Entries hold JSON values so one registry can serve every data type.

use super::QueryClient;
use crate::error::{Error, Result};
use crate::key::QueryKey;
use crate::resolved::QueryConfig;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Cached result of one query key.
struct QueryEntry {
    data: serde_json::Value,
    updated_at: Instant,
    invalidated: bool,
}

impl QueryEntry {
    fn new(data: serde_json::Value) -> Self {
        QueryEntry {
            data,
            updated_at: Instant::now(),
            invalidated: false,
        }
    }

    fn is_stale(&self, stale_time: Option<Duration>) -> bool {
        self.invalidated || stale_time.is_some_and(|d| self.updated_at.elapsed() >= d)
    }
}

/// Thread-safe in-memory cache registry.
///
/// Invalidating a key marks that entry and every entry it prefixes as stale.
/// Stale entries keep their data until the next fetch replaces it.
///
/// # Example
///
/// ```no_run
/// use query_kit::registry::{InMemoryQueryClient, QueryClient};
/// use query_kit::query_key;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let registry = InMemoryQueryClient::new();
///     registry.set_query_data(&query_key!["users", "list"], &vec!["ada"])?;
///
///     registry.invalidate(&query_key!["users"]).await?;
///     assert_eq!(registry.is_stale(&query_key!["users", "list"]), Some(true));
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct InMemoryQueryClient {
    store: Arc<DashMap<QueryKey, QueryEntry>>,
}

impl InMemoryQueryClient {
    pub fn new() -> Self {
        InMemoryQueryClient {
            store: Arc::new(DashMap::new()),
        }
    }

    /// Store `data` under `key` as a fresh entry.
    pub fn set_query_data<T: Serialize>(&self, key: &QueryKey, data: &T) -> Result<()> {
        let value =
            serde_json::to_value(data).map_err(|e| Error::SerializationError(e.to_string()))?;
        self.store.insert(key.clone(), QueryEntry::new(value));
        debug!("✓ Registry SET {}", key);
        Ok(())
    }

    /// Cached data under `key`, stale or not.
    pub fn get_query_data<T: DeserializeOwned>(&self, key: &QueryKey) -> Result<Option<T>> {
        let Some(entry) = self.store.get(key) else {
            return Ok(None);
        };
        let data = serde_json::from_value(entry.data.clone())?;
        Ok(Some(data))
    }

    /// `None` when nothing is cached under `key`.
    pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
        self.store.get(key).map(|entry| entry.invalidated)
    }

    pub fn remove(&self, key: &QueryKey) -> bool {
        let removed = self.store.remove(key).is_some();
        debug!("✓ Registry REMOVE {}", key);
        removed
    }

    pub fn clear(&self) {
        self.store.clear();
        warn!("⚠ Registry CLEAR executed - all cached queries dropped!");
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn keys(&self) -> Vec<QueryKey> {
        self.store.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let stale_entries = self.store.iter().filter(|entry| entry.invalidated).count();
        RegistryStats {
            total_entries: self.store.len(),
            stale_entries,
        }
    }

    pub fn log_stats(&self) {
        let stats = self.stats();
        debug!(
            "Registry Stats: {} entries ({} stale)",
            stats.total_entries, stats.stale_entries
        );
    }

    /// Return cached data for `config` while it is fresh, otherwise fetch.
    ///
    /// Freshness follows `config.options.stale_time` (`None` = fresh until
    /// invalidated). On a cold key with initial data, the initial data is
    /// cached and returned without fetching. A failed fetch leaves the
    /// existing entry untouched.
    pub async fn fetch_query<T>(&self, config: &QueryConfig<T>) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Clone,
    {
        let key = &config.query_key;

        let cached = self.store.get(key).and_then(|entry| {
            (!entry.is_stale(config.options.stale_time)).then(|| entry.data.clone())
        });
        if let Some(value) = cached {
            debug!("✓ Registry FETCH {} -> HIT", key);
            return Ok(serde_json::from_value(value)?);
        }

        if !self.store.contains_key(key) {
            if let Some(initial) = config.initial_data() {
                debug!("✓ Registry FETCH {} -> SEEDED", key);
                self.set_query_data(key, &initial)?;
                return Ok(initial);
            }
        }

        debug!("✓ Registry FETCH {} -> MISS", key);
        let data = config.fetch().await?;
        self.set_query_data(key, &data)?;
        Ok(data)
    }
}

impl Default for InMemoryQueryClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryClient for InMemoryQueryClient {
    async fn invalidate(&self, key: &QueryKey) -> Result<()> {
        let mut marked = 0usize;
        for mut entry in self.store.iter_mut() {
            if entry.key().starts_with(key) {
                entry.invalidated = true;
                marked += 1;
            }
        }
        debug!("✓ Registry INVALIDATE {} ({} entries)", key, marked);
        Ok(())
    }
}

/// Registry statistics.
#[derive(Clone, Debug, PartialEq)]
pub struct RegistryStats {
    pub total_entries: usize,
    pub stale_entries: usize,
}
