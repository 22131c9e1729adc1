//! Response cache for stance-runtime.
//!
//! Stores parsed verdicts so identical requests against the same model
//! skip inference.

use moka::future::Cache;
use stance_core::StanceVerdict;
use std::time::Duration;

use crate::config::CacheConfig;

/// Cache key: model, target and the full text.
///
/// The text is kept verbatim so two inputs never share an entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    model: String,
    target: String,
    text: String,
}

impl CacheKey {
    pub fn new(model: &str, target: &str, text: &str) -> Self {
        Self {
            model: model.to_string(),
            target: target.to_string(),
            text: text.to_string(),
        }
    }
}

/// Verdict cache using moka.
pub struct VerdictCache {
    cache: Cache<CacheKey, StanceVerdict>,
}

impl VerdictCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries, config.ttl)
    }

    pub async fn get(&self, key: &CacheKey) -> Option<StanceVerdict> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: CacheKey, verdict: StanceVerdict) {
        self.cache.insert(key, verdict).await;
    }

    /// Drop every entry, e.g. after a model switch.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for VerdictCache {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

impl std::fmt::Debug for VerdictCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerdictCache")
            .field("entries", &self.entry_count())
            .finish()
    }
}
