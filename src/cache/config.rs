//! Cache configuration.
//!
//! Controls the listing cache backend and its lifetimes via `scandeals.toml`.

use std::num::NonZeroUsize;
use std::time::Duration;

use serde::Deserialize;

use crate::application::search::DEFAULT_PAGE_SIZE;

// Default values for cache configuration
const DEFAULT_LIST_TTL_SECONDS: u64 = 600;
const DEFAULT_DETAIL_TTL_SECONDS: u64 = 600;
const DEFAULT_REFRESH_CADENCE_SECONDS: u64 = 300;
const DEFAULT_REDIS_POOL_SIZE: usize = 16;
const DEFAULT_MEMORY_CAPACITY: usize = 10_000;

/// Which key-value store backs the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackendKind {
    Memory,
    Redis,
}

/// Cache configuration from `scandeals.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Consult and maintain the cache at all.
    pub enabled: bool,
    pub backend: CacheBackendKind,
    /// Required when `backend = "redis"`.
    pub redis_url: Option<String>,
    pub redis_pool_size: usize,
    /// Entry bound of the in-process backend.
    pub memory_capacity: usize,
    /// Lifetime of the default listing entry.
    pub list_ttl_seconds: u64,
    /// Lifetime of per-deal detail entries.
    pub detail_ttl_seconds: u64,
    /// Page size of the cached default listing.
    pub default_page_size: u32,
    /// Schedule a background refresh when the default listing misses.
    pub refresh_on_miss: bool,
    /// Periodic refresh cadence; `0` disables the timer.
    pub refresh_cadence_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backend: CacheBackendKind::Memory,
            redis_url: None,
            redis_pool_size: DEFAULT_REDIS_POOL_SIZE,
            memory_capacity: DEFAULT_MEMORY_CAPACITY,
            list_ttl_seconds: DEFAULT_LIST_TTL_SECONDS,
            detail_ttl_seconds: DEFAULT_DETAIL_TTL_SECONDS,
            default_page_size: DEFAULT_PAGE_SIZE,
            refresh_on_miss: true,
            refresh_cadence_seconds: DEFAULT_REFRESH_CADENCE_SECONDS,
        }
    }
}

impl From<&crate::config::CacheSettings> for CacheConfig {
    fn from(settings: &crate::config::CacheSettings) -> Self {
        Self {
            enabled: settings.enabled,
            backend: settings.backend,
            redis_url: settings.redis_url.clone(),
            redis_pool_size: settings.redis_pool_size.get() as usize,
            memory_capacity: settings.memory_capacity.get() as usize,
            list_ttl_seconds: settings.list_ttl_seconds,
            detail_ttl_seconds: settings.detail_ttl_seconds,
            default_page_size: settings.default_page_size.get(),
            refresh_on_miss: settings.refresh_on_miss,
            refresh_cadence_seconds: settings.refresh_cadence_seconds,
        }
    }
}

impl CacheConfig {
    pub fn list_ttl(&self) -> Duration {
        Duration::from_secs(self.list_ttl_seconds)
    }

    pub fn detail_ttl(&self) -> Duration {
        Duration::from_secs(self.detail_ttl_seconds)
    }

    /// Memory backend capacity, clamping to 1 if zero.
    pub fn memory_capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.memory_capacity).unwrap_or(NonZeroUsize::MIN)
    }

    /// Default page size, clamped to at least one.
    pub fn page_size(&self) -> u32 {
        self.default_page_size.max(1)
    }

    /// `None` when periodic refresh is switched off.
    pub fn refresh_cadence(&self) -> Option<Duration> {
        (self.enabled && self.refresh_cadence_seconds > 0)
            .then(|| Duration::from_secs(self.refresh_cadence_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = CacheConfig::default();
        assert!(config.enabled);
        assert_eq!(config.backend, CacheBackendKind::Memory);
        assert_eq!(config.list_ttl(), Duration::from_secs(600));
        assert_eq!(config.default_page_size, 20);
        assert!(config.refresh_on_miss);
    }

    #[test]
    fn zero_page_size_clamps_to_one() {
        let config = CacheConfig {
            default_page_size: 0,
            ..Default::default()
        };
        assert_eq!(config.page_size(), 1);
    }

    #[test]
    fn cadence_disabled_with_cache_or_zero() {
        let disabled = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        assert_eq!(disabled.refresh_cadence(), None);

        let zero = CacheConfig {
            refresh_cadence_seconds: 0,
            ..Default::default()
        };
        assert_eq!(zero.refresh_cadence(), None);
        assert_eq!(
            CacheConfig::default().refresh_cadence(),
            Some(Duration::from_secs(300))
        );
    }
}
