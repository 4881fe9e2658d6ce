//! Cache trigger service.
//!
//! Write paths call these hooks after their store write commits. Every hook is
//! best effort: failures are logged and never reach the caller.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};
use uuid::Uuid;

use super::backend::CacheBackend;
use super::config::CacheConfig;
use super::keys::{CacheKey, LIST_KEY_PATTERN};

const METRIC_CACHE_INVALIDATE_TOTAL: &str = "scandeals_cache_invalidate_total";

#[derive(Clone)]
pub struct CacheTrigger {
    config: CacheConfig,
    backend: Arc<dyn CacheBackend>,
}

impl CacheTrigger {
    pub fn new(config: CacheConfig, backend: Arc<dyn CacheBackend>) -> Self {
        Self { config, backend }
    }

    /// A like, comment or view counter moved. Only the detail entry goes;
    /// the cached listing is allowed to show stale counters until its TTL.
    pub async fn deal_counters_changed(&self, deal_id: Uuid) {
        self.drop_key(CacheKey::deal_detail(deal_id), "counters").await;
    }

    /// Price, title, category or visibility changed, so listings are stale too.
    pub async fn deal_content_changed(&self, deal_id: Uuid) {
        self.drop_key(CacheKey::deal_detail(deal_id), "content").await;
        self.drop_lists().await;
    }

    /// Drops every cached listing page; returns how many entries went.
    pub async fn drop_lists(&self) -> u64 {
        if !self.config.enabled {
            debug!(scope = "lists", "Cache trigger skipped: cache disabled");
            return 0;
        }

        match self.backend.delete_by_pattern(LIST_KEY_PATTERN).await {
            Ok(removed) => {
                counter!(METRIC_CACHE_INVALIDATE_TOTAL, "scope" => "lists").increment(1);
                debug!(pattern = LIST_KEY_PATTERN, removed, "Invalidated listing cache");
                removed
            }
            Err(err) => {
                warn!(
                    pattern = LIST_KEY_PATTERN,
                    error = %err,
                    "Failed to invalidate listing cache"
                );
                0
            }
        }
    }

    async fn drop_key(&self, key: CacheKey, scope: &'static str) {
        if !self.config.enabled {
            debug!(scope, "Cache trigger skipped: cache disabled");
            return;
        }

        let rendered = key.render();
        match self.backend.delete(&rendered).await {
            Ok(()) => {
                counter!(METRIC_CACHE_INVALIDATE_TOTAL, "scope" => "detail").increment(1);
                debug!(key = %rendered, scope, "Invalidated cache entry");
            }
            Err(err) => {
                warn!(key = %rendered, scope, error = %err, "Failed to invalidate cache entry");
            }
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }
}
