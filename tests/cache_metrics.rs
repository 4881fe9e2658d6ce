use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use metrics_util::debugging::DebuggingRecorder;
use time::OffsetDateTime;
use uuid::Uuid;

use scandeals::application::listing::ListingService;
use scandeals::application::search::SearchRequest;
use scandeals::cache::{CacheBackend, CacheConfig, CacheError, MemoryCache};
use scandeals::domain::entities::DealRecord;
use scandeals::infra::memory::MemoryRepositories;
use scandeals::infra::telemetry;

struct RefusingCache;

#[async_trait]
impl CacheBackend for RefusingCache {
    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}

fn seeded_repos() -> MemoryRepositories {
    let repos = MemoryRepositories::new();
    for index in 0..3 {
        let now = OffsetDateTime::now_utc();
        repos
            .seed(DealRecord {
                id: Uuid::new_v4(),
                title: format!("Metrics deal {index}"),
                price: 10_000,
                store_name: None,
                product_url: format!("https://shop.example.com/metrics/{index}"),
                image_url: None,
                source_site: "fmkorea".to_string(),
                category: None,
                view_count: 0,
                like_count: 0,
                comment_count: 0,
                is_active: true,
                created_at: now,
                updated_at: now,
            })
            .expect("seed deal");
    }
    repos
}

#[tokio::test]
async fn listing_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");
    telemetry::describe_metrics();

    let config = CacheConfig {
        refresh_on_miss: false,
        ..CacheConfig::default()
    };
    let request = SearchRequest::default_view(20);

    // miss, refresh, hit, invalidate
    let healthy = ListingService::new(
        Arc::new(seeded_repos()),
        Arc::new(MemoryCache::new()),
        config.clone(),
    );
    healthy.get_listing(&request).await.expect("miss path");
    assert!(healthy.refresh_default_cache().await);
    healthy.get_listing(&request).await.expect("hit path");
    healthy.invalidate_all_lists().await;

    // unavailable, failed refresh
    let degraded = ListingService::new(Arc::new(seeded_repos()), Arc::new(RefusingCache), config);
    degraded.get_listing(&request).await.expect("fallback path");
    assert!(!degraded.refresh_default_cache().await);

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "scandeals_cache_list_hit_total",
        "scandeals_cache_list_miss_total",
        "scandeals_cache_unavailable_total",
        "scandeals_cache_refresh_total",
        "scandeals_cache_refresh_failed_total",
        "scandeals_cache_invalidate_total",
        "scandeals_listing_store_query_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
