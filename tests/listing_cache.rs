use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use time::OffsetDateTime;
use uuid::Uuid;

use scandeals::application::filter::DealPredicate;
use scandeals::application::listing::ListingService;
use scandeals::application::repos::{DealsRepo, PageWindow};
use scandeals::application::search::SearchRequest;
use scandeals::application::sort::DealOrdering;
use scandeals::cache::{
    CacheBackend, CacheConfig, CacheError, CacheKey, MemoryCache, decode, encode,
};
use scandeals::domain::entities::{DealRecord, DealSummary, NewDeal};
use scandeals::infra::memory::MemoryRepositories;

fn sample_deal(index: usize, price: i64, age_minutes: i64) -> DealRecord {
    let created_at = OffsetDateTime::now_utc() - time::Duration::minutes(age_minutes);
    DealRecord {
        id: Uuid::new_v4(),
        title: format!("Deal #{index}"),
        price,
        store_name: Some("Shop".to_string()),
        product_url: format!("https://shop.example.com/items/{index}"),
        image_url: None,
        source_site: if index % 2 == 0 { "ppomppu" } else { "ruliweb" }.to_string(),
        category: None,
        view_count: 0,
        like_count: 0,
        comment_count: 0,
        is_active: true,
        created_at,
        updated_at: created_at,
    }
}

fn seeded_repos(count: usize) -> MemoryRepositories {
    let repos = MemoryRepositories::new();
    for index in 0..count {
        repos
            .seed(sample_deal(index, 1_000 * (index as i64 + 1), index as i64))
            .expect("seed deal");
    }
    repos
}

async fn newest_deal_id(repos: &MemoryRepositories) -> Uuid {
    let page = repos
        .find(
            &DealPredicate::all(),
            &DealOrdering::latest(),
            PageWindow::new(0, 1),
        )
        .await
        .expect("find newest deal");
    page.items[0].id
}

fn config_without_background_refresh() -> CacheConfig {
    CacheConfig {
        refresh_on_miss: false,
        ..CacheConfig::default()
    }
}

fn listing_over(repos: &MemoryRepositories, cache: Arc<dyn CacheBackend>) -> ListingService {
    ListingService::new(
        Arc::new(repos.clone()),
        cache,
        config_without_background_refresh(),
    )
}

/// Every operation fails as if the cache server were unreachable.
struct UnreachableCache;

#[async_trait]
impl CacheBackend for UnreachableCache {
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

#[tokio::test]
async fn default_view_is_served_from_cache_with_live_total() {
    let repos = seeded_repos(3);
    let cache = Arc::new(MemoryCache::new());
    let listing = listing_over(&repos, cache.clone());

    assert!(listing.refresh_default_cache().await);
    assert!(cache.contains(&CacheKey::default_list(20).render()));

    let request = SearchRequest::default_view(20);
    let first = listing.get_listing(&request).await.expect("first read");

    let fresh = NewDeal::new("Fresh deal", 500, "https://shop.example.com/fresh", "ppomppu")
        .expect("valid deal");
    repos.insert(fresh).await.expect("insert");

    let second = listing.get_listing(&request).await.expect("second read");
    assert_eq!(first.content(), second.content());
    assert_eq!(first.total_elements(), 3);
    assert_eq!(second.total_elements(), 4);
}

#[tokio::test]
async fn filtered_requests_never_use_the_cached_listing() {
    let repos = seeded_repos(4);
    let cache = Arc::new(MemoryCache::new());
    let listing = listing_over(&repos, cache.clone());

    let planted = DealSummary::from(sample_deal(999, 1, 0));
    cache
        .set(
            &CacheKey::default_list(20).render(),
            encode(&vec![planted.clone()]).expect("encode"),
            Duration::from_secs(60),
        )
        .await
        .expect("plant entry");

    let cached = listing
        .get_listing(&SearchRequest::default_view(20))
        .await
        .expect("default view");
    assert_eq!(cached.content(), &[planted.clone()]);

    let filtered = [
        SearchRequest::default_view(20).with_keyword("Deal"),
        SearchRequest::default_view(20).with_sites(["ppomppu"]),
        SearchRequest::default_view(20).with_price_range(Some(0), None),
        SearchRequest::default_view(20).with_price_range(None, Some(1_000_000)),
        SearchRequest::default_view(20).with_category(1),
        SearchRequest::default_view(20).with_sort("popular"),
        SearchRequest::default_view(20).with_page(1, 20),
        SearchRequest::default_view(20).with_page(0, 10),
    ];
    for request in filtered {
        let page = listing.get_listing(&request).await.expect("filtered read");
        assert!(
            page.content().iter().all(|deal| deal.id != planted.id),
            "request {request:?} was answered from the cache"
        );
    }
}

#[tokio::test]
async fn price_bounds_are_inclusive() {
    let repos = seeded_repos(10);
    let listing = listing_over(&repos, Arc::new(MemoryCache::new()));

    let request = SearchRequest::default_view(20).with_price_range(Some(3_000), Some(6_000));
    let page = listing.get_listing(&request).await.expect("listing");

    assert_eq!(page.total_elements(), 4);
    assert!(
        page.content()
            .iter()
            .all(|deal| (3_000..=6_000).contains(&deal.price))
    );
}

#[tokio::test]
async fn unknown_sort_token_behaves_like_latest() {
    let repos = seeded_repos(5);
    let config = CacheConfig {
        enabled: false,
        ..CacheConfig::default()
    };
    let listing = ListingService::new(Arc::new(repos), Arc::new(MemoryCache::new()), config);

    let bogus = listing
        .get_listing(&SearchRequest::default_view(20).with_sort("bogus"))
        .await
        .expect("bogus sort");
    let latest = listing
        .get_listing(&SearchRequest::default_view(20).with_sort("latest"))
        .await
        .expect("latest sort");

    assert_eq!(bogus, latest);
    let titles: Vec<&str> = latest.content().iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, ["Deal #0", "Deal #1", "Deal #2", "Deal #3", "Deal #4"]);
}

#[tokio::test]
async fn empty_store_yields_empty_first_and_last_page() {
    let repos = MemoryRepositories::new();
    let listing = listing_over(&repos, Arc::new(MemoryCache::new()));

    let page = listing
        .get_listing(&SearchRequest::default_view(20))
        .await
        .expect("listing");

    assert!(page.content().is_empty());
    assert_eq!(page.total_elements(), 0);
    assert_eq!(page.total_pages(), 0);
    assert!(page.is_first());
    assert!(page.is_last());
    assert!(page.is_empty());
}

#[tokio::test]
async fn second_page_of_twenty_five_deals() {
    let repos = seeded_repos(25);
    let listing = listing_over(&repos, Arc::new(MemoryCache::new()));

    let page = listing
        .get_listing(&SearchRequest::default().with_page(1, 20))
        .await
        .expect("listing");

    assert_eq!(page.content().len(), 5);
    assert_eq!(page.total_pages(), 2);
    assert!(!page.is_first());
    assert!(page.is_last());
}

#[tokio::test]
async fn unreachable_cache_degrades_to_store() {
    let repos = seeded_repos(3);
    let listing = listing_over(&repos, Arc::new(UnreachableCache));

    let page = listing
        .get_listing(&SearchRequest::default_view(20))
        .await
        .expect("served from store");

    assert!(!page.is_empty());
    assert_eq!(page.total_elements(), 3);
    assert!(!listing.refresh_default_cache().await);
}

#[tokio::test]
async fn undecodable_entry_counts_as_miss() {
    let repos = seeded_repos(2);
    let cache = Arc::new(MemoryCache::new());
    let listing = listing_over(&repos, cache.clone());

    cache
        .set(
            &CacheKey::default_list(20).render(),
            Bytes::from_static(b"not json"),
            Duration::from_secs(60),
        )
        .await
        .expect("plant garbage");

    let page = listing
        .get_listing(&SearchRequest::default_view(20))
        .await
        .expect("listing");
    assert_eq!(page.content().len(), 2);
}

#[tokio::test]
async fn miss_schedules_background_refresh() {
    let repos = seeded_repos(2);
    let cache = Arc::new(MemoryCache::new());
    let listing = ListingService::new(
        Arc::new(repos),
        cache.clone(),
        CacheConfig::default(),
    );
    let key = CacheKey::default_list(20).render();

    listing
        .get_listing(&SearchRequest::default_view(20))
        .await
        .expect("listing");

    for _ in 0..50 {
        if cache.contains(&key) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let payload = cache.get(&key).await.expect("get").expect("refreshed entry");
    let items: Vec<DealSummary> = decode(&payload).expect("decode");
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn detail_reads_count_views_and_report_missing_deals() {
    let repos = seeded_repos(1);
    let cache = Arc::new(MemoryCache::new());
    let listing = listing_over(&repos, cache.clone());
    let deal_id = newest_deal_id(&repos).await;

    let first = listing.get_detail(deal_id).await.expect("detail");
    let second = listing.get_detail(deal_id).await.expect("detail");
    assert_eq!(first.view_count, 1);
    assert_eq!(second.view_count, 2);
    assert!(cache.contains(&CacheKey::deal_detail(deal_id).render()));

    let preview = listing.peek_detail(deal_id).await.expect("preview");
    assert_eq!(preview.view_count, 2);

    let missing = listing
        .get_detail(Uuid::new_v4())
        .await
        .expect_err("missing deal");
    assert!(missing.is_not_found());
}

#[tokio::test]
async fn invalidate_drops_only_the_detail_entry() {
    let repos = seeded_repos(1);
    let cache = Arc::new(MemoryCache::new());
    let listing = listing_over(&repos, cache.clone());
    let deal_id = newest_deal_id(&repos).await;

    listing.refresh_default_cache().await;
    listing.peek_detail(deal_id).await.expect("preview");

    listing.invalidate(deal_id).await;
    assert!(!cache.contains(&CacheKey::deal_detail(deal_id).render()));
    assert!(cache.contains(&CacheKey::default_list(20).render()));

    assert_eq!(listing.invalidate_all_lists().await, 1);
    assert!(!cache.contains(&CacheKey::default_list(20).render()));
}

#[tokio::test]
async fn saving_known_product_link_returns_stored_deal() {
    let repos = MemoryRepositories::new();
    let listing = listing_over(&repos, Arc::new(MemoryCache::new()));

    let original = NewDeal::new("Monitor", 199_000, "https://shop.example.com/m", "ppomppu")
        .expect("valid deal");
    let repost = NewDeal::new("Monitor v2", 99_000, "https://shop.example.com/m", "ruliweb")
        .expect("valid deal");

    let first = listing.save_deal(original).await.expect("save");
    let second = listing.save_deal(repost).await.expect("save again");

    assert!(first.is_created());
    assert!(!second.is_created());
    assert_eq!(first.record(), second.record());
    assert_eq!(repos.len(), 1);
}

#[tokio::test]
async fn deactivation_drops_listing_entries() {
    let repos = seeded_repos(2);
    let cache = Arc::new(MemoryCache::new());
    let listing = listing_over(&repos, cache.clone());
    listing.refresh_default_cache().await;

    let any_id = decode::<Vec<DealSummary>>(
        &cache
            .get(&CacheKey::default_list(20).render())
            .await
            .expect("get")
            .expect("entry"),
    )
    .expect("decode")[0]
        .id;

    let summary = listing.deactivate(any_id).await.expect("deactivate");
    assert_eq!(summary.id, any_id);
    assert!(!cache.contains(&CacheKey::default_list(20).render()));
}
