//! Deal listing service: cache-or-store routing for the default listing,
//! filtered queries, detail reads and cache maintenance hooks.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use time::{Duration, OffsetDateTime};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::filter::{Clause, DealPredicate};
use crate::application::pagination::PageEnvelope;
use crate::application::repos::{DealsRepo, PageWindow, RepoError};
use crate::application::search::SearchRequest;
use crate::application::sort::DealOrdering;
use crate::cache::{self, CacheBackend, CacheConfig, CacheKey, CacheTrigger};
use crate::domain::entities::{DealRecord, DealSummary, NewDeal};
use crate::domain::types::CounterField;

const METRIC_LIST_HIT_TOTAL: &str = "scandeals_cache_list_hit_total";
const METRIC_LIST_MISS_TOTAL: &str = "scandeals_cache_list_miss_total";
const METRIC_UNAVAILABLE_TOTAL: &str = "scandeals_cache_unavailable_total";
const METRIC_REFRESH_TOTAL: &str = "scandeals_cache_refresh_total";
const METRIC_REFRESH_FAILED_TOTAL: &str = "scandeals_cache_refresh_failed_total";
const METRIC_STORE_QUERY_MS: &str = "scandeals_listing_store_query_ms";

/// Look-back window for the popular and most-commented rankings.
pub const TRENDING_WINDOW: Duration = Duration::hours(24);

enum CacheLookup {
    Hit(Vec<DealSummary>),
    Miss,
    Unavailable,
}

/// Result of [`ListingService::save_deal`].
#[derive(Debug, Clone)]
pub enum SaveOutcome {
    Created(DealRecord),
    /// The product link was already stored; the stored record is returned unchanged.
    Existing(DealRecord),
}

impl SaveOutcome {
    pub fn record(&self) -> &DealRecord {
        match self {
            SaveOutcome::Created(record) | SaveOutcome::Existing(record) => record,
        }
    }

    pub fn into_record(self) -> DealRecord {
        match self {
            SaveOutcome::Created(record) | SaveOutcome::Existing(record) => record,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, SaveOutcome::Created(_))
    }
}

#[derive(Clone)]
pub struct ListingService {
    deals: Arc<dyn DealsRepo>,
    cache: Arc<dyn CacheBackend>,
    trigger: CacheTrigger,
    config: CacheConfig,
    refresh_lock: Arc<Mutex<()>>,
}

impl ListingService {
    pub fn new(deals: Arc<dyn DealsRepo>, cache: Arc<dyn CacheBackend>, config: CacheConfig) -> Self {
        let trigger = CacheTrigger::new(config.clone(), cache.clone());
        Self {
            deals,
            cache,
            trigger,
            config,
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn trigger(&self) -> &CacheTrigger {
        &self.trigger
    }

    pub async fn get_listing(
        &self,
        request: &SearchRequest,
    ) -> Result<PageEnvelope<DealSummary>, AppError> {
        let default_size = self.config.page_size();
        let size = request.effective_size(default_size);

        if !self.config.enabled {
            return self.query(request, size).await;
        }

        let violations = request.default_view_violations(default_size);
        if !violations.is_empty() {
            debug!(?violations, "Listing request bypasses default cache");
            return self.query(request, size).await;
        }

        match self.read_default_cache(default_size).await {
            CacheLookup::Hit(items) => {
                counter!(METRIC_LIST_HIT_TOTAL).increment(1);
                let total = self.deals.count().await?;
                Ok(PageEnvelope::of(items, 0, size, total, default_size))
            }
            CacheLookup::Miss => {
                counter!(METRIC_LIST_MISS_TOTAL).increment(1);
                let page = self.query(request, size).await?;
                if self.config.refresh_on_miss {
                    self.schedule_refresh();
                }
                Ok(page)
            }
            CacheLookup::Unavailable => self.query(request, size).await,
        }
    }

    /// Rewrites the default listing entry from the store.
    ///
    /// Returns whether the entry was written. Concurrent callers queue on the
    /// refresh lock; failures are logged and swallowed.
    pub async fn refresh_default_cache(&self) -> bool {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_locked().await
    }

    /// Drops the detail entry of one deal. Listing entries are left alone.
    pub async fn invalidate(&self, deal_id: Uuid) {
        self.trigger.deal_counters_changed(deal_id).await;
    }

    pub async fn invalidate_all_lists(&self) -> u64 {
        self.trigger.drop_lists().await
    }

    /// Counts one view and returns the updated summary.
    pub async fn get_detail(&self, deal_id: Uuid) -> Result<DealSummary, AppError> {
        let record = self
            .deals
            .update_counter_delta(deal_id, CounterField::View, 1)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => AppError::not_found("deal"),
                other => AppError::from(other),
            })?;

        let summary = DealSummary::from(record);
        self.write_detail(&summary).await;
        Ok(summary)
    }

    /// Reads a deal without counting a view.
    pub async fn peek_detail(&self, deal_id: Uuid) -> Result<DealSummary, AppError> {
        let key = CacheKey::deal_detail(deal_id).render();

        if self.config.enabled {
            match self.cache.get(&key).await {
                Ok(Some(payload)) => match cache::decode::<DealSummary>(&payload) {
                    Ok(summary) => return Ok(summary),
                    Err(err) => debug!(%key, error = %err, "Discarding undecodable detail entry"),
                },
                Ok(None) => {}
                Err(err) => {
                    counter!(METRIC_UNAVAILABLE_TOTAL).increment(1);
                    warn!(%key, error = %err, "Detail cache read failed, using store");
                }
            }
        }

        let record = self
            .deals
            .find_by_id(deal_id)
            .await?
            .ok_or_else(|| AppError::not_found("deal"))?;
        let summary = DealSummary::from(record);
        self.write_detail(&summary).await;
        Ok(summary)
    }

    /// Stores a deal unless its product link is already known.
    pub async fn save_deal(&self, deal: NewDeal) -> Result<SaveOutcome, AppError> {
        if let Some(existing) = self.deals.find_by_product_url(&deal.product_url).await? {
            debug!(
                deal_id = %existing.id,
                product_url = %deal.product_url,
                "Deal already stored, skipping"
            );
            return Ok(SaveOutcome::Existing(existing));
        }

        let product_url = deal.product_url.clone();
        match self.deals.insert(deal).await {
            Ok(record) => {
                info!(deal_id = %record.id, source_site = %record.source_site, "Stored new deal");
                Ok(SaveOutcome::Created(record))
            }
            Err(RepoError::Duplicate { constraint }) => {
                debug!(%product_url, %constraint, "Lost insert race, returning stored deal");
                self.deals
                    .find_by_product_url(&product_url)
                    .await?
                    .map(SaveOutcome::Existing)
                    .ok_or_else(|| AppError::from(RepoError::Duplicate { constraint }))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Deals from the trending window ranked by likes.
    pub async fn popular(&self, page: u32, size: u32) -> Result<PageEnvelope<DealSummary>, AppError> {
        self.trending(DealOrdering::most_liked(), page, size).await
    }

    /// Deals from the trending window ranked by comments.
    pub async fn most_commented(
        &self,
        page: u32,
        size: u32,
    ) -> Result<PageEnvelope<DealSummary>, AppError> {
        self.trending(DealOrdering::most_commented(), page, size).await
    }

    pub async fn deactivate(&self, deal_id: Uuid) -> Result<DealSummary, AppError> {
        self.set_active(deal_id, false).await
    }

    pub async fn activate(&self, deal_id: Uuid) -> Result<DealSummary, AppError> {
        self.set_active(deal_id, true).await
    }

    async fn set_active(&self, deal_id: Uuid, active: bool) -> Result<DealSummary, AppError> {
        let record = self
            .deals
            .set_active(deal_id, active)
            .await
            .map_err(|err| match err {
                RepoError::NotFound => AppError::not_found("deal"),
                other => AppError::from(other),
            })?;
        self.trigger.deal_content_changed(deal_id).await;
        Ok(DealSummary::from(record))
    }

    async fn trending(
        &self,
        ordering: DealOrdering,
        page: u32,
        size: u32,
    ) -> Result<PageEnvelope<DealSummary>, AppError> {
        let since = OffsetDateTime::now_utc() - TRENDING_WINDOW;
        let predicate = DealPredicate::all().and(Clause::CreatedSince(since));
        let size = if size == 0 { self.config.page_size() } else { size };
        self.query_page(&predicate, &ordering, page, size).await
    }

    async fn query(
        &self,
        request: &SearchRequest,
        size: u32,
    ) -> Result<PageEnvelope<DealSummary>, AppError> {
        let predicate = DealPredicate::compile(request);
        let ordering = DealOrdering::resolve(request.sort_mode(), request.direction);
        self.query_page(&predicate, &ordering, request.page, size)
            .await
    }

    async fn query_page(
        &self,
        predicate: &DealPredicate,
        ordering: &DealOrdering,
        page: u32,
        size: u32,
    ) -> Result<PageEnvelope<DealSummary>, AppError> {
        let started_at = Instant::now();
        let result = self
            .deals
            .find(predicate, ordering, PageWindow::new(page, size))
            .await;
        histogram!(METRIC_STORE_QUERY_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        let store_page = result?;
        let items = store_page.items.into_iter().map(DealSummary::from).collect();
        Ok(PageEnvelope::of(
            items,
            page,
            size,
            store_page.total,
            self.config.page_size(),
        ))
    }

    async fn read_default_cache(&self, page_size: u32) -> CacheLookup {
        let key = CacheKey::default_list(page_size).render();
        match self.cache.get(&key).await {
            Ok(Some(payload)) => match cache::decode::<Vec<DealSummary>>(&payload) {
                Ok(items) => CacheLookup::Hit(items),
                Err(err) => {
                    warn!(%key, error = %err, "Discarding undecodable listing entry");
                    CacheLookup::Miss
                }
            },
            Ok(None) => CacheLookup::Miss,
            Err(err) => {
                counter!(METRIC_UNAVAILABLE_TOTAL).increment(1);
                error!(
                    target = "application::listing",
                    %key,
                    error = %err,
                    "Listing cache unavailable, serving from store"
                );
                CacheLookup::Unavailable
            }
        }
    }

    fn schedule_refresh(&self) {
        let Ok(guard) = self.refresh_lock.clone().try_lock_owned() else {
            debug!("Listing refresh already in flight");
            return;
        };

        let service = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            service.refresh_locked().await;
        });
    }

    async fn refresh_locked(&self) -> bool {
        if !self.config.enabled {
            debug!("Listing refresh skipped: cache disabled");
            return false;
        }

        let page_size = self.config.page_size();
        let key = CacheKey::default_list(page_size).render();

        let written = async {
            let page = self
                .deals
                .find(
                    &DealPredicate::all(),
                    &DealOrdering::latest(),
                    PageWindow::new(0, page_size),
                )
                .await
                .map_err(|err| err.to_string())?;
            let items: Vec<DealSummary> = page.items.into_iter().map(DealSummary::from).collect();
            let payload = cache::encode(&items).map_err(|err| err.to_string())?;
            self.cache
                .set(&key, payload, self.config.list_ttl())
                .await
                .map_err(|err| err.to_string())?;
            Ok::<usize, String>(items.len())
        }
        .await;

        match written {
            Ok(count) => {
                counter!(METRIC_REFRESH_TOTAL).increment(1);
                debug!(%key, count, "Refreshed default listing cache");
                true
            }
            Err(reason) => {
                counter!(METRIC_REFRESH_FAILED_TOTAL).increment(1);
                warn!(%key, %reason, "Default listing refresh failed");
                false
            }
        }
    }

    async fn write_detail(&self, summary: &DealSummary) {
        if !self.config.enabled {
            return;
        }

        let key = CacheKey::deal_detail(summary.id).render();
        let payload = match cache::encode(summary) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%key, error = %err, "Failed to encode detail entry");
                return;
            }
        };
        if let Err(err) = self.cache.set(&key, payload, self.config.detail_ttl()).await {
            warn!(%key, error = %err, "Failed to write detail entry");
        }
    }
}
