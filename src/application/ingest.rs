//! Crawler batch ingestion.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::application::error::AppError;
use crate::application::listing::{ListingService, SaveOutcome};
use crate::domain::entities::NewDeal;
use crate::domain::price::parse_price;

/// Batch posted by one crawler run. Field names follow the crawler's JSON.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlBatch {
    #[serde(default)]
    pub site: Option<String>,
    #[serde(default)]
    pub items: Vec<CrawlItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrawlItem {
    pub title: Option<String>,
    pub price: Option<String>,
    pub shipping_fee: Option<String>,
    pub store_name: Option<String>,
    pub category: Option<String>,
    pub product_url: Option<String>,
    pub image_url: Option<String>,
    pub source_site: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub saved: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

impl IngestReport {
    pub fn total(&self) -> usize {
        self.saved + self.duplicates + self.skipped
    }
}

#[derive(Clone)]
pub struct IngestService {
    listing: ListingService,
}

impl IngestService {
    pub fn new(listing: ListingService) -> Self {
        Self { listing }
    }

    /// Stores every usable item, then refreshes the default listing once.
    ///
    /// A bad item is logged and counted as skipped; it never aborts the batch.
    pub async fn ingest(&self, batch: CrawlBatch) -> IngestReport {
        let mut report = IngestReport::default();
        let site = batch.site.as_deref().unwrap_or("unknown").to_string();

        for item in batch.items {
            let title = item.title.clone().unwrap_or_default();
            match self.ingest_item(item, &site).await {
                Ok(SaveOutcome::Created(_)) => report.saved += 1,
                Ok(SaveOutcome::Existing(_)) => report.duplicates += 1,
                Err(err) => {
                    warn!(%site, %title, error = %err, "Skipping crawled item");
                    report.skipped += 1;
                }
            }
        }

        self.listing.refresh_default_cache().await;

        info!(
            %site,
            saved = report.saved,
            duplicates = report.duplicates,
            skipped = report.skipped,
            "Crawl batch ingested"
        );
        report
    }

    async fn ingest_item(&self, item: CrawlItem, batch_site: &str) -> Result<SaveOutcome, AppError> {
        let price = item.price.as_deref().and_then(parse_price).unwrap_or(0);
        let source_site = item
            .source_site
            .filter(|site| !site.trim().is_empty())
            .unwrap_or_else(|| batch_site.to_string());

        let deal = NewDeal::new(
            item.title.unwrap_or_default(),
            price,
            item.product_url.unwrap_or_default(),
            source_site,
        )?
        .with_store_name(item.store_name)
        .with_image_url(item.image_url);

        self.listing.save_deal(deal).await
    }
}
