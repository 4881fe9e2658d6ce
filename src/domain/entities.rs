//! Domain entities mirrored from persistent storage.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use crate::domain::error::DomainError;

pub type UserId = i64;

const MAX_TITLE_LEN: usize = 500;
const MAX_URL_LEN: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: i64,
    pub name: String,
}

/// One discovered sale item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealRecord {
    pub id: Uuid,
    pub title: String,
    pub price: i64,
    pub store_name: Option<String>,
    pub product_url: String,
    pub image_url: Option<String>,
    pub source_site: String,
    pub category: Option<CategoryRef>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    pub is_active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl DealRecord {
    pub fn counter(&self, field: crate::domain::types::CounterField) -> i64 {
        use crate::domain::types::CounterField;
        match field {
            CounterField::View => self.view_count,
            CounterField::Like => self.like_count,
            CounterField::Comment => self.comment_count,
        }
    }
}

/// Validated input for creating a deal. Counters always start at zero.
#[derive(Debug, Clone, PartialEq)]
pub struct NewDeal {
    pub title: String,
    pub price: i64,
    pub store_name: Option<String>,
    pub product_url: String,
    pub image_url: Option<String>,
    pub source_site: String,
    pub category_id: Option<i64>,
}

impl NewDeal {
    pub fn new(
        title: impl Into<String>,
        price: i64,
        product_url: impl Into<String>,
        source_site: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let title = title.into().trim().to_string();
        if title.is_empty() {
            return Err(DomainError::validation("title", "must not be empty"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::validation(
                "title",
                format!("must be at most {MAX_TITLE_LEN} characters"),
            ));
        }

        if price < 0 {
            return Err(DomainError::validation("price", "must not be negative"));
        }

        let product_url = normalize_url(product_url.into(), "product_url")?;

        let source_site = source_site.into().trim().to_ascii_lowercase();
        if source_site.is_empty() {
            return Err(DomainError::validation("source_site", "must not be empty"));
        }

        Ok(Self {
            title,
            price,
            store_name: None,
            product_url,
            image_url: None,
            source_site,
            category_id: None,
        })
    }

    pub fn with_store_name(mut self, store_name: Option<String>) -> Self {
        self.store_name = store_name
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        self
    }

    /// Image links are optional; an unparsable one is dropped rather than
    /// rejecting the whole deal.
    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url.and_then(|value| normalize_url(value, "image_url").ok());
        self
    }

    pub fn with_category(mut self, category_id: Option<i64>) -> Self {
        self.category_id = category_id;
        self
    }
}

fn normalize_url(raw: String, field: &'static str) -> Result<String, DomainError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if trimmed.len() > MAX_URL_LEN {
        return Err(DomainError::validation(
            field,
            format!("must be at most {MAX_URL_LEN} bytes"),
        ));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|err| DomainError::validation(field, format!("`{trimmed}`: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(trimmed.to_string()),
        other => Err(DomainError::validation(
            field,
            format!("unsupported scheme `{other}`"),
        )),
    }
}

/// Projection handed to callers and stored in the listing cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DealSummary {
    pub id: Uuid,
    pub title: String,
    pub price: i64,
    pub store_name: Option<String>,
    pub product_url: String,
    pub image_url: Option<String>,
    pub source_site: String,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub view_count: i64,
    pub like_count: i64,
    pub comment_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<DealRecord> for DealSummary {
    fn from(record: DealRecord) -> Self {
        let (category_id, category_name) = match record.category {
            Some(category) => (Some(category.id), Some(category.name)),
            None => (None, None),
        };

        Self {
            id: record.id,
            title: record.title,
            price: record.price,
            store_name: record.store_name,
            product_url: record.product_url,
            image_url: record.image_url,
            source_site: record.source_site,
            category_id,
            category_name,
            view_count: record.view_count,
            like_count: record.like_count,
            comment_count: record.comment_count,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: Uuid,
    pub deal_id: Uuid,
    pub user_id: UserId,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub is_deleted: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub deal_id: Uuid,
    pub user_id: UserId,
    pub parent_id: Option<Uuid>,
    pub content: String,
}
