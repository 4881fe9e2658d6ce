//! In-process repositories used when no database URL is configured.
//!
//! Semantics follow the Postgres adapter: unique product links, clamped
//! counter deltas and like pairs that move the counter only when they change.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::filter::DealPredicate;
use crate::application::repos::{
    CommentsRepo, DealsRepo, LikesRepo, PageWindow, RepoError, StorePage,
};
use crate::application::sort::DealOrdering;
use crate::domain::entities::{
    CategoryRef, CommentRecord, DealRecord, NewComment, NewDeal, UserId,
};
use crate::domain::types::CounterField;

const PRODUCT_URL_CONSTRAINT: &str = "sales_product_url_key";

#[derive(Default)]
struct Tables {
    deals: DashMap<Uuid, DealRecord>,
    by_product_url: DashMap<String, Uuid>,
    likes: DashSet<(Uuid, UserId)>,
    comments: DashMap<Uuid, CommentRecord>,
}

#[derive(Clone, Default)]
pub struct MemoryRepositories {
    tables: Arc<Tables>,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fully-formed record, replacing any deal with the same id.
    pub fn seed(&self, record: DealRecord) -> Result<(), RepoError> {
        match self.tables.by_product_url.entry(record.product_url.clone()) {
            Entry::Occupied(existing) if *existing.get() != record.id => {
                Err(RepoError::Duplicate {
                    constraint: PRODUCT_URL_CONSTRAINT.to_string(),
                })
            }
            entry => {
                entry.insert(record.id);
                self.tables.deals.insert(record.id, record);
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tables.deals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.deals.is_empty()
    }

    fn adjust(record: &mut DealRecord, field: CounterField, delta: i64) {
        let slot = match field {
            CounterField::View => &mut record.view_count,
            CounterField::Like => &mut record.like_count,
            CounterField::Comment => &mut record.comment_count,
        };
        *slot = slot.saturating_add(delta).max(0);
        record.updated_at = OffsetDateTime::now_utc();
    }
}

#[async_trait]
impl DealsRepo for MemoryRepositories {
    async fn find(
        &self,
        predicate: &DealPredicate,
        ordering: &DealOrdering,
        window: PageWindow,
    ) -> Result<StorePage<DealRecord>, RepoError> {
        let mut matched: Vec<DealRecord> = self
            .tables
            .deals
            .iter()
            .filter(|entry| predicate.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        matched.sort_by(|left, right| ordering.compare(left, right));

        let total = matched.len() as u64;
        let offset = usize::try_from(window.offset()).unwrap_or(usize::MAX);
        let items = matched
            .into_iter()
            .skip(offset)
            .take(window.size.max(1) as usize)
            .collect();

        Ok(StorePage { items, total })
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DealRecord>, RepoError> {
        Ok(self.tables.deals.get(&id).map(|entry| entry.value().clone()))
    }

    async fn find_by_product_url(
        &self,
        product_url: &str,
    ) -> Result<Option<DealRecord>, RepoError> {
        let Some(id) = self.tables.by_product_url.get(product_url).map(|entry| *entry) else {
            return Ok(None);
        };
        DealsRepo::find_by_id(self, id).await
    }

    async fn insert(&self, deal: NewDeal) -> Result<DealRecord, RepoError> {
        match self.tables.by_product_url.entry(deal.product_url.clone()) {
            Entry::Occupied(_) => Err(RepoError::Duplicate {
                constraint: PRODUCT_URL_CONSTRAINT.to_string(),
            }),
            Entry::Vacant(slot) => {
                let now = OffsetDateTime::now_utc();
                let record = DealRecord {
                    id: Uuid::new_v4(),
                    title: deal.title,
                    price: deal.price,
                    store_name: deal.store_name,
                    product_url: deal.product_url,
                    image_url: deal.image_url,
                    source_site: deal.source_site,
                    category: deal.category_id.map(|id| CategoryRef {
                        id,
                        name: String::new(),
                    }),
                    view_count: 0,
                    like_count: 0,
                    comment_count: 0,
                    is_active: true,
                    created_at: now,
                    updated_at: now,
                };
                self.tables.deals.insert(record.id, record.clone());
                slot.insert(record.id);
                Ok(record)
            }
        }
    }

    async fn update_counter_delta(
        &self,
        id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> Result<DealRecord, RepoError> {
        let mut entry = self.tables.deals.get_mut(&id).ok_or(RepoError::NotFound)?;
        Self::adjust(entry.value_mut(), field, delta);
        Ok(entry.value().clone())
    }

    async fn count(&self) -> Result<u64, RepoError> {
        Ok(self.tables.deals.len() as u64)
    }

    async fn set_active(&self, id: Uuid, active: bool) -> Result<DealRecord, RepoError> {
        let mut entry = self.tables.deals.get_mut(&id).ok_or(RepoError::NotFound)?;
        let record = entry.value_mut();
        record.is_active = active;
        record.updated_at = OffsetDateTime::now_utc();
        Ok(record.clone())
    }
}

#[async_trait]
impl LikesRepo for MemoryRepositories {
    async fn exists(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, RepoError> {
        Ok(self.tables.likes.contains(&(deal_id, user_id)))
    }

    // The deal entry stays locked while the pair changes, which serializes
    // like changes per deal the way the Postgres transaction does.
    async fn add_like(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, RepoError> {
        let mut deal = self.tables.deals.get_mut(&deal_id).ok_or_else(|| {
            RepoError::InvalidInput {
                message: format!("deal `{deal_id}` does not exist"),
            }
        })?;
        let inserted = self.tables.likes.insert((deal_id, user_id));
        if inserted {
            Self::adjust(deal.value_mut(), CounterField::Like, 1);
        }
        Ok(inserted)
    }

    async fn remove_like(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, RepoError> {
        let mut deal = self.tables.deals.get_mut(&deal_id).ok_or_else(|| {
            RepoError::InvalidInput {
                message: format!("deal `{deal_id}` does not exist"),
            }
        })?;
        let removed = self.tables.likes.remove(&(deal_id, user_id)).is_some();
        if removed {
            Self::adjust(deal.value_mut(), CounterField::Like, -1);
        }
        Ok(removed)
    }
}

#[async_trait]
impl CommentsRepo for MemoryRepositories {
    async fn insert(&self, comment: NewComment) -> Result<CommentRecord, RepoError> {
        if !self.tables.deals.contains_key(&comment.deal_id) {
            return Err(RepoError::InvalidInput {
                message: format!("deal `{}` does not exist", comment.deal_id),
            });
        }

        let now = OffsetDateTime::now_utc();
        let record = CommentRecord {
            id: Uuid::new_v4(),
            deal_id: comment.deal_id,
            user_id: comment.user_id,
            parent_id: comment.parent_id,
            content: comment.content,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        };
        self.tables.comments.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError> {
        Ok(self.tables.comments.get(&id).map(|entry| entry.value().clone()))
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError> {
        let Some(mut entry) = self.tables.comments.get_mut(&id) else {
            return Ok(false);
        };
        let comment = entry.value_mut();
        if comment.is_deleted {
            return Ok(false);
        }
        comment.is_deleted = true;
        comment.updated_at = OffsetDateTime::now_utc();
        Ok(true)
    }

    async fn list_for_deal(&self, deal_id: Uuid) -> Result<Vec<CommentRecord>, RepoError> {
        let mut comments: Vec<CommentRecord> = self
            .tables
            .comments
            .iter()
            .filter(|entry| entry.deal_id == deal_id && !entry.is_deleted)
            .map(|entry| entry.value().clone())
            .collect();
        comments.sort_by(|left, right| {
            left.created_at
                .cmp(&right.created_at)
                .then_with(|| left.id.cmp(&right.id))
        });
        Ok(comments)
    }
}
