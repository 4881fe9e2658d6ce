//! Repository traits describing persistence adapters.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::application::filter::DealPredicate;
use crate::application::sort::DealOrdering;
use crate::domain::entities::{CommentRecord, DealRecord, NewComment, NewDeal, UserId};
use crate::domain::types::CounterField;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Zero-based offset window over an ordered result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub size: u32,
}

impl PageWindow {
    pub fn new(page: u32, size: u32) -> Self {
        Self { page, size }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page) * u64::from(self.size)
    }
}

/// One page of store rows plus the total number of rows matching the predicate.
#[derive(Debug, Clone)]
pub struct StorePage<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[async_trait]
pub trait DealsRepo: Send + Sync {
    async fn find(
        &self,
        predicate: &DealPredicate,
        ordering: &DealOrdering,
        window: PageWindow,
    ) -> Result<StorePage<DealRecord>, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<DealRecord>, RepoError>;

    async fn find_by_product_url(&self, product_url: &str)
    -> Result<Option<DealRecord>, RepoError>;

    /// Fails with [`RepoError::Duplicate`] when the product link is taken.
    async fn insert(&self, deal: NewDeal) -> Result<DealRecord, RepoError>;

    /// Applies a signed delta to one counter in a single statement, clamping
    /// at zero, and returns the updated record.
    async fn update_counter_delta(
        &self,
        id: Uuid,
        field: CounterField,
        delta: i64,
    ) -> Result<DealRecord, RepoError>;

    async fn count(&self) -> Result<u64, RepoError>;

    async fn set_active(&self, id: Uuid, active: bool) -> Result<DealRecord, RepoError>;
}

#[async_trait]
pub trait LikesRepo: Send + Sync {
    async fn exists(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, RepoError>;

    /// Inserts the pair and bumps the like counter in one transaction.
    /// Returns `false` without touching the counter when the pair existed.
    async fn add_like(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, RepoError>;

    /// Removes the pair and decrements the like counter in one transaction.
    /// Returns `false` without touching the counter when no pair existed.
    async fn remove_like(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    async fn insert(&self, comment: NewComment) -> Result<CommentRecord, RepoError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CommentRecord>, RepoError>;

    /// Returns `false` when the comment was already deleted.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, RepoError>;

    async fn list_for_deal(&self, deal_id: Uuid) -> Result<Vec<CommentRecord>, RepoError>;
}

/// The three repositories one storage adapter provides, shared behind `Arc`s.
#[derive(Clone)]
pub struct Repositories {
    pub deals: Arc<dyn DealsRepo>,
    pub likes: Arc<dyn LikesRepo>,
    pub comments: Arc<dyn CommentsRepo>,
}

impl Repositories {
    pub fn shared<R>(adapter: R) -> Self
    where
        R: DealsRepo + LikesRepo + CommentsRepo + 'static,
    {
        let adapter = Arc::new(adapter);
        Self {
            deals: adapter.clone(),
            likes: adapter.clone(),
            comments: adapter,
        }
    }
}
