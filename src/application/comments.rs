use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::listing::ListingService;
use crate::application::repos::{CommentsRepo, DealsRepo};
use crate::domain::entities::{CommentRecord, NewComment, UserId};
use crate::domain::error::DomainError;
use crate::domain::types::CounterField;

const MAX_COMMENT_LEN: usize = 2_000;

#[derive(Clone)]
pub struct CommentService {
    deals: Arc<dyn DealsRepo>,
    comments: Arc<dyn CommentsRepo>,
    listing: ListingService,
}

impl CommentService {
    pub fn new(
        deals: Arc<dyn DealsRepo>,
        comments: Arc<dyn CommentsRepo>,
        listing: ListingService,
    ) -> Self {
        Self {
            deals,
            comments,
            listing,
        }
    }

    pub async fn create(
        &self,
        deal_id: Uuid,
        user_id: UserId,
        parent_id: Option<Uuid>,
        content: &str,
    ) -> Result<CommentRecord, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DomainError::validation("content", "must not be empty").into());
        }
        if content.chars().count() > MAX_COMMENT_LEN {
            return Err(DomainError::validation(
                "content",
                format!("must be at most {MAX_COMMENT_LEN} characters"),
            )
            .into());
        }

        if self.deals.find_by_id(deal_id).await?.is_none() {
            return Err(AppError::not_found("deal"));
        }

        if let Some(parent_id) = parent_id {
            let parent = self
                .comments
                .find_by_id(parent_id)
                .await?
                .ok_or_else(|| AppError::not_found("parent comment"))?;
            if parent.deal_id != deal_id {
                return Err(DomainError::validation(
                    "parent_id",
                    "parent comment belongs to another deal",
                )
                .into());
            }
        }

        let comment = self
            .comments
            .insert(NewComment {
                deal_id,
                user_id,
                parent_id,
                content: content.to_string(),
            })
            .await?;
        self.deals
            .update_counter_delta(deal_id, CounterField::Comment, 1)
            .await?;
        self.listing.invalidate(deal_id).await;

        info!(comment_id = %comment.id, %deal_id, user_id, "Comment created");
        Ok(comment)
    }

    /// Soft-deletes a comment on `deal_id`. Only its author may do so.
    pub async fn delete(
        &self,
        deal_id: Uuid,
        comment_id: Uuid,
        user_id: UserId,
    ) -> Result<(), AppError> {
        let comment = self
            .comments
            .find_by_id(comment_id)
            .await?
            .filter(|comment| comment.deal_id == deal_id)
            .ok_or_else(|| AppError::not_found("comment"))?;

        if comment.user_id != user_id {
            return Err(DomainError::forbidden("deleting a comment").into());
        }

        if !self.comments.soft_delete(comment_id).await? {
            debug!(%comment_id, "Comment already deleted");
            return Ok(());
        }

        self.deals
            .update_counter_delta(comment.deal_id, CounterField::Comment, -1)
            .await?;
        self.listing.invalidate(comment.deal_id).await;

        info!(%comment_id, deal_id = %comment.deal_id, user_id, "Comment deleted");
        Ok(())
    }

    pub async fn list(&self, deal_id: Uuid) -> Result<Vec<CommentRecord>, AppError> {
        Ok(self.comments.list_for_deal(deal_id).await?)
    }
}
