use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::listing::ListingService;
use crate::application::repos::{DealsRepo, LikesRepo};
use crate::domain::entities::UserId;

#[derive(Clone)]
pub struct LikeService {
    deals: Arc<dyn DealsRepo>,
    likes: Arc<dyn LikesRepo>,
    listing: ListingService,
}

impl LikeService {
    pub fn new(deals: Arc<dyn DealsRepo>, likes: Arc<dyn LikesRepo>, listing: ListingService) -> Self {
        Self {
            deals,
            likes,
            listing,
        }
    }

    /// Flips the user's like on a deal and returns whether it is now liked.
    ///
    /// The existence check only picks the direction. The store's unique
    /// `(deal, user)` pair decides whether the counter actually moves, so two
    /// racing toggles cannot double count.
    pub async fn toggle(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, AppError> {
        if self.deals.find_by_id(deal_id).await?.is_none() {
            return Err(AppError::not_found("deal"));
        }

        let liked = if self.likes.exists(deal_id, user_id).await? {
            let removed = self.likes.remove_like(deal_id, user_id).await?;
            debug!(%deal_id, user_id, removed, "Like removed");
            false
        } else {
            let added = self.likes.add_like(deal_id, user_id).await?;
            debug!(%deal_id, user_id, added, "Like added");
            true
        };

        self.listing.invalidate(deal_id).await;
        Ok(liked)
    }

    pub async fn is_liked(&self, deal_id: Uuid, user_id: UserId) -> Result<bool, AppError> {
        Ok(self.likes.exists(deal_id, user_id).await?)
    }
}
