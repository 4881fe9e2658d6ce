use std::sync::Arc;

use subtle::ConstantTimeEq;

use crate::application::comments::CommentService;
use crate::application::ingest::IngestService;
use crate::application::likes::LikeService;
use crate::application::listing::ListingService;
use crate::application::repos::Repositories;

#[derive(Clone)]
pub struct HttpState {
    pub listing: ListingService,
    pub ingest: IngestService,
    pub likes: LikeService,
    pub comments: CommentService,
    crawl_api_key: Option<Arc<str>>,
}

impl HttpState {
    /// Wires every service over one repository bundle and the listing cache.
    pub fn new(
        repos: &Repositories,
        listing: ListingService,
        crawl_api_key: Option<String>,
    ) -> Self {
        Self {
            ingest: IngestService::new(listing.clone()),
            likes: LikeService::new(repos.deals.clone(), repos.likes.clone(), listing.clone()),
            comments: CommentService::new(
                repos.deals.clone(),
                repos.comments.clone(),
                listing.clone(),
            ),
            listing,
            crawl_api_key: crawl_api_key.map(Arc::from),
        }
    }

    /// Constant-time comparison against the configured crawler key.
    /// Without a configured key every presented key is rejected.
    pub fn crawl_key_matches(&self, presented: &str) -> bool {
        match self.crawl_api_key.as_deref() {
            Some(expected) => bool::from(expected.as_bytes().ct_eq(presented.as_bytes())),
            None => false,
        }
    }
}
