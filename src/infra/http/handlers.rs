use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::application::ingest::CrawlBatch;
use crate::application::search::SearchRequest;
use crate::config::MAX_PAGE_SIZE;
use crate::domain::types::{KnownSite, SortDirection};

use super::error::ApiError;
use super::identity::CurrentUser;
use super::state::HttpState;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Query string of `GET /api/sales`. CamelCase aliases keep older clients working.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
    pub keyword: Option<String>,
    /// Comma-separated source-site tags.
    #[serde(alias = "sourcesSiteList")]
    pub sites: Option<String>,
    #[serde(alias = "categoryId")]
    pub category_id: Option<i64>,
    #[serde(alias = "minPrice")]
    pub min_price: Option<i64>,
    #[serde(alias = "maxPrice")]
    pub max_price: Option<i64>,
    #[serde(alias = "sortBy")]
    pub sort_by: Option<String>,
    pub direction: Option<String>,
}

impl ListingQuery {
    pub fn into_request(self) -> Result<SearchRequest, ApiError> {
        let size = validate_size(self.size)?;
        let direction = match self.direction.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(SortDirection::parse(raw).ok_or_else(|| {
                ApiError::bad_request(
                    "invalid sort direction",
                    Some(format!("`{raw}` is not one of asc, desc")),
                )
            })?),
        };
        let sites: Vec<String> = self
            .sites
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|site| !site.is_empty())
            .map(str::to_string)
            .collect();

        Ok(SearchRequest {
            page: self.page.unwrap_or(0),
            size,
            keyword: self.keyword,
            sites,
            category_id: self.category_id,
            min_price: self.min_price,
            max_price: self.max_price,
            sort_by: self.sort_by,
            direction,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// Body of `POST /api/sales/{id}/comments`.
#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    pub content: String,
    #[serde(default, alias = "parentId")]
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct SiteView {
    pub tag: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub status: &'static str,
}

/// `None` means "use the default size"; an explicit size must be in `1..=MAX_PAGE_SIZE`.
fn validate_size(size: Option<u32>) -> Result<u32, ApiError> {
    match size {
        None => Ok(0),
        Some(size) if (1..=MAX_PAGE_SIZE).contains(&size) => Ok(size),
        Some(size) => Err(ApiError::bad_request(
            "invalid page size",
            Some(format!("size must be between 1 and {MAX_PAGE_SIZE}, got {size}")),
        )),
    }
}

fn parse_deal_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::bad_request("invalid deal id", Some(raw.to_string())))
}

fn parse_comment_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| ApiError::bad_request("invalid comment id", Some(raw.to_string())))
}

pub async fn list_deals(
    State(state): State<HttpState>,
    Query(query): Query<ListingQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let request = query.into_request()?;
    let page = state.listing.get_listing(&request).await?;
    Ok(Json(page))
}

pub async fn popular_deals(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let size = validate_size(query.size)?;
    let page = state
        .listing
        .popular(query.page.unwrap_or(0), size)
        .await?;
    Ok(Json(page))
}

pub async fn most_commented_deals(
    State(state): State<HttpState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let size = validate_size(query.size)?;
    let page = state
        .listing
        .most_commented(query.page.unwrap_or(0), size)
        .await?;
    Ok(Json(page))
}

pub async fn deal_detail(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_deal_id(&id)?;
    let deal = state.listing.get_detail(id).await?;
    Ok(Json(deal))
}

pub async fn deal_preview(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_deal_id(&id)?;
    let deal = state.listing.peek_detail(id).await?;
    Ok(Json(deal))
}

pub async fn like_status(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<bool>, ApiError> {
    let id = parse_deal_id(&id)?;
    Ok(Json(state.likes.is_liked(id, user_id).await?))
}

/// Responds with the like state after the toggle.
pub async fn toggle_like(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<bool>, ApiError> {
    let id = parse_deal_id(&id)?;
    Ok(Json(state.likes.toggle(id, user_id).await?))
}

pub async fn list_comments(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_deal_id(&id)?;
    Ok(Json(state.comments.list(id).await?))
}

pub async fn create_comment(
    State(state): State<HttpState>,
    Path(id): Path<String>,
    CurrentUser(user_id): CurrentUser,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_deal_id(&id)?;
    let payload: CommentPayload = serde_json::from_slice(&body).map_err(|err| {
        ApiError::bad_request("invalid comment payload", Some(err.to_string()))
    })?;
    let comment = state
        .comments
        .create(id, user_id, payload.parent_id, &payload.content)
        .await?;
    Ok(Json(comment))
}

pub async fn delete_comment(
    State(state): State<HttpState>,
    Path((id, comment_id)): Path<(String, String)>,
    CurrentUser(user_id): CurrentUser,
) -> Result<StatusCode, ApiError> {
    let id = parse_deal_id(&id)?;
    let comment_id = parse_comment_id(&comment_id)?;
    state.comments.delete(id, comment_id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn known_sites() -> Json<Vec<SiteView>> {
    Json(
        KnownSite::ALL
            .into_iter()
            .map(|site| SiteView {
                tag: site.tag(),
                name: site.display_name(),
            })
            .collect(),
    )
}

/// The key is checked before the body is parsed, so unauthenticated callers
/// always get 401 regardless of payload.
pub async fn receive_crawl_data(
    State(state): State<HttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let presented = headers
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();
    if !state.crawl_key_matches(presented) {
        warn!(target = "scandeals::http::crawl", "Crawl batch rejected: bad API key");
        return Err(ApiError::unauthorized());
    }

    let batch: CrawlBatch = serde_json::from_slice(&body).map_err(|err| {
        ApiError::bad_request("invalid crawl payload", Some(err.to_string()))
    })?;
    let report = state.ingest.ingest(batch).await;
    Ok(Json(report))
}

pub async fn crawl_health() -> Json<HealthView> {
    Json(HealthView { status: "ok" })
}
