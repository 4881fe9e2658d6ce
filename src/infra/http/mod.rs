//! HTTP surface: deal listings, likes and comments for the web client, and
//! the crawler intake.

pub mod error;
pub mod handlers;
pub mod identity;
pub mod middleware;
mod state;

pub use state::HttpState;

use std::future::Future;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerSettings;
use crate::infra::error::InfraError;

use self::middleware::{log_responses, set_request_context};

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/api/sales", get(handlers::list_deals))
        .route("/api/sales/popular", get(handlers::popular_deals))
        .route("/api/sales/most-commented", get(handlers::most_commented_deals))
        .route("/api/sales/sites", get(handlers::known_sites))
        .route("/api/sales/{id}", get(handlers::deal_detail))
        .route("/api/sales/{id}/preview", get(handlers::deal_preview))
        .route(
            "/api/sales/{id}/likes",
            get(handlers::like_status).post(handlers::toggle_like),
        )
        .route(
            "/api/sales/{id}/comments",
            get(handlers::list_comments).post(handlers::create_comment),
        )
        .route(
            "/api/sales/{id}/comments/{comment_id}",
            delete(handlers::delete_comment),
        )
        .route("/api/crawl/data", post(handlers::receive_crawl_data))
        .route("/api/crawl/health", get(handlers::crawl_health))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

/// Serves until `shutdown` resolves, then drains in-flight requests.
pub async fn serve(
    settings: &ServerSettings,
    router: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), InfraError> {
    let listener = TcpListener::bind(settings.addr).await?;
    info!(
        target = "scandeals::http",
        addr = %settings.addr,
        "HTTP server listening"
    );

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}
