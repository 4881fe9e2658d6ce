use std::{process, sync::Arc};

use scandeals::{
    application::{error::AppError, listing::ListingService, repos::Repositories},
    cache::{CacheBackend, CacheBackendKind, CacheConfig, MemoryCache, RedisCache},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        memory::MemoryRepositories,
        telemetry,
    },
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::RefreshCache(_) => run_refresh_cache(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repos = init_repositories(&settings).await?;
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = init_cache_backend(&cache_config)?;

    let listing = ListingService::new(repos.deals.clone(), cache, cache_config.clone());

    if cache_config.enabled {
        let warmed = listing.refresh_default_cache().await;
        info!(target = "scandeals::startup", warmed, "Startup cache warm-up finished");
    }
    let refresh_handle = spawn_refresh_timer(listing.clone(), &cache_config);

    let state = HttpState::new(&repos, listing, settings.ingest.api_key.clone());
    if settings.ingest.api_key.is_none() {
        warn!(
            target = "scandeals::startup",
            "No ingest API key configured; crawler batches will be rejected"
        );
    }
    let router = http::build_router(state);

    let result = serve_until_shutdown(&settings.server, router).await;

    if let Some(handle) = refresh_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_refresh_cache(settings: config::Settings) -> Result<(), AppError> {
    let repos = init_repositories(&settings).await?;
    let cache_config = CacheConfig::from(&settings.cache);
    if !cache_config.enabled {
        return Err(AppError::validation(
            "refresh-cache requires cache.enabled = true",
        ));
    }
    if cache_config.backend == CacheBackendKind::Memory {
        warn!(
            target = "scandeals::refresh_cache",
            "Refreshing an in-process cache; the entry is discarded when this command exits"
        );
    }

    let cache = init_cache_backend(&cache_config)?;
    let listing = ListingService::new(repos.deals, cache, cache_config);

    if listing.refresh_default_cache().await {
        info!(target = "scandeals::refresh_cache", "Default listing cache rebuilt");
        Ok(())
    } else {
        Err(AppError::unexpected("default listing refresh failed"))
    }
}

async fn init_repositories(settings: &config::Settings) -> Result<Repositories, AppError> {
    let Some(database_url) = settings.database.url.as_deref() else {
        warn!(
            target = "scandeals::startup",
            "database.url is not configured; using the in-memory store"
        );
        return Ok(Repositories::shared(MemoryRepositories::new()));
    };

    let pool =
        PostgresRepositories::connect(database_url, settings.database.max_connections.get())
            .await
            .map_err(|err| AppError::from(InfraError::from(err)))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    Ok(Repositories::shared(PostgresRepositories::new(pool)))
}

fn init_cache_backend(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>, AppError> {
    match config.backend {
        CacheBackendKind::Memory => Ok(Arc::new(MemoryCache::with_capacity(
            config.memory_capacity_non_zero(),
        ))),
        CacheBackendKind::Redis => {
            let url = config.redis_url.as_deref().ok_or_else(|| {
                AppError::from(InfraError::configuration(
                    "cache.redis_url is required for the redis backend",
                ))
            })?;
            let cache = RedisCache::connect(url, config.redis_pool_size)
                .map_err(|err| AppError::from(InfraError::from(err)))?;
            Ok(Arc::new(cache))
        }
    }
}

fn spawn_refresh_timer(listing: ListingService, config: &CacheConfig) -> Option<JoinHandle<()>> {
    if !config.enabled {
        return None;
    }
    let cadence = config.refresh_cadence()?;

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(cadence);
        interval.tick().await; // The warm-up already covered the first tick.
        loop {
            interval.tick().await;
            listing.refresh_default_cache().await;
        }
    }))
}

async fn serve_until_shutdown(
    settings: &config::ServerSettings,
    router: axum::Router,
) -> Result<(), AppError> {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server_settings = settings.clone();
    let mut server = tokio::spawn(async move {
        http::serve(&server_settings, router, async move {
            let _ = shutdown_rx.changed().await;
        })
        .await
    });

    tokio::select! {
        joined = &mut server => return flatten_server(joined),
        _ = shutdown_signal() => {}
    }

    info!(
        target = "scandeals::shutdown",
        grace_seconds = settings.graceful_shutdown.as_secs(),
        "Shutdown requested, draining connections"
    );
    let _ = shutdown_tx.send(true);

    match tokio::time::timeout(settings.graceful_shutdown, &mut server).await {
        Ok(joined) => flatten_server(joined),
        Err(_) => {
            warn!(
                target = "scandeals::shutdown",
                "Graceful shutdown timed out; aborting open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn flatten_server(
    joined: Result<Result<(), InfraError>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(result) => result.map_err(AppError::from),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(
            target = "scandeals::shutdown",
            error = %err,
            "Failed to listen for ctrl-c; shutting down"
        );
    }
}
