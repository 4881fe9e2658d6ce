use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Registers units and help text for every metric the service emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "scandeals_cache_list_hit_total",
            Unit::Count,
            "Default listing requests answered from the cache."
        );
        describe_counter!(
            "scandeals_cache_list_miss_total",
            Unit::Count,
            "Default listing requests that found no cached entry."
        );
        describe_counter!(
            "scandeals_cache_unavailable_total",
            Unit::Count,
            "Cache reads that failed and fell back to the store."
        );
        describe_counter!(
            "scandeals_cache_refresh_total",
            Unit::Count,
            "Successful rewrites of the default listing entry."
        );
        describe_counter!(
            "scandeals_cache_refresh_failed_total",
            Unit::Count,
            "Default listing rewrites that failed."
        );
        describe_counter!(
            "scandeals_cache_invalidate_total",
            Unit::Count,
            "Cache invalidations, labelled by scope."
        );
        describe_histogram!(
            "scandeals_listing_store_query_ms",
            Unit::Milliseconds,
            "Latency of listing queries against the store in milliseconds."
        );
    });
}
