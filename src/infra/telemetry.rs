use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "specchio_entry_cache_hit_total",
            Unit::Count,
            "Total number of entry read-cache hits."
        );
        describe_counter!(
            "specchio_entry_cache_miss_total",
            Unit::Count,
            "Total number of entry read-cache misses."
        );
        describe_counter!(
            "specchio_schedule_dedup_total",
            Unit::Count,
            "Total number of render jobs skipped because an identical job was pending."
        );
        describe_gauge!(
            "specchio_render_queue_len",
            Unit::Count,
            "Current number of pending render jobs."
        );
        describe_counter!(
            "specchio_render_dispatch_total",
            Unit::Count,
            "Total number of render invocations accepted by the transport."
        );
        describe_counter!(
            "specchio_render_dispatch_dropped_total",
            Unit::Count,
            "Total number of render jobs dropped because no public URL resolved."
        );
        describe_counter!(
            "specchio_callback_accepted_total",
            Unit::Count,
            "Total number of render callbacks committed to the entry store."
        );
        describe_counter!(
            "specchio_callback_rejected_total",
            Unit::Count,
            "Total number of render callbacks rejected before commit."
        );
        describe_counter!(
            "specchio_secret_flushed_total",
            Unit::Count,
            "Total number of expired render secrets garbage-collected."
        );
    });
}
