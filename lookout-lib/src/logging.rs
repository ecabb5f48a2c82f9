use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::trace::SdkTracer;
use tracing::Subscriber;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::{validate_logging, LoggingConfig};
use crate::error::{LookoutError, Result};

/// `RUST_LOG` when set, otherwise the configured level with the
/// OpenTelemetry internals held at `warn`
pub fn env_filter(cfg: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},opentelemetry=warn,opentelemetry_sdk=warn,opentelemetry_otlp=warn",
            cfg.level.to_ascii_lowercase()
        ))
    })
}

/// Events emitted by the exporters themselves would loop back into the
/// logger provider
fn is_exporter_internal(target: &str) -> bool {
    target.starts_with("opentelemetry")
}

/// Subscriber stack without installing it: filter, fmt layer, plus the span
/// layer and the log bridge when their providers are given.
pub fn subscriber(
    cfg: &LoggingConfig,
    tracer: Option<SdkTracer>,
    logger_provider: Option<&SdkLoggerProvider>,
) -> Result<impl Subscriber + Send + Sync + 'static> {
    validate_logging(cfg)?;

    let fmt_layer: Box<dyn Layer<Registry> + Send + Sync> =
        if cfg.format.eq_ignore_ascii_case("json") {
            tracing_subscriber::fmt::layer()
                .json()
                .with_file(cfg.set_report_caller)
                .with_line_number(cfg.set_report_caller)
                .boxed()
        } else {
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_file(cfg.set_report_caller)
                .with_line_number(cfg.set_report_caller)
                .boxed()
        };
    let otel_layer = tracer.map(|t| tracing_opentelemetry::layer().with_tracer(t));
    let log_bridge = logger_provider.map(|provider| {
        OpenTelemetryTracingBridge::new(provider)
            .with_filter(filter_fn(|meta| !is_exporter_internal(meta.target())))
    });

    Ok(tracing_subscriber::registry()
        .with(fmt_layer)
        .with(otel_layer)
        .with(log_bridge)
        .with(env_filter(cfg)))
}

/// Install the global subscriber. With a tracer, `tracing` spans are also
/// exported as OpenTelemetry spans; with a logger provider, events are
/// forwarded as OpenTelemetry log records.
pub fn init_logging(
    cfg: &LoggingConfig,
    tracer: Option<SdkTracer>,
    logger_provider: Option<&SdkLoggerProvider>,
) -> Result<()> {
    subscriber(cfg, tracer, logger_provider)?
        .try_init()
        .map_err(|e| LookoutError::Logging(format!("Failed to set global tracing subscriber: {e}")))
}
