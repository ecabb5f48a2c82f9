use opentelemetry_sdk::logs::LogExporter;
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::trace::SpanExporter;

use crate::error::{LookoutError, Result};
use crate::telemetry::context::LifecycleContext;
use crate::telemetry::subsystem::Subsystem;

/// Where the providers ship their data.
///
/// Each constructor returns a live exporter or the reason it could not be
/// built; the providers own the exporters afterwards.
pub trait ExporterSource: Send + Sync + 'static {
    type Span: SpanExporter + 'static;
    type Log: LogExporter + 'static;
    type Metric: PushMetricExporter + 'static;

    fn span_exporter(&self, ctx: &LifecycleContext) -> Result<Self::Span>;
    fn log_exporter(&self, ctx: &LifecycleContext) -> Result<Self::Log>;
    fn metric_exporter(&self, ctx: &LifecycleContext) -> Result<Self::Metric>;
}

/// OTLP over HTTP/protobuf.
///
/// Endpoints, headers and timeouts come from the standard
/// `OTEL_EXPORTER_OTLP_*` environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct OtlpHttp;

impl ExporterSource for OtlpHttp {
    type Span = opentelemetry_otlp::SpanExporter;
    type Log = opentelemetry_otlp::LogExporter;
    type Metric = opentelemetry_otlp::MetricExporter;

    fn span_exporter(&self, ctx: &LifecycleContext) -> Result<Self::Span> {
        ctx.check()?;
        opentelemetry_otlp::SpanExporter::builder()
            .with_http()
            .build()
            .map_err(|e| LookoutError::exporter(Subsystem::Tracing, e))
    }

    fn log_exporter(&self, ctx: &LifecycleContext) -> Result<Self::Log> {
        ctx.check()?;
        opentelemetry_otlp::LogExporter::builder()
            .with_http()
            .build()
            .map_err(|e| LookoutError::exporter(Subsystem::Logging, e))
    }

    fn metric_exporter(&self, ctx: &LifecycleContext) -> Result<Self::Metric> {
        ctx.check()?;
        opentelemetry_otlp::MetricExporter::builder()
            .with_http()
            .build()
            .map_err(|e| LookoutError::exporter(Subsystem::Metrics, e))
    }
}
