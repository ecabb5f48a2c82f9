use std::sync::Arc;
use std::time::Duration;

use opentelemetry_sdk::trace::{
    BatchConfigBuilder, BatchSpanProcessor, Sampler, SdkTracerProvider, SpanExporter,
};
use opentelemetry_sdk::Resource;
use tracing::info;

use crate::config::MonitoringConfig;
use crate::error::Result;
use crate::telemetry::context::LifecycleContext;
use crate::telemetry::exporters::ExporterSource;
use crate::telemetry::handles::TelemetryHandles;
use crate::telemetry::registry::ShutdownRegistry;
use crate::telemetry::resource;
use crate::telemetry::subsystem::{Subsystem, SubsystemInitializer};

/// How long finished spans may wait in the batch before being exported
pub const TRACE_BATCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Parent-based ratio sampler: a sampled parent forces its children to be
/// sampled, roots are kept with probability `sample_rate`
pub fn sampler(sample_rate: f64) -> Sampler {
    Sampler::ParentBased(Box::new(Sampler::TraceIdRatioBased(sample_rate)))
}

pub fn build_tracer_provider<E>(exporter: E, sample_rate: f64, resource: Resource) -> SdkTracerProvider
where
    E: SpanExporter + 'static,
{
    let processor = BatchSpanProcessor::builder(exporter)
        .with_batch_config(
            BatchConfigBuilder::default()
                .with_scheduled_delay(TRACE_BATCH_TIMEOUT)
                .build(),
        )
        .build();

    SdkTracerProvider::builder()
        .with_span_processor(processor)
        .with_sampler(sampler(sample_rate))
        .with_resource(resource)
        .build()
}

/// Brings up the tracer provider
pub struct TracingInitializer<S> {
    exporters: Arc<S>,
}

impl<S: ExporterSource> TracingInitializer<S> {
    pub fn new(exporters: Arc<S>) -> Self {
        Self { exporters }
    }
}

impl<S: ExporterSource> SubsystemInitializer for TracingInitializer<S> {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Tracing
    }

    fn init(
        &self,
        ctx: &LifecycleContext,
        cfg: &MonitoringConfig,
        registry: &mut ShutdownRegistry,
        handles: &mut TelemetryHandles,
    ) -> Result<()> {
        let exporter = self.exporters.span_exporter(ctx)?;
        let sample_rate = cfg.tracing.sample_rate;
        let provider = build_tracer_provider(exporter, sample_rate, resource(cfg));

        registry.register_handle(Subsystem::Tracing.name(), provider.clone());
        handles.install_tracer_provider(provider);

        info!(sample_rate, "tracing initialized");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry::trace::{Span, SpanContext, SpanId, TraceFlags, TraceId, TraceState};
    use opentelemetry::trace::{TraceContextExt, Tracer, TracerProvider};
    use opentelemetry::Context;
    use opentelemetry_sdk::trace::InMemorySpanExporter;

    fn provider(rate: f64) -> SdkTracerProvider {
        build_tracer_provider(InMemorySpanExporter::default(), rate, Resource::builder().build())
    }

    fn root_sampled(provider: &SdkTracerProvider, n: usize) -> usize {
        let tracer = provider.tracer("sampling-test");
        (0..n)
            .filter(|_| {
                let mut span = tracer.start("root");
                let sampled = span.span_context().is_sampled();
                span.end();
                sampled
            })
            .count()
    }

    #[test]
    fn test_zero_rate_samples_no_roots() {
        let provider = provider(0.0);
        assert_eq!(root_sampled(&provider, 100), 0);
        let _ = provider.shutdown();
    }

    #[test]
    fn test_full_rate_samples_every_root() {
        let provider = provider(1.0);
        assert_eq!(root_sampled(&provider, 100), 100);
        let _ = provider.shutdown();
    }

    #[test]
    fn test_sampled_parent_overrides_zero_rate(
    ) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let provider = provider(0.0);
        let tracer = provider.tracer("sampling-test");
        let parent = SpanContext::new(
            TraceId::from_hex("0af7651916cd43dd8448eb211c80319c")?,
            SpanId::from_hex("b7ad6b7169203331")?,
            TraceFlags::SAMPLED,
            true,
            TraceState::default(),
        );
        let cx = Context::new().with_remote_span_context(parent);

        let span = tracer.start_with_context("child", &cx);
        assert!(span.span_context().is_sampled());
        let _ = provider.shutdown();
        Ok(())
    }
}
