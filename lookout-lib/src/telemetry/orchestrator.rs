use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, error, info};

use crate::config::MonitoringConfig;
use crate::error::MultiError;
use crate::telemetry::context::LifecycleContext;
use crate::telemetry::exporters::{ExporterSource, OtlpHttp};
use crate::telemetry::handles::{new_propagator, TelemetryHandles};
use crate::telemetry::logs::LoggingInitializer;
use crate::telemetry::metrics::MetricsInitializer;
use crate::telemetry::registry::ShutdownRegistry;
use crate::telemetry::subsystem::SubsystemInitializer;
use crate::telemetry::tracing::TracingInitializer;

/// Releases everything a successful [`Orchestrator::run`] started.
///
/// Clones share one registry, so the handle can be wired into several exit
/// paths and whichever fires first does the work.
#[derive(Clone)]
pub struct ShutdownHandle {
    registry: Arc<Mutex<ShutdownRegistry>>,
}

impl ShutdownHandle {
    fn new(registry: ShutdownRegistry) -> Self {
        Self { registry: Arc::new(Mutex::new(registry)) }
    }

    /// Release every started subsystem in start order. Safe to call more
    /// than once; later calls return `Ok(())`.
    pub fn shutdown(&self, ctx: &LifecycleContext) -> Result<(), MultiError> {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.shutdown_all(ctx)
    }

    /// Releases still waiting to run
    pub fn pending(&self) -> usize {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl std::fmt::Debug for ShutdownHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownHandle").field("pending", &self.pending()).finish()
    }
}

/// Started telemetry: the live providers plus the way to release them
#[derive(Debug)]
pub struct Telemetry {
    handles: TelemetryHandles,
    shutdown: ShutdownHandle,
}

impl Telemetry {
    pub fn handles(&self) -> &TelemetryHandles {
        &self.handles
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    pub fn shutdown(&self, ctx: &LifecycleContext) -> Result<(), MultiError> {
        self.shutdown.shutdown(ctx)
    }

    pub fn into_parts(self) -> (TelemetryHandles, ShutdownHandle) {
        (self.handles, self.shutdown)
    }
}

/// Runs the subsystem initializers in order and unwinds the started ones
/// when any of them fails.
pub struct Orchestrator {
    steps: Vec<Box<dyn SubsystemInitializer>>,
}

impl Orchestrator {
    /// No steps; add them with [`Orchestrator::step`]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn step(mut self, initializer: impl SubsystemInitializer + 'static) -> Self {
        self.steps.push(Box::new(initializer));
        self
    }

    /// Tracing, logging then metrics, all exporting through `exporters`
    pub fn with_exporters<S: ExporterSource>(exporters: S) -> Self {
        let exporters = Arc::new(exporters);
        Self::new()
            .step(TracingInitializer::new(Arc::clone(&exporters)))
            .step(LoggingInitializer::new(Arc::clone(&exporters)))
            .step(MetricsInitializer::new(exporters))
    }

    pub fn run(&self, ctx: &LifecycleContext, cfg: &MonitoringConfig) -> Result<Telemetry, MultiError> {
        cfg.validate()?;

        let mut handles = TelemetryHandles::new(new_propagator());
        let mut registry = ShutdownRegistry::new();

        for step in &self.steps {
            let subsystem = step.subsystem();
            if !cfg.is_enabled(subsystem) {
                debug!(%subsystem, "telemetry subsystem disabled");
                continue;
            }

            if let Err(e) = step.init(ctx, cfg, &mut registry, &mut handles) {
                error!(%subsystem, error = %e, started = registry.len(), "telemetry init failed, unwinding");
                let mut errors = MultiError::from(e);
                errors.absorb(registry.shutdown_all(ctx));
                return Err(errors);
            }
        }

        info!(subsystems = ?registry.names(), "telemetry started");
        Ok(Telemetry { handles, shutdown: ShutdownHandle::new(registry) })
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::with_exporters(OtlpHttp)
    }
}

/// Start tracing, logging and metrics as `cfg` enables them, exporting over
/// OTLP/HTTP.
///
/// On failure everything already started has been shut down and the error
/// carries the startup failure followed by any shutdown failures.
pub fn init_telemetry(ctx: &LifecycleContext, cfg: &MonitoringConfig) -> Result<Telemetry, MultiError> {
    Orchestrator::default().run(ctx, cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookoutError;
    use crate::telemetry::subsystem::Subsystem;
    use crate::telemetry::test_support::{FakeInitializer, FixedMemory, FixedProcess, InMemoryExporters};
    use opentelemetry::propagation::TextMapPropagator;
    use opentelemetry::trace::{Span, Tracer};

    fn all_enabled() -> MonitoringConfig {
        let mut cfg = MonitoringConfig::default();
        cfg.tracing.enabled = true;
        cfg.logs_enabled = true;
        cfg.metrics_enabled = true;
        cfg
    }

    #[test]
    fn test_failure_unwinds_started_subsystems_once() {
        let tracing = FakeInitializer::ok(Subsystem::Tracing);
        let logging = FakeInitializer::ok(Subsystem::Logging);
        let metrics = FakeInitializer::failing(Subsystem::Metrics);
        let (t, l, m) = (tracing.shutdowns(), logging.shutdowns(), metrics.shutdowns());

        let orchestrator = Orchestrator::new().step(tracing).step(logging).step(metrics);
        let result = orchestrator.run(&LifecycleContext::background(), &all_enabled());

        let Err(errors) = result else {
            panic!("metrics failure must fail the boot");
        };
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors.iter().next(),
            Some(LookoutError::Instrumentation { subsystem: Subsystem::Metrics, .. })
        ));
        assert_eq!(t.count(), 1);
        assert_eq!(l.count(), 1);
        assert_eq!(m.count(), 0);
    }

    #[test]
    fn test_unwind_failures_are_joined_after_init_error() {
        let tracing = FakeInitializer::ok(Subsystem::Tracing);
        let logging = FakeInitializer::ok(Subsystem::Logging).with_failing_release();
        let metrics = FakeInitializer::failing(Subsystem::Metrics);

        let orchestrator = Orchestrator::new().step(tracing).step(logging).step(metrics);
        let Err(errors) = orchestrator.run(&LifecycleContext::background(), &all_enabled()) else {
            panic!("boot must fail");
        };

        let errors: Vec<LookoutError> = errors.into_iter().collect();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], LookoutError::Instrumentation { .. }));
        assert!(matches!(&errors[1], LookoutError::Release { name, .. } if name == "logging"));
    }

    #[test]
    fn test_all_disabled_is_noop() {
        let tracing = FakeInitializer::ok(Subsystem::Tracing);
        let inits = tracing.inits();
        let orchestrator = Orchestrator::new().step(tracing);
        let ctx = LifecycleContext::background();

        let result = orchestrator.run(&ctx, &MonitoringConfig::default());
        let Ok(telemetry) = result else {
            panic!("disabled boot must succeed");
        };
        assert_eq!(inits.count(), 0);
        assert_eq!(telemetry.shutdown_handle().pending(), 0);
        assert!(telemetry.shutdown(&ctx).is_ok());

        let fields: Vec<&str> = telemetry.handles().propagator().fields().collect();
        assert!(fields.contains(&"traceparent"));
        assert!(telemetry.handles().tracer_provider().is_none());
    }

    #[test]
    fn test_shutdown_is_idempotent_across_clones() -> Result<(), MultiError> {
        let tracing = FakeInitializer::ok(Subsystem::Tracing);
        let metrics = FakeInitializer::ok(Subsystem::Metrics);
        let (t, m) = (tracing.shutdowns(), metrics.shutdowns());
        let ctx = LifecycleContext::background();

        let telemetry = Orchestrator::new().step(tracing).step(metrics).run(&ctx, &all_enabled())?;
        let (_, handle) = telemetry.into_parts();
        let other = handle.clone();

        handle.shutdown(&ctx)?;
        other.shutdown(&ctx)?;
        handle.shutdown(&ctx)?;
        assert_eq!(t.count(), 1);
        assert_eq!(m.count(), 1);
        Ok(())
    }

    #[test]
    fn test_invalid_sample_rate_starts_nothing() {
        let tracing = FakeInitializer::ok(Subsystem::Tracing);
        let inits = tracing.inits();
        let mut cfg = all_enabled();
        cfg.tracing.sample_rate = 2.0;

        let result = Orchestrator::new().step(tracing).run(&LifecycleContext::background(), &cfg);
        assert!(result.is_err());
        assert_eq!(inits.count(), 0);
    }

    #[test]
    fn test_exporter_failure_unwinds_earlier_providers() {
        let exporters = Arc::new(InMemoryExporters::failing(Subsystem::Logging));
        let orchestrator = Orchestrator::new()
            .step(TracingInitializer::new(Arc::clone(&exporters)))
            .step(LoggingInitializer::new(exporters));

        let Err(errors) = orchestrator.run(&LifecycleContext::background(), &all_enabled()) else {
            panic!("logging exporter failure must fail the boot");
        };
        assert!(matches!(
            errors.iter().next(),
            Some(LookoutError::Exporter { subsystem: Subsystem::Logging, .. })
        ));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_in_memory_pipeline_exports_spans() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let exporters = Arc::new(InMemoryExporters::default());
        let spans = exporters.spans.clone();
        let orchestrator = Orchestrator::new()
            .step(TracingInitializer::new(Arc::clone(&exporters)))
            .step(LoggingInitializer::new(Arc::clone(&exporters)))
            .step(
                MetricsInitializer::new(exporters)
                    .with_memory_sampler(FixedMemory::ok())
                    .with_process_sampler(FixedProcess::ok()),
            );
        let ctx = LifecycleContext::background();

        let telemetry = orchestrator.run(&ctx, &all_enabled())?;
        assert_eq!(telemetry.shutdown_handle().pending(), 3);

        let tracer = telemetry.handles().tracer("pipeline-test").ok_or("tracer missing")?;
        tracer.start("boot").end();
        if let Some(provider) = telemetry.handles().tracer_provider() {
            provider.force_flush()?;
        }
        let finished = spans.get_finished_spans()?;
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].name, "boot");

        telemetry.shutdown(&ctx)?;
        assert_eq!(telemetry.shutdown_handle().pending(), 0);
        Ok(())
    }
}
