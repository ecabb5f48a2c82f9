//! Telemetry bootstrap: starts the tracing, log export and metrics providers
//! the configuration asks for and tears down whatever started, in order,
//! when something fails or the process exits.

pub mod context;
pub mod exporters;
pub mod handles;
pub mod http_metrics;
pub mod logs;
pub mod metrics;
pub mod orchestrator;
pub mod registry;
pub mod subsystem;
pub mod system;
pub mod tracing;

#[cfg(test)]
pub(crate) mod test_support;

use opentelemetry_sdk::Resource;

use crate::config::MonitoringConfig;

pub use context::LifecycleContext;
pub use exporters::{ExporterSource, OtlpHttp};
pub use handles::{new_propagator, TelemetryHandles};
pub use http_metrics::HttpMetrics;
pub use logs::LoggingInitializer;
pub use metrics::MetricsInitializer;
pub use orchestrator::{init_telemetry, Orchestrator, ShutdownHandle, Telemetry};
pub use registry::{ReleaseFn, ShutdownRegistry};
pub use subsystem::{Subsystem, SubsystemHandle, SubsystemInitializer, DEFAULT_SHUTDOWN_BUDGET};
pub use system::{MemorySampler, ProcMeminfo, ProcSelf, ProcessSampler, RuntimeCollector};
pub use self::tracing::TracingInitializer;

/// Resource shared by every provider. `OTEL_SERVICE_NAME` and
/// `OTEL_RESOURCE_ATTRIBUTES` are still honoured; a configured service name
/// takes precedence.
pub(crate) fn resource(cfg: &MonitoringConfig) -> Resource {
    let builder = Resource::builder();
    match &cfg.service_name {
        Some(name) => builder.with_service_name(name.clone()).build(),
        None => builder.build(),
    }
}
