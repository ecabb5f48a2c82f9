use std::fmt;
use std::time::Duration;

use opentelemetry_sdk::error::OTelSdkResult;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;

use crate::config::MonitoringConfig;
use crate::error::{LookoutError, Result};
use crate::telemetry::context::LifecycleContext;
use crate::telemetry::handles::TelemetryHandles;
use crate::telemetry::registry::ShutdownRegistry;

/// Budget for a provider shutdown when the context carries no deadline.
/// Matches the SDK's own default.
pub const DEFAULT_SHUTDOWN_BUDGET: Duration = Duration::from_secs(5);

/// One observability concern the orchestrator can bring up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subsystem {
    Tracing,
    Logging,
    Metrics,
}

impl Subsystem {
    pub const fn name(self) -> &'static str {
        match self {
            Subsystem::Tracing => "tracing",
            Subsystem::Logging => "logging",
            Subsystem::Metrics => "metrics",
        }
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A started subsystem's releasable resource
pub trait SubsystemHandle: Send + 'static {
    fn shutdown(&self, ctx: &LifecycleContext) -> Result<()>;
}

/// Per-concern startup logic.
///
/// On success an initializer must have registered every release it needs
/// with `registry` before returning, including when a later step of its own
/// fails: the orchestrator unwinds through the registry only.
pub trait SubsystemInitializer {
    fn subsystem(&self) -> Subsystem;

    fn init(
        &self,
        ctx: &LifecycleContext,
        cfg: &MonitoringConfig,
        registry: &mut ShutdownRegistry,
        handles: &mut TelemetryHandles,
    ) -> Result<()>;
}

fn sdk_shutdown(
    subsystem: Subsystem,
    ctx: &LifecycleContext,
    shutdown: impl FnOnce(Duration) -> OTelSdkResult,
) -> Result<()> {
    shutdown(ctx.budget(DEFAULT_SHUTDOWN_BUDGET)).map_err(|e| LookoutError::provider(subsystem, e))
}

impl SubsystemHandle for SdkTracerProvider {
    fn shutdown(&self, ctx: &LifecycleContext) -> Result<()> {
        sdk_shutdown(Subsystem::Tracing, ctx, |budget| self.shutdown_with_timeout(budget))
    }
}

impl SubsystemHandle for SdkLoggerProvider {
    fn shutdown(&self, ctx: &LifecycleContext) -> Result<()> {
        sdk_shutdown(Subsystem::Logging, ctx, |budget| self.shutdown_with_timeout(budget))
    }
}

impl SubsystemHandle for SdkMeterProvider {
    fn shutdown(&self, ctx: &LifecycleContext) -> Result<()> {
        sdk_shutdown(Subsystem::Metrics, ctx, |budget| self.shutdown_with_timeout(budget))
    }
}
