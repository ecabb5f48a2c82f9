use std::sync::Arc;

use opentelemetry_sdk::logs::{LogExporter, SdkLoggerProvider};
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

pub fn build_logger_provider<E>(exporter: E, resource: Resource) -> SdkLoggerProvider
where
    E: LogExporter + 'static,
{
    SdkLoggerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build()
}

/// Brings up the batching logger provider
pub struct LoggingInitializer<S> {
    exporters: Arc<S>,
}

impl<S: ExporterSource> LoggingInitializer<S> {
    pub fn new(exporters: Arc<S>) -> Self {
        Self { exporters }
    }
}

impl<S: ExporterSource> SubsystemInitializer for LoggingInitializer<S> {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Logging
    }

    fn init(
        &self,
        ctx: &LifecycleContext,
        cfg: &MonitoringConfig,
        registry: &mut ShutdownRegistry,
        handles: &mut TelemetryHandles,
    ) -> Result<()> {
        let exporter = self.exporters.log_exporter(ctx)?;
        let provider = build_logger_provider(exporter, resource(cfg));

        registry.register_handle(Subsystem::Logging.name(), provider.clone());
        handles.install_logger_provider(provider);

        info!("log export initialized");
        Ok(())
    }
}
