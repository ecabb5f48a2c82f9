use std::sync::Arc;
use std::time::Duration;

use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry_sdk::metrics::exporter::PushMetricExporter;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::Resource;
use tracing::{info, warn};

use crate::config::MonitoringConfig;
use crate::error::Result;
use crate::telemetry::context::LifecycleContext;
use crate::telemetry::exporters::ExporterSource;
use crate::telemetry::handles::TelemetryHandles;
use crate::telemetry::registry::ShutdownRegistry;
use crate::telemetry::resource;
use crate::telemetry::subsystem::{Subsystem, SubsystemInitializer};
use crate::telemetry::system::{
    MemorySampler, MemorySnapshot, ProcMeminfo, ProcSelf, ProcessSampler, ProcessSnapshot,
    RuntimeCollector,
};

pub const METRIC_EXPORT_INTERVAL: Duration = Duration::from_secs(15);
pub const RUNTIME_MIN_READ_INTERVAL: Duration = Duration::from_secs(1);
pub const METER_NAME: &str = "lookout/telemetry";

pub mod names {
    pub const SYSTEM_MEMORY_TOTAL: &str = "system.memory.total";
    pub const SYSTEM_MEMORY_USED: &str = "system.memory.used";
    pub const PROCESS_MEMORY_RESIDENT: &str = "process.runtime.memory.resident";
    pub const PROCESS_MEMORY_VIRTUAL: &str = "process.runtime.memory.virtual";
    pub const PROCESS_OPEN_FDS: &str = "process.runtime.open_fds";
    pub const PROCESS_UPTIME: &str = "process.runtime.uptime";
}

pub fn build_meter_provider<E>(exporter: E, interval: Duration, resource: Resource) -> SdkMeterProvider
where
    E: PushMetricExporter + 'static,
{
    let reader = PeriodicReader::builder(exporter).with_interval(interval).build();
    SdkMeterProvider::builder()
        .with_reader(reader)
        .with_resource(resource)
        .build()
}

fn saturating_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn read_memory(sampler: &dyn MemorySampler) -> Option<MemorySnapshot> {
    match sampler.sample() {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(error = %e, "system memory sample skipped");
            None
        }
    }
}

fn read_process(collector: &RuntimeCollector) -> Option<ProcessSnapshot> {
    match collector.snapshot() {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(error = %e, "runtime metrics sample skipped");
            None
        }
    }
}

/// Register gauges reporting total and used system memory at every
/// collection. Fails up front if the sampler cannot be read at all.
pub fn observe_system_memory(meter: &Meter, sampler: Arc<dyn MemorySampler>) -> Result<()> {
    sampler.sample()?;

    let total = Arc::clone(&sampler);
    let _total = meter
        .i64_observable_gauge(names::SYSTEM_MEMORY_TOTAL)
        .with_description("Total system memory")
        .with_unit("By")
        .with_callback(move |observer| {
            if let Some(snapshot) = read_memory(total.as_ref()) {
                observer.observe(saturating_i64(snapshot.total), &[]);
            }
        })
        .build();

    let used = sampler;
    let _used = meter
        .i64_observable_gauge(names::SYSTEM_MEMORY_USED)
        .with_description("Used system memory")
        .with_unit("By")
        .with_callback(move |observer| {
            if let Some(snapshot) = read_memory(used.as_ref()) {
                observer.observe(saturating_i64(snapshot.used), &[]);
            }
        })
        .build();

    Ok(())
}

/// Start the process runtime gauges. The first read has to succeed.
pub fn start_runtime_metrics(meter: &Meter, collector: Arc<RuntimeCollector>) -> Result<()> {
    collector.snapshot()?;

    let c = Arc::clone(&collector);
    let _resident = meter
        .u64_observable_gauge(names::PROCESS_MEMORY_RESIDENT)
        .with_description("Resident set size of the process")
        .with_unit("By")
        .with_callback(move |observer| {
            if let Some(snapshot) = read_process(&c) {
                observer.observe(snapshot.resident, &[]);
            }
        })
        .build();

    let c = Arc::clone(&collector);
    let _virtual = meter
        .u64_observable_gauge(names::PROCESS_MEMORY_VIRTUAL)
        .with_description("Virtual memory size of the process")
        .with_unit("By")
        .with_callback(move |observer| {
            if let Some(snapshot) = read_process(&c) {
                observer.observe(snapshot.virtual_size, &[]);
            }
        })
        .build();

    let c = Arc::clone(&collector);
    let _fds = meter
        .u64_observable_gauge(names::PROCESS_OPEN_FDS)
        .with_description("Open file descriptors")
        .with_callback(move |observer| {
            if let Some(snapshot) = read_process(&c) {
                observer.observe(snapshot.open_fds, &[]);
            }
        })
        .build();

    let _uptime = meter
        .f64_observable_gauge(names::PROCESS_UPTIME)
        .with_description("Seconds since the runtime collector started")
        .with_unit("s")
        .with_callback(move |observer| observer.observe(collector.uptime().as_secs_f64(), &[]))
        .build();

    Ok(())
}

/// Brings up the periodic meter provider plus the runtime and system memory
/// gauges
pub struct MetricsInitializer<S> {
    exporters: Arc<S>,
    memory: Arc<dyn MemorySampler>,
    process: Arc<dyn ProcessSampler>,
    export_interval: Duration,
}

impl<S: ExporterSource> MetricsInitializer<S> {
    pub fn new(exporters: Arc<S>) -> Self {
        Self {
            exporters,
            memory: Arc::new(ProcMeminfo::new()),
            process: Arc::new(ProcSelf::new()),
            export_interval: METRIC_EXPORT_INTERVAL,
        }
    }

    pub fn with_memory_sampler(mut self, sampler: impl MemorySampler) -> Self {
        self.memory = Arc::new(sampler);
        self
    }

    pub fn with_process_sampler(mut self, sampler: impl ProcessSampler) -> Self {
        self.process = Arc::new(sampler);
        self
    }

    pub fn with_export_interval(mut self, interval: Duration) -> Self {
        self.export_interval = interval;
        self
    }
}

impl<S: ExporterSource> SubsystemInitializer for MetricsInitializer<S> {
    fn subsystem(&self) -> Subsystem {
        Subsystem::Metrics
    }

    fn init(
        &self,
        ctx: &LifecycleContext,
        cfg: &MonitoringConfig,
        registry: &mut ShutdownRegistry,
        handles: &mut TelemetryHandles,
    ) -> Result<()> {
        let exporter = self.exporters.metric_exporter(ctx)?;
        let provider = build_meter_provider(exporter, self.export_interval, resource(cfg));

        // Registered before instrumenting so a failure below still releases it
        registry.register_handle(Subsystem::Metrics.name(), provider.clone());
        handles.install_meter_provider(provider.clone());

        let meter = provider.meter(METER_NAME);
        let collector = Arc::new(RuntimeCollector::new(
            Arc::clone(&self.process),
            RUNTIME_MIN_READ_INTERVAL,
        ));
        start_runtime_metrics(&meter, collector)?;
        observe_system_memory(&meter, Arc::clone(&self.memory))?;

        info!(interval_secs = self.export_interval.as_secs(), "metrics initialized");
        Ok(())
    }
}
