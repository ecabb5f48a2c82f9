//! Fakes shared by the telemetry unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use opentelemetry_sdk::logs::InMemoryLogExporter;
use opentelemetry_sdk::metrics::InMemoryMetricExporter;
use opentelemetry_sdk::trace::InMemorySpanExporter;

use crate::config::MonitoringConfig;
use crate::error::{LookoutError, Result};
use crate::telemetry::context::LifecycleContext;
use crate::telemetry::exporters::ExporterSource;
use crate::telemetry::handles::TelemetryHandles;
use crate::telemetry::registry::ShutdownRegistry;
use crate::telemetry::subsystem::{Subsystem, SubsystemInitializer};
use crate::telemetry::system::{MemorySampler, MemorySnapshot, ProcessSampler, ProcessSnapshot};

#[derive(Clone, Default)]
pub(crate) struct InMemoryExporters {
    pub spans: InMemorySpanExporter,
    pub logs: InMemoryLogExporter,
    pub metrics: InMemoryMetricExporter,
    fail: Option<Subsystem>,
}

impl InMemoryExporters {
    pub fn failing(subsystem: Subsystem) -> Self {
        Self { fail: Some(subsystem), ..Self::default() }
    }

    fn check(&self, subsystem: Subsystem) -> Result<()> {
        match self.fail {
            Some(s) if s == subsystem => Err(LookoutError::exporter(subsystem, "collector unreachable")),
            _ => Ok(()),
        }
    }
}

impl ExporterSource for InMemoryExporters {
    type Span = InMemorySpanExporter;
    type Log = InMemoryLogExporter;
    type Metric = InMemoryMetricExporter;

    fn span_exporter(&self, _ctx: &LifecycleContext) -> Result<Self::Span> {
        self.check(Subsystem::Tracing)?;
        Ok(self.spans.clone())
    }

    fn log_exporter(&self, _ctx: &LifecycleContext) -> Result<Self::Log> {
        self.check(Subsystem::Logging)?;
        Ok(self.logs.clone())
    }

    fn metric_exporter(&self, _ctx: &LifecycleContext) -> Result<Self::Metric> {
        self.check(Subsystem::Metrics)?;
        Ok(self.metrics.clone())
    }
}

#[derive(Clone, Default)]
pub(crate) struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Initializer that registers a counting release under its subsystem name
pub(crate) struct FakeInitializer {
    subsystem: Subsystem,
    fail_init: bool,
    fail_release: bool,
    inits: Calls,
    shutdowns: Calls,
}

impl FakeInitializer {
    pub fn ok(subsystem: Subsystem) -> Self {
        Self {
            subsystem,
            fail_init: false,
            fail_release: false,
            inits: Calls::default(),
            shutdowns: Calls::default(),
        }
    }

    pub fn failing(subsystem: Subsystem) -> Self {
        Self { fail_init: true, ..Self::ok(subsystem) }
    }

    pub fn with_failing_release(mut self) -> Self {
        self.fail_release = true;
        self
    }

    pub fn inits(&self) -> Calls {
        self.inits.clone()
    }

    pub fn shutdowns(&self) -> Calls {
        self.shutdowns.clone()
    }
}

impl SubsystemInitializer for FakeInitializer {
    fn subsystem(&self) -> Subsystem {
        self.subsystem
    }

    fn init(
        &self,
        _ctx: &LifecycleContext,
        _cfg: &MonitoringConfig,
        registry: &mut ShutdownRegistry,
        _handles: &mut TelemetryHandles,
    ) -> Result<()> {
        self.inits.bump();
        if self.fail_init {
            return Err(LookoutError::instrumentation(self.subsystem, "fake init failure"));
        }

        let subsystem = self.subsystem;
        let shutdowns = self.shutdowns.clone();
        let fail = self.fail_release;
        registry.register(subsystem.name(), move |_ctx: &LifecycleContext| {
            shutdowns.bump();
            if fail {
                Err(LookoutError::provider(subsystem, "fake release failure"))
            } else {
                Ok(())
            }
        });
        Ok(())
    }
}

pub(crate) struct FixedMemory {
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl FixedMemory {
    pub fn ok() -> Self {
        Self { fail: false, calls: Arc::new(AtomicUsize::new(0)) }
    }

    pub fn failing() -> Self {
        Self { fail: true, ..Self::ok() }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl MemorySampler for FixedMemory {
    fn sample(&self) -> Result<MemorySnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(LookoutError::instrumentation(Subsystem::Metrics, "meminfo unavailable"));
        }
        Ok(MemorySnapshot { total: 8 << 30, used: 3 << 30 })
    }
}

pub(crate) struct FixedProcess {
    fail: bool,
}

impl FixedProcess {
    pub fn ok() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl ProcessSampler for FixedProcess {
    fn sample(&self) -> Result<ProcessSnapshot> {
        if self.fail {
            return Err(LookoutError::instrumentation(Subsystem::Metrics, "status unavailable"));
        }
        Ok(ProcessSnapshot { resident: 64 << 20, virtual_size: 512 << 20, open_fds: 12 })
    }
}
