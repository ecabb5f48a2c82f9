use std::sync::Arc;

use opentelemetry::global;
use opentelemetry::metrics::{Meter, MeterProvider as _};
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use tracing::debug;

/// W3C trace-context + baggage, the propagator every boot installs
pub fn new_propagator() -> TextMapCompositePropagator {
    TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ])
}

/// The active providers, handed to the caller instead of living in
/// process-wide slots.
///
/// Each slot holds at most one provider; installing a new one replaces the
/// old one (last writer wins). Clones share the same providers.
#[derive(Debug, Clone)]
pub struct TelemetryHandles {
    propagator: Arc<TextMapCompositePropagator>,
    tracer_provider: Option<SdkTracerProvider>,
    logger_provider: Option<SdkLoggerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl TelemetryHandles {
    pub fn new(propagator: TextMapCompositePropagator) -> Self {
        Self {
            propagator: Arc::new(propagator),
            tracer_provider: None,
            logger_provider: None,
            meter_provider: None,
        }
    }

    pub fn propagator(&self) -> &TextMapCompositePropagator {
        &self.propagator
    }

    pub fn tracer_provider(&self) -> Option<&SdkTracerProvider> {
        self.tracer_provider.as_ref()
    }

    pub fn logger_provider(&self) -> Option<&SdkLoggerProvider> {
        self.logger_provider.as_ref()
    }

    pub fn meter_provider(&self) -> Option<&SdkMeterProvider> {
        self.meter_provider.as_ref()
    }

    /// Tracer from the active provider, `None` when tracing is off
    pub fn tracer(&self, name: &'static str) -> Option<SdkTracer> {
        self.tracer_provider.as_ref().map(|p| p.tracer(name))
    }

    /// Meter from the active provider; falls back to the global meter, which
    /// is a no-op unless something else installed one
    pub fn meter(&self, name: &'static str) -> Meter {
        match &self.meter_provider {
            Some(provider) => provider.meter(name),
            None => global::meter(name),
        }
    }

    pub fn install_tracer_provider(&mut self, provider: SdkTracerProvider) -> Option<SdkTracerProvider> {
        self.tracer_provider.replace(provider)
    }

    pub fn install_logger_provider(&mut self, provider: SdkLoggerProvider) -> Option<SdkLoggerProvider> {
        self.logger_provider.replace(provider)
    }

    pub fn install_meter_provider(&mut self, provider: SdkMeterProvider) -> Option<SdkMeterProvider> {
        self.meter_provider.replace(provider)
    }

    /// Push the propagator and the tracer/meter providers into
    /// `opentelemetry::global` for code that still looks them up ambiently.
    ///
    /// The OpenTelemetry API has no global logger provider; logs stay
    /// reachable through [`TelemetryHandles::logger_provider`] only.
    pub fn install_globals(&self) {
        global::set_text_map_propagator(new_propagator());
        if let Some(provider) = &self.tracer_provider {
            global::set_tracer_provider(provider.clone());
        }
        if let Some(provider) = &self.meter_provider {
            global::set_meter_provider(provider.clone());
        }
        debug!(
            tracing = self.tracer_provider.is_some(),
            metrics = self.meter_provider.is_some(),
            "telemetry providers installed globally"
        );
    }
}

impl Default for TelemetryHandles {
    fn default() -> Self {
        Self::new(new_propagator())
    }
}
