#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod telemetry;

pub use config::{load, load_from_path, LoggingConfig, MonitoringConfig};
pub use error::{LookoutError, MultiError, Result};
pub use logging::init_logging;
pub use telemetry::{init_telemetry, LifecycleContext, Telemetry, TelemetryHandles};
