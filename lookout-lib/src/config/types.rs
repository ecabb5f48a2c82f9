use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::telemetry::Subsystem;

/// HTTP listener settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins echoed back in `Access-Control-Allow-Origin`
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port(), allowed_origins: Vec::new() }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database connection settings, including migrations
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub migrate: bool,
    pub migrations_path: String,
}

/// Application log output
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// "trace", "debug", "info", "warn" or "error". `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
    /// Include source file and line in each record
    #[serde(default)]
    pub set_report_caller: bool,
    #[serde(default)]
    pub archive_logs: bool,
    #[serde(default)]
    pub archive_buffer_size: usize,
    #[serde(default)]
    pub archive_frequency_seconds: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            set_report_caller: false,
            archive_logs: false,
            archive_buffer_size: 0,
            archive_frequency_seconds: 0,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TracingConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Fraction of root traces kept, in `[0, 1]`
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self { enabled: false, sample_rate: default_sample_rate() }
    }
}

fn default_sample_rate() -> f64 {
    1.0
}

/// Which telemetry subsystems to bring up
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfig {
    #[serde(default)]
    pub tracing: TracingConfig,
    #[serde(default)]
    pub logs_enabled: bool,
    #[serde(default)]
    pub metrics_enabled: bool,
    /// `service.name` resource attribute. Falls back to `OTEL_SERVICE_NAME`
    /// and then the SDK default when unset.
    #[serde(default)]
    pub service_name: Option<String>,
}

impl MonitoringConfig {
    pub fn is_enabled(&self, subsystem: Subsystem) -> bool {
        match subsystem {
            Subsystem::Tracing => self.tracing.enabled,
            Subsystem::Logging => self.logs_enabled,
            Subsystem::Metrics => self.metrics_enabled,
        }
    }

    pub fn validate(&self) -> Result<()> {
        super::validator::validate_monitoring(self)
    }
}

/// Object storage credentials
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AwsConfig {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    #[serde(rename = "accessKeyId")]
    pub access_key: String,
    #[serde(rename = "secretAccessKey")]
    pub secret_key: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationConfig {
    pub version: String,
    pub environment: String,
}
