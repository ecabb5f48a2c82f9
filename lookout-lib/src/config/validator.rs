use crate::config::types::{LoggingConfig, MonitoringConfig};
use crate::error::{LookoutError, Result};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

pub fn validate_monitoring(cfg: &MonitoringConfig) -> Result<()> {
    let rate = cfg.tracing.sample_rate;
    if !(0.0..=1.0).contains(&rate) {
        return Err(LookoutError::Config(format!(
            "tracing.sampleRate must be within [0, 1], got {rate}"
        )));
    }
    if let Some(name) = &cfg.service_name {
        if name.trim().is_empty() {
            return Err(LookoutError::Config("serviceName cannot be empty".into()));
        }
    }
    Ok(())
}

pub fn validate_logging(cfg: &LoggingConfig) -> Result<()> {
    if !LOG_LEVELS.contains(&cfg.level.to_ascii_lowercase().as_str()) {
        return Err(LookoutError::Config(format!("unknown log level: {}", cfg.level)));
    }
    if !LOG_FORMATS.contains(&cfg.format.to_ascii_lowercase().as_str()) {
        return Err(LookoutError::Config(format!("unknown log format: {}", cfg.format)));
    }
    Ok(())
}
