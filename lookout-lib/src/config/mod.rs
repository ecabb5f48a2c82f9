mod loader;
mod types;
mod validator;

pub use loader::{expand_env, load, load_from_path, CONFIG_FILE_ENV};
pub use types::{
    ApplicationConfig, AwsConfig, DatabaseConfig, LoggingConfig, MonitoringConfig, ServerConfig,
    TracingConfig,
};
pub use validator::{validate_logging, validate_monitoring};
