#![forbid(unsafe_code)]

mod server;

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use lookout_lib::config::{
    load_from_path, ApplicationConfig, LoggingConfig, MonitoringConfig, ServerConfig,
};
use lookout_lib::init_logging;
use lookout_lib::telemetry::{init_telemetry, HttpMetrics, LifecycleContext, Telemetry};
use serde::Deserialize;
use tracing::{error, info};

const STARTUP_DEADLINE: Duration = Duration::from_secs(10);
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);
const INSTRUMENTATION_NAME: &str = "lookout";

#[derive(Parser, Debug)]
#[command(author, version, about = "Small HTTP service wired to OpenTelemetry")]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, value_name = "FILE", env = "CONFIG_FILE")]
    config: PathBuf,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct AppConfig {
    #[serde(default)]
    server: ServerConfig,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    monitoring: MonitoringConfig,
    #[serde(default)]
    application: ApplicationConfig,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let cfg: AppConfig = match load_from_path(&cli.config) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            return ExitCode::FAILURE;
        }
    };

    // Exporters use a blocking HTTP client, so providers are started and
    // stopped outside the async runtime.
    let telemetry = match init_telemetry(&LifecycleContext::with_timeout(STARTUP_DEADLINE), &cfg.monitoring) {
        Ok(telemetry) => telemetry,
        Err(errors) => {
            eprintln!("failed to start telemetry:\n{errors}");
            return ExitCode::FAILURE;
        }
    };
    telemetry.handles().install_globals();

    let handles = telemetry.handles();
    if let Err(err) = init_logging(
        &cfg.logging,
        handles.tracer(INSTRUMENTATION_NAME),
        handles.logger_provider(),
    ) {
        eprintln!("failed to initialize logging: {err}");
        shutdown_telemetry(&telemetry);
        return ExitCode::FAILURE;
    }

    info!(
        version = %cfg.application.version,
        environment = %cfg.application.environment,
        tracing = cfg.monitoring.tracing.enabled,
        logs = cfg.monitoring.logs_enabled,
        metrics = cfg.monitoring.metrics_enabled,
        "configuration loaded"
    );

    let metrics = HttpMetrics::new(&telemetry.handles().meter(INSTRUMENTATION_NAME));
    let exit = match run(cfg.server, metrics) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "server exited with error");
            ExitCode::FAILURE
        }
    };

    shutdown_telemetry(&telemetry);
    exit
}

fn run(
    server: ServerConfig,
    metrics: HttpMetrics,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(server, metrics))
}

fn shutdown_telemetry(telemetry: &Telemetry) {
    match telemetry.shutdown(&LifecycleContext::with_timeout(SHUTDOWN_DEADLINE)) {
        Ok(()) => info!("telemetry shut down"),
        Err(errors) => {
            for err in &errors {
                error!(%err, "telemetry shutdown failed");
            }
        }
    }
}
