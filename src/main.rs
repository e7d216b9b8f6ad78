//! argus-host-reporter - version 0.1.0
//!
//! Periodic host telemetry reporter with tracing logging. This is the main
//! entry point that wires configuration, the collector registry and the two
//! reporting loops, and handles graceful shutdown.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::watch;
use tracing::{debug, error, info, Level};

use argus_host_reporter::cli::{Args, Commands, LogLevel};
use argus_host_reporter::collectors::{
    CoolingDeviceState, CpuUtilization, StorageUsage, ThermalZoneTemp,
};
use argus_host_reporter::config::{
    resolve_config, show_config, validate_effective_config, Config,
};
use argus_host_reporter::exporters::{ConsoleExporter, Exporter, WebhookExporter};
use argus_host_reporter::metrics::{CollectorRegistry, Runner};
use argus_host_reporter::state::{shared_latest, SharedLatest};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config, args: &Args) {
    let level = args.log_level.or_else(|| {
        config.log_level.as_deref().and_then(|s| match s {
            "off" => Some(LogLevel::Off),
            "error" => Some(LogLevel::Error),
            "warn" => Some(LogLevel::Warn),
            "info" => Some(LogLevel::Info),
            "debug" => Some(LogLevel::Debug),
            "trace" => Some(LogLevel::Trace),
            _ => None,
        })
    });

    let log_level = match level.unwrap_or(LogLevel::Info) {
        LogLevel::Off => Level::ERROR,
        LogLevel::Error => Level::ERROR,
        LogLevel::Warn => Level::WARN,
        LogLevel::Info => Level::INFO,
        LogLevel::Debug => Level::DEBUG,
        LogLevel::Trace => Level::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(true)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Register the collectors in their fixed collection order.
fn build_registry(config: &Config) -> anyhow::Result<CollectorRegistry> {
    let mut registry = CollectorRegistry::new();
    registry.register(Arc::new(ThermalZoneTemp::new(config.temp_path())))?;
    registry.register(Arc::new(CpuUtilization::default()))?;
    registry.register(Arc::new(CoolingDeviceState::new(config.cooling_path())))?;
    registry.register(Arc::new(StorageUsage::new(config.storage_paths())))?;
    Ok(registry)
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Collection loop: collect immediately, then on every interval tick, caching
/// the result and writing the console record. Shutdown is observed at tick
/// boundaries only.
async fn collection_loop(
    runner: Runner,
    console: Option<ConsoleExporter<io::Stdout>>,
    latest: SharedLatest,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let result = runner.collect_once();

                {
                    let mut guard = latest.write().await;
                    *guard = Some(result.clone());
                }

                if let Some(console) = &console {
                    if let Err(e) = console.export(&result).await {
                        error!("console export error: {}", e);
                    }
                }
            }
            _ = shutdown.changed() => {
                debug!("collection loop stopping");
                return;
            }
        }
    }
}

/// Notification loop: on its own schedule, read the latest completed
/// collection and feed the webhook. Never triggers a collection itself.
async fn notification_loop(
    webhook: WebhookExporter,
    latest: SharedLatest,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let start = tokio::time::Instant::now() + every;
    let mut ticker = tokio::time::interval_at(start, every);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let snapshot = { latest.read().await.clone() };
                let Some(result) = snapshot else {
                    continue; // nothing collected yet
                };

                if let Err(e) = webhook.export(&result).await {
                    error!("webhook export error: {}", e);
                }
            }
            _ = shutdown.changed() => {
                debug!("notification loop stopping");
                return;
            }
        }
    }
}

async fn run(config: Config) -> anyhow::Result<()> {
    validate_effective_config(&config)?;

    let registry = build_registry(&config)?;
    let runner = Runner::from_registry(&registry);

    let console = config.console_enabled().then(ConsoleExporter::stdout);
    let latest = shared_latest();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let notifier = if config.webhook_enabled() {
        let webhook = WebhookExporter::new(config.webhook_url(), config.webhook_min_interval())?;
        info!(
            "webhook notifications every {:?} to configured URL",
            config.webhook_every()
        );
        Some(tokio::spawn(notification_loop(
            webhook,
            latest.clone(),
            config.webhook_every(),
            shutdown_rx.clone(),
        )))
    } else {
        None
    };

    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    info!(
        "collecting every {:?} with {} collectors",
        config.interval(),
        registry.len()
    );

    collection_loop(runner, console, latest, config.interval(), shutdown_rx).await;

    if let Some(handle) = notifier {
        let _ = handle.await;
    }

    info!("argus-host-reporter stopped gracefully");
    Ok(())
}

/// One-shot collection pass for the `once` subcommand.
async fn run_once(config: Config) -> anyhow::Result<()> {
    validate_effective_config(&config)?;

    let registry = build_registry(&config)?;
    let runner = Runner::from_registry(&registry);
    let console = ConsoleExporter::stdout();

    console.export(&runner.collect_once()).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = resolve_config(&args)?;
    setup_logging(&config, &args);

    match args.command {
        Some(Commands::Config { format }) => {
            validate_effective_config(&config)?;
            show_config(&config, format)
        }
        Some(Commands::Once) => run_once(config).await,
        None => run(config).await,
    }
}
