//! Prometheus exporter for ratgdo garage door controllers.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use ratgdo_exporter::config::LogFormat;
use ratgdo_exporter::{ExporterConfig, ExporterMetrics, Fetcher, HttpServer, Scraper};

/// Prometheus exporter for ratgdo garage door controllers.
#[derive(Parser, Debug)]
#[command(name = "ratgdo-exporter")]
#[command(about = "Export ratgdo status.json fields as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// The address of the JSON endpoint (overrides config).
    #[arg(long)]
    json_address: Option<String>,

    /// The port to expose metrics on (overrides config).
    #[arg(long)]
    port: Option<String>,

    /// The location label for the metrics (overrides config).
    #[arg(long)]
    location: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = if let Some(config_path) = &args.config {
        ExporterConfig::load_from_file(config_path)?
    } else {
        ExporterConfig::default()
    };

    // CLI overrides
    if let Some(json_address) = args.json_address {
        config.upstream.json_address = json_address;
    }
    if let Some(port) = &args.port {
        config.prometheus.set_port(port);
    }
    if let Some(location) = args.location {
        config.location = location;
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    // Initialize logging
    let log_level = config.logging.level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("ratgdo_exporter={}", log_level).parse()?)
        .add_directive(format!("reqwest={}", Level::WARN).parse()?);

    match config.logging.format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .json()
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }

    info!(
        json_address = %config.upstream.json_address,
        location = %config.location,
        "Starting ratgdo exporter"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Create the scrape pipeline
    let metrics = Arc::new(ExporterMetrics::new(
        &config.prometheus.prefix,
        config.location.clone(),
    ));
    let fetcher = Fetcher::new(
        config.upstream.json_address.clone(),
        Duration::from_secs(config.upstream.timeout_secs),
    )?;
    let scraper = Arc::new(Scraper::new(fetcher, metrics.clone()));

    // Parse listen address
    let listen_addr = config
        .prometheus
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    let http_server = HttpServer::new(scraper, listen_addr, config.prometheus.path.clone());

    // Start HTTP server
    let mut http_task = tokio::spawn(async move { http_server.run(shutdown_rx).await });

    // Wait for shutdown signal or an early server failure
    tokio::select! {
        result = &mut http_task => {
            match result {
                Ok(Ok(())) => info!("HTTP server exited"),
                Ok(Err(e)) => error!("HTTP server error: {}", e),
                Err(e) => error!("HTTP server task failed: {}", e),
            }
            return Err(anyhow::anyhow!("HTTP server stopped unexpectedly"));
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                match tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ) {
                    Ok(mut sigterm) => {
                        sigterm.recv().await;
                    }
                    Err(e) => {
                        error!("Failed to install SIGTERM handler: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown
    shutdown_tx.send(true)?;

    // Wait for the server to drain
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    info!(
        series_count = metrics.registry().series_count(),
        "Exporter stopped"
    );
    Ok(())
}
