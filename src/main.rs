//! Prometheus exporter for Minecraft servers.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

use minecraft_exporter::config::LogFormat;
use minecraft_exporter::{CollectorRegistry, ExporterConfig, HttpServer, RconClient, Transport};

/// Prometheus exporter for Minecraft servers.
#[derive(Parser, Debug)]
#[command(name = "minecraft-exporter")]
#[command(about = "Export Minecraft server facts as Prometheus metrics over RCON")]
#[command(version)]
struct Args {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address (overrides config).
    #[arg(long)]
    listen: Option<String>,

    /// RCON address as host:port (overrides config).
    #[arg(long)]
    rcon_address: Option<String>,

    /// RCON password (overrides config).
    #[arg(long)]
    rcon_password: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,
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
    if let Some(listen) = args.listen {
        config.http.listen = listen;
    }
    if let Some(address) = args.rcon_address {
        config.rcon.address = address;
    }
    if let Some(password) = args.rcon_password {
        config.rcon.password = password;
    }
    config.validate()?;

    // Initialize logging
    let log_level = args.log_level.parse().unwrap_or(Level::INFO);
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("minecraft_exporter={}", log_level).parse()?);

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

    info!("Starting Minecraft exporter");

    // The registry is built once; a duplicate collector name is a bug that
    // must stop the process here, before the first scrape.
    let registry = Arc::new(CollectorRegistry::with_defaults(&config.collectors)?);
    info!(collectors = ?registry.enabled_names(), "enabled collectors");

    let transport: Arc<dyn Transport> = Arc::new(RconClient::new(
        config.rcon.address.clone(),
        config.rcon.password.clone(),
        Duration::from_millis(config.rcon.timeout_ms),
    ));

    let listen_addr = config
        .http
        .listen
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let http_server = HttpServer::new(registry, transport, listen_addr, config.http.clone());
    let http_task = tokio::spawn(async move {
        if let Err(e) = http_server.run(shutdown_rx).await {
            error!("HTTP server error: {}", e);
        }
    });

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = tokio::signal::unix::signal(
                    tokio::signal::unix::SignalKind::terminate()
                ).expect("install SIGTERM handler");
                sigterm.recv().await;
            }
            #[cfg(not(unix))]
            {
                std::future::pending::<()>().await;
            }
        } => {
            info!("Received SIGTERM, shutting down...");
        }
    }

    // Signal shutdown and give the server a moment to drain.
    shutdown_tx.send(true)?;
    let _ = tokio::time::timeout(Duration::from_secs(5), http_task).await;

    info!("Exporter stopped");
    Ok(())
}
