//! Terra App Server - HTTP API server binary.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use terra_app_server::{ServerConfig, run_with_shutdown};

/// Terra API Server
#[derive(Parser)]
#[command(name = "terra-server")]
#[command(about = "Environmental-science chat proxy for the OpenAI API")]
#[command(version)]
struct Args {
    /// Configuration file path (JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Listen address, overrides the configuration
    #[arg(short, long)]
    listen: Option<String>,

    /// Log level, overrides the configuration
    #[arg(long)]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    json_logs: bool,
}

fn setup_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let dotenv = dotenvy::dotenv();
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => ServerConfig::load(path).map_err(|e| format!("Failed to load config from {path}: {e}")),
        None => ServerConfig::from_env().map_err(|e| format!("Failed to load config from environment: {e}")),
    };

    // Logging comes up before the config error is reported so it is not lost.
    let (level, json) = match &loaded {
        Ok(config) => (
            args.log_level.clone().unwrap_or_else(|| config.logging.level.clone()),
            args.json_logs || config.logging.format == "json",
        ),
        Err(_) => (args.log_level.clone().unwrap_or_else(|| "info".to_string()), args.json_logs),
    };
    setup_logging(&level, json);

    if let Err(e) = &dotenv {
        if !e.not_found() {
            warn!("Failed to read .env file: {}", e);
        }
    }

    let mut config = match loaded {
        Ok(c) => c,
        Err(e) => {
            error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    info!("Press Ctrl+C to stop");
    let shutdown_timeout = config.shutdown_timeout;
    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();

    let shutdown = async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, initiating graceful shutdown (timeout: {}s)...", shutdown_timeout);
            }
            _ = terminate => {
                info!("Received SIGTERM, initiating graceful shutdown (timeout: {}s)...", shutdown_timeout);
            }
        }
        let _ = signalled_tx.send(());
    };

    // In-flight requests get `shutdown_timeout` seconds once a signal arrives.
    let deadline = async move {
        if signalled_rx.await.is_ok() {
            tokio::time::sleep(Duration::from_secs(shutdown_timeout)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        result = run_with_shutdown(config, shutdown) => match result {
            Ok(()) => {
                info!("Server stopped");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("Server error: {}", e);
                ExitCode::FAILURE
            }
        },
        _ = deadline => {
            warn!("Graceful shutdown timed out after {}s, exiting", shutdown_timeout);
            ExitCode::SUCCESS
        }
    }
}
