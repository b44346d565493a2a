//! clarity-ai - AI Engine microservice
//!
//! Content analysis over hosted language models, with classification,
//! aggregation and escalation of upstream inference failures.
//!
//! **Endpoints:**
//! - `POST /ai-engine/analyze`
//! - `GET /ai-engine/models`
//! - `GET /health`
//! - `GET /monitoring/errors`

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clarity_ai::config::AiEngineConfig;
use clarity_ai::AppState;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const CONFIG_FILE_NAME: &str = "ai-engine.toml";

/// Command-line arguments for clarity-ai
#[derive(Parser, Debug)]
#[command(name = "clarity-ai")]
#[command(about = "AI Engine microservice for ClarityForge")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long, env = "CLARITY_AI_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "CLARITY_AI_PORT")]
    port: Option<u16>,

    /// Path to TOML config file
    #[arg(short, long, env = "CLARITY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config first: it carries the default log level
    let config_path = clarity_common::config::resolve_config_path(
        args.config.as_deref(),
        "CLARITY_CONFIG",
        CONFIG_FILE_NAME,
    );
    let toml_config = clarity_common::config::load_or_default(config_path.as_deref())
        .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| toml_config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting ClarityForge AI Engine (clarity-ai) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &config_path {
        Some(path) => info!("Configuration: {}", path.display()),
        None => info!("Configuration: compiled defaults"),
    }

    let config = AiEngineConfig::resolve(&toml_config).context("Invalid [ai_engine] configuration")?;
    let state = AppState::new(&config).context("Failed to initialize AI engine")?;
    let engine = state.engine.clone();
    info!("AI engine initialized");

    let host = args
        .host
        .or(toml_config.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let app = clarity_ai::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Health checks served while draining report the engine as down
            engine.set_initialized(false);
        })
        .await
        .context("Server error")?;

    info!("Server shutdown complete");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
