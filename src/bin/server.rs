//! HTTP server binary for isomto.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ServiceConfig`, wires up the vision client, and serves the router.

use anyhow::{Context, Result};
use clap::Parser;
use isomto::{router, AppState, OpenAiVisionClient, ServiceConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default port with the bundled crop rule
  OPENAI_API_KEY=sk-... isomto-server

  # Point at a self-hosted OpenAI-compatible endpoint
  isomto-server --api-base http://localhost:11434/v1 --model llama3.2-vision

  # Higher-resolution crops for small-font vendor sheets
  isomto-server --dpi 400 --data-dir /srv/isomto

  # Convert a drawing
  curl -F file=@ISO-88-104.pdf http://localhost:8864/convert -o takeoff.csv

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY      API credential for the vision endpoint
  OPENAI_API_BASE     Endpoint base URL (default: https://api.openai.com/v1)
  ISOMTO_DATA_DIR     Staging root holding pdf/, png/, result/
  ISOMTO_MODEL        Vision model ID (default: gpt-4.1-mini)
"#;

/// Extract material take-off CSV from piping isometric drawing PDFs.
#[derive(Parser, Debug)]
#[command(
    name = "isomto-server",
    version,
    about = "Extract material take-off CSV from isometric drawing PDFs using Vision LLMs",
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Socket address to bind.
    #[arg(long, env = "ISOMTO_BIND", default_value = "0.0.0.0:8864")]
    bind: SocketAddr,

    /// Staging root; pdf/, png/ and result/ are created beneath it.
    #[arg(long, env = "ISOMTO_DATA_DIR", default_value = "./data")]
    data_dir: PathBuf,

    /// Rendering DPI for the crop raster (72-600).
    #[arg(long, env = "ISOMTO_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(72..=600))]
    dpi: u32,

    /// Vision model ID.
    #[arg(long, env = "ISOMTO_MODEL", default_value = "gpt-4.1-mini")]
    model: String,

    /// Base URL of the OpenAI-compatible endpoint.
    #[arg(long, env = "OPENAI_API_BASE", default_value = "https://api.openai.com/v1")]
    api_base: String,

    /// API credential for the vision endpoint.
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    api_key: String,

    /// Maximum tokens the model may spend on one CSV reply.
    #[arg(long, env = "ISOMTO_MAX_REPLY_TOKENS", default_value_t = 1000)]
    max_reply_tokens: usize,

    /// Per-call timeout for the vision request in seconds.
    #[arg(long, env = "ISOMTO_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ISOMTO_VERBOSE")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .init();

    // A defective crop constant fails here, before the first upload.
    let config = ServiceConfig::builder()
        .data_dir(&cli.data_dir)
        .dpi(cli.dpi)
        .model(cli.model.as_str())
        .api_base(cli.api_base.as_str())
        .api_key(cli.api_key.as_str())
        .max_reply_tokens(cli.max_reply_tokens)
        .api_timeout_secs(cli.api_timeout)
        .build()
        .context("Invalid configuration")?;

    config
        .storage
        .ensure()
        .context("Failed to create staging directories")?;

    tracing::info!(
        "Crop rule: x0={:.4} x1={:.4} y0={:.4} y1={:.4} of page 1 at {} DPI",
        config.crop_box.x0,
        config.crop_box.x1,
        config.crop_box.y0,
        config.crop_box.y1,
        config.dpi
    );
    tracing::info!("Vision endpoint: {} ({})", config.api_base, config.model);

    let extractor =
        OpenAiVisionClient::from_config(&config).context("Failed to build vision client")?;
    let state = AppState {
        config: Arc::new(config),
        extractor: Arc::new(extractor),
    };

    let listener = tokio::net::TcpListener::bind(cli.bind)
        .await
        .with_context(|| format!("Failed to bind {}", cli.bind))?;
    tracing::info!("isomto-server v{} listening on {}", env!("CARGO_PKG_VERSION"), cli.bind);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
