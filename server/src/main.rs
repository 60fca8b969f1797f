//! Crop Recommendation Server
//!
//! HTTP API serving predictions from a trained artifact directory.
//! The model is loaded once at startup; if loading fails the server still
//! starts and reports itself as degraded.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use crop_recommend::RangePolicy;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::state::{AppState, ServerConfig};

/// Crop Recommendation Server
#[derive(Parser, Debug)]
#[command(name = "crop-recommend-server")]
#[command(version)]
#[command(about = "HTTP API server for crop recommendation")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "CROP_PORT", default_value = "8000")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "CROP_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Artifact directory produced by `crop_recommend train`
    #[arg(short, long, env = "CROP_ARTIFACTS_DIR", default_value = "artifacts/forest")]
    artifacts: PathBuf,

    /// Accept values outside the physical ranges
    #[arg(long, default_value = "false")]
    no_range_checks: bool,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            artifacts_dir: self.artifacts,
            range_policy: if self.no_range_checks {
                RangePolicy::Skip
            } else {
                RangePolicy::Enforce
            },
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Cli::parse().into_config();

    FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    info!("Crop Recommendation Server v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration:");
    info!("  Artifacts:    {:?}", config.artifacts_dir);
    info!("  Range checks: {:?}", config.range_policy);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::new(config));
    let app = routes::router(state);

    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = Cli::try_parse_from(["crop-recommend-server"])
            .unwrap()
            .into_config();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.range_policy, RangePolicy::Enforce);
    }

    #[test]
    fn test_cli_no_range_checks() {
        let config = Cli::try_parse_from(["crop-recommend-server", "--no-range-checks", "--port", "9000"])
            .unwrap()
            .into_config();
        assert_eq!(config.port, 9000);
        assert_eq!(config.range_policy, RangePolicy::Skip);
    }
}
