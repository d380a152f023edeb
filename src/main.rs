//! Gateway entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use burmemark_gateway::config::Config;
use burmemark_gateway::gateway::{GatewayState, start_server};

#[derive(Parser)]
#[command(name = "burmemark-gateway", version, about = "Burme Mark AI gateway")]
struct Cli {
    /// Listener host (overrides GATEWAY_HOST).
    #[arg(long)]
    host: Option<String>,

    /// Listener port (overrides GATEWAY_PORT).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::load()?;
    if let Some(host) = cli.host {
        config.gateway.host = host;
    }
    if let Some(port) = cli.port {
        config.gateway.port = port;
    }

    let addr: SocketAddr = format!("{}:{}", config.gateway.host, config.gateway.port).parse()?;
    let state = Arc::new(GatewayState::from_config(&config)?);

    let bound = start_server(addr, state.clone()).await?;
    tracing::info!(
        addr = %bound,
        app = %config.app_name,
        chat_provider = state.chat_provider.is_some(),
        image_provider = state.image_provider.is_some(),
        rate_limit = state.rate_limiter.max_requests(),
        "gateway listening"
    );

    tokio::signal::ctrl_c().await?;
    state.shutdown().await;
    Ok(())
}
