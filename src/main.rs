use anyhow::Result;
use clap::Parser;
use gemini_proxy::models::Config;
use gemini_proxy::proxy::Proxy;
use gemini_proxy::server::{create_router, COMPOSED_ROUTE, PASSTHROUGH_ROUTE};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "gemini-proxy")]
#[command(about = "Forward study-assistant chat requests to Gemini without exposing the API key")]
struct CliArgs {
    /// Address to listen on.
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:8888")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting gemini-proxy");

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let proxy = Arc::new(Proxy::new(&config));
    let router = create_router(proxy, config.max_body_bytes);

    let listener = TcpListener::bind(args.bind).await?;
    info!("Listening on {}", listener.local_addr()?);
    info!("Routes: POST {} (passthrough), POST {} (composed)", PASSTHROUGH_ROUTE, COMPOSED_ROUTE);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
