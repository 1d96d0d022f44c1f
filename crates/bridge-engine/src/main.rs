//! Entry point. Mirrors the teacher's `engine` binary: load `.env`, init
//! tracing, build `AppState` once, then run the TCP protocol engine and the
//! HTTP surface concurrently until `ctrl_c`.

use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use mgba_bridge_engine::{http, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let state = Arc::new(AppState::new(config).await?);

    let tcp_bind_addr = state.config.tcp_bind_addr.clone();
    state.engine.clone().start(tcp_bind_addr).await;

    let http_bind_addr = state.config.http_bind_addr.clone();
    let router = http::router(state.clone());
    let listener = tokio::net::TcpListener::bind(&http_bind_addr).await?;
    tracing::info!(http_bind_addr, "http surface listening");
    let server = axum::serve(listener, router);

    tokio::select! {
        result = server => {
            if let Err(e) = result {
                tracing::error!(error = %e, "http surface exited");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received, stopping protocol engine...");
            state.engine.stop().await;
        }
    }

    Ok(())
}
