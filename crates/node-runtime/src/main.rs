//! # Leadgate Gateway
//!
//! Single-process trustless coordination gateway for the lead-validation
//! network. Startup order matters:
//!
//! 1. Tracing, configuration, fail-fast checks
//! 2. Persistent store (yields the previous boot's chain tip)
//! 3. Enclave boot + `ENCLAVE_RESTART` persisted
//! 4. Background workers
//! 5. HTTP listener

use std::net::SocketAddr;

use anyhow::Context;
use node_runtime::{AppContext, NodeConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = NodeConfig::from_env()?;
    info!(
        network = %config.network,
        netuid = config.netuid,
        bind = %config.bind_addr,
        "starting leadgate gateway"
    );

    let context = AppContext::build(config).await?;
    context.spawn_workers();

    let router = lg_08_gateway::build_router(context.state.clone());
    let addr: SocketAddr = context
        .config
        .bind_addr
        .parse()
        .context("invalid bind address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "gateway listening");

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    })
    .await?;

    info!("gateway stopped");
    Ok(())
}
