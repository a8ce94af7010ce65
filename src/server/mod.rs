//! Relay service. Accepts captures over HTTP, writes them into the capture directory, and keeps
//! the latest one in memory so it can be displayed even when the disk write failed.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use service::RelayService;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    storage::capture_store::CaptureStore,
    utils::clock::{Clock, DefaultClock},
};

pub mod protocol;
pub mod routes;
pub mod service;
pub mod slot;

pub const DEFAULT_PORT: u16 = 3030;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub address: SocketAddr,
    pub capture_dir: PathBuf,
}

/// Runs the relay service until `shutdown` is cancelled.
pub async fn start_server(config: RelayConfig, shutdown: CancellationToken) -> Result<()> {
    let service = create_service(config.capture_dir.clone(), DefaultClock).await?;

    let (address, server) = warp::serve(routes::routes(service))
        .try_bind_with_graceful_shutdown(config.address, async move {
            shutdown.cancelled().await
        })
        .with_context(|| format!("Failed to bind relay service to {}", config.address))?;

    info!("Screenshot relay running at http://{address}");
    info!("Screenshots will be saved to {:?}", config.capture_dir);
    info!("  POST http://{address}/save-screenshot");
    info!("  GET  http://{address}/latest-screenshot");
    info!("  GET  http://{address}/screenshots/{{filename}}");

    server.await;
    info!("Relay service stopped");
    Ok(())
}

async fn create_service(capture_dir: PathBuf, clock: impl Clock) -> Result<Arc<RelayService>> {
    let store = CaptureStore::new(capture_dir);
    store
        .ensure_dir()
        .await
        .with_context(|| format!("Failed to create capture directory {:?}", store.dir()))?;
    Ok(Arc::new(RelayService::new(store, Box::new(clock))))
}
