use std::{path::PathBuf, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use crate::{
    capture::Capture,
    error::CaptureError,
    server::protocol::{LatestResponse, PartialSaveResponse, SaveRequest, SavedResponse},
    storage::{capture_store::CaptureStore, encoding::to_png_data_url},
};

use super::{CaptureRelay, RelayReport, RemoteAck};

pub const DEFAULT_RELAY_URL: &str = "http://localhost:3030";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Writes captures into the local capture directory and forwards them to the relay service.
/// Nothing is queued: a capture the service didn't get is only on the local disk.
pub struct RelayClient {
    store: CaptureStore,
    http: reqwest::Client,
    base_url: String,
}

impl RelayClient {
    pub fn new(store: CaptureStore, relay_url: &str, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            store,
            http,
            base_url: relay_url.trim_end_matches('/').to_string(),
        })
    }

    async fn write_local(&self, capture: &Capture) -> Result<PathBuf, CaptureError> {
        Ok(self.store.write(&capture.filename(), capture.bytes()).await?)
    }

    async fn submit(&self, capture: &Capture) -> Result<RemoteAck, CaptureError> {
        let request = SaveRequest {
            base64_image: Some(to_png_data_url(capture.bytes())),
        };
        let response = self
            .http
            .post(format!("{}/save-screenshot", self.base_url))
            .json(&request)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => {
                let saved: SavedResponse = response.json().await?;
                debug!("Relay stored capture as {:?}", saved.file_path);
                Ok(RemoteAck::Stored {
                    filename: saved.filename,
                })
            }
            StatusCode::MULTI_STATUS => {
                let partial: PartialSaveResponse = response.json().await?;
                warn!("Relay kept capture in memory only: {}", partial.error);
                Ok(RemoteAck::MemoryOnly {
                    error: partial.error,
                })
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(CaptureError::Transport(format!(
                    "relay answered {status}: {body}"
                )))
            }
        }
    }

    /// Asks the relay service for the latest capture. `None` means nothing was saved yet.
    pub async fn latest(&self) -> Result<Option<LatestResponse>, CaptureError> {
        let response = self
            .http
            .get(format!("{}/latest-screenshot", self.base_url))
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(CaptureError::Transport(format!("relay answered {status}"))),
        }
    }
}

#[async_trait]
impl CaptureRelay for RelayClient {
    async fn relay(&self, capture: Capture) -> RelayReport {
        let (local, remote) = tokio::join!(self.write_local(&capture), self.submit(&capture));
        RelayReport { local, remote }
    }
}
