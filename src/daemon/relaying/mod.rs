use std::path::PathBuf;

use async_trait::async_trait;

use crate::{capture::Capture, error::CaptureError};

pub mod client;

/// How the relay service took a capture.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteAck {
    Stored { filename: String },
    /// Service kept the capture in memory but couldn't write it to its disk.
    MemoryOnly { error: String },
}

/// Outcome of handing one capture off. The two parts are independent, one failing never prevents
/// the other.
#[derive(Debug)]
pub struct RelayReport {
    pub local: Result<PathBuf, CaptureError>,
    pub remote: Result<RemoteAck, CaptureError>,
}

impl RelayReport {
    pub fn is_complete(&self) -> bool {
        matches!(
            (&self.local, &self.remote),
            (Ok(_), Ok(RemoteAck::Stored { .. }))
        )
    }
}

/// Represents the destination of captures taken by the scheduler. This should be able to
/// abstract over different options: local storage, remote server saving.
#[async_trait]
pub trait CaptureRelay: Send + Sync {
    async fn relay(&self, capture: Capture) -> RelayReport;
}
