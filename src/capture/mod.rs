//! Contains logic for taking screenshots in different environments.
//! [ScreenCapturer] is the contract, [command::CommandCapturer] is the implementation used by the
//! daemon.

pub mod command;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use crate::{error::CaptureError, utils::time::capture_filename};

/// One still image of the screen. Bytes are PNG encoded and never modified after capture.
#[derive(Debug, Clone, PartialEq)]
pub struct Capture {
    bytes: Vec<u8>,
    captured_at: DateTime<Utc>,
}

impl Capture {
    pub fn new(bytes: Vec<u8>, captured_at: DateTime<Utc>) -> Self {
        Self { bytes, captured_at }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// For example `screenshot_1530698400000.png`
    pub fn filename(&self) -> String {
        capture_filename(self.captured_at)
    }
}

/// Platform screen capture primitive.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ScreenCapturer: Send + Sync {
    /// Returns the PNG encoded contents of the screen.
    async fn capture(&self) -> Result<Vec<u8>, CaptureError>;
}
