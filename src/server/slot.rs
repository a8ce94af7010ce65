use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

/// Contents of the slot. `filename` is only set when the capture made it to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestCapture {
    pub data: Arc<str>,
    pub timestamp: DateTime<Utc>,
    pub filename: Option<String>,
}

/// Holds the most recent capture. Every store replaces the previous value as a whole, readers
/// always see one complete capture and the last store to run wins.
pub struct LatestCaptureSlot {
    cell: watch::Sender<Option<Arc<LatestCapture>>>,
}

impl LatestCaptureSlot {
    pub fn new() -> Self {
        let (cell, _) = watch::channel(None);
        Self { cell }
    }

    pub fn store(&self, capture: LatestCapture) {
        self.cell.send_replace(Some(Arc::new(capture)));
    }

    pub fn latest(&self) -> Option<Arc<LatestCapture>> {
        self.cell.borrow().clone()
    }
}

impl Default for LatestCaptureSlot {
    fn default() -> Self {
        Self::new()
    }
}
