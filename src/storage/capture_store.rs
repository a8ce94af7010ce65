use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use chrono::{DateTime, TimeDelta, Utc};
use tokio::{fs::OpenOptions, io::AsyncWriteExt};
use tracing::debug;

use crate::utils::time::capture_filename;

/// A capture file created by [CaptureStore::create].
#[derive(Debug, Clone, PartialEq)]
pub struct StoredCapture {
    pub timestamp: DateTime<Utc>,
    pub filename: String,
    pub path: PathBuf,
}

/// Directory holding capture files. Shared by the relay client and the relay service, the
/// directory is created lazily on every write so that it can be removed while the process runs.
#[derive(Debug, Clone)]
pub struct CaptureStore {
    capture_dir: PathBuf,
}

impl CaptureStore {
    pub fn new(capture_dir: PathBuf) -> Self {
        Self { capture_dir }
    }

    pub fn dir(&self) -> &Path {
        &self.capture_dir
    }

    pub fn path_for(&self, filename: &str) -> PathBuf {
        self.capture_dir.join(filename)
    }

    /// Creates the capture directory. Concurrent callers may race on creation, an already
    /// existing directory counts as success.
    pub async fn ensure_dir(&self) -> Result<(), std::io::Error> {
        match tokio::fs::create_dir_all(&self.capture_dir).await {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists && self.capture_dir.is_dir() => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Writes capture bytes into `filename`, replacing a file with the same name.
    pub async fn write(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf, std::io::Error> {
        self.ensure_dir().await?;
        let path = self.path_for(filename);
        tokio::fs::write(&path, bytes).await?;
        debug!("Wrote {} bytes to {path:?}", bytes.len());
        Ok(path)
    }

    /// Writes capture bytes into a new file named after `timestamp`. Existing files are never
    /// replaced: while the name is taken the timestamp moves forward by one millisecond.
    pub async fn create(
        &self,
        mut timestamp: DateTime<Utc>,
        bytes: &[u8],
    ) -> Result<StoredCapture, std::io::Error> {
        self.ensure_dir().await?;
        loop {
            let filename = capture_filename(timestamp);
            let path = self.path_for(&filename);
            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{filename} is taken, moving to the next millisecond");
                    timestamp += TimeDelta::milliseconds(1);
                    continue;
                }
                Err(e) => return Err(e),
            };
            file.write_all(bytes).await?;
            file.flush().await?;
            debug!("Created {path:?} with {} bytes", bytes.len());
            return Ok(StoredCapture {
                timestamp,
                filename,
                path,
            });
        }
    }
}
