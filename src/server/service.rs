use std::{path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

use crate::{
    error::ServiceError,
    storage::{
        capture_store::{CaptureStore, StoredCapture},
        encoding::decode_payload,
    },
    utils::clock::Clock,
};

use super::slot::{LatestCapture, LatestCaptureSlot};

/// Result of a save that was accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Written to disk and held in memory.
    Persisted {
        timestamp: DateTime<Utc>,
        filename: String,
        path: PathBuf,
    },
    /// Disk write failed, the capture is only held in memory.
    MemoryOnly {
        timestamp: DateTime<Utc>,
        error: String,
    },
}

/// What `latest` hands out. `path` is absent for captures that never reached disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LatestView {
    pub capture: Arc<LatestCapture>,
    pub path: Option<PathBuf>,
}

/// Core of the relay service, free of any HTTP concerns.
pub struct RelayService {
    store: CaptureStore,
    slot: LatestCaptureSlot,
    clock: Box<dyn Clock>,
}

impl RelayService {
    pub fn new(store: CaptureStore, clock: Box<dyn Clock>) -> Self {
        Self {
            store,
            slot: LatestCaptureSlot::new(),
            clock,
        }
    }

    pub fn store(&self) -> &CaptureStore {
        &self.store
    }

    /// Accepts a payload that is plain base64 or a data URL. Losing disk persistence never loses
    /// the capture, it is still kept as the latest one.
    pub async fn save(&self, base64_image: Option<String>) -> Result<SaveOutcome, ServiceError> {
        let payload = match base64_image {
            Some(v) if !v.trim().is_empty() => v,
            _ => return Err(ServiceError::Validation("No image data provided".into())),
        };

        let bytes = decode_payload(&payload).map_err(|e| {
            warn!("Rejected payload that isn't base64: {e}");
            ServiceError::Validation(format!("Image data is not valid base64: {e}"))
        })?;

        let timestamp = self.clock.time();

        match self.store.create(timestamp, &bytes).await {
            Ok(StoredCapture {
                timestamp,
                filename,
                path,
            }) => {
                self.slot.store(LatestCapture {
                    data: payload.into(),
                    timestamp,
                    filename: Some(filename.clone()),
                });
                info!("Saved capture {filename} ({} bytes)", bytes.len());
                Ok(SaveOutcome::Persisted {
                    timestamp,
                    filename,
                    path,
                })
            }
            Err(e) => {
                error!("Error saving capture taken at {timestamp}: {e:?}");
                self.slot.store(LatestCapture {
                    data: payload.into(),
                    timestamp,
                    filename: None,
                });
                Ok(SaveOutcome::MemoryOnly {
                    timestamp,
                    error: e.to_string(),
                })
            }
        }
    }

    pub fn latest(&self) -> Result<LatestView, ServiceError> {
        let capture = self
            .slot
            .latest()
            .ok_or_else(|| ServiceError::NotFound("No screenshots found in memory".into()))?;
        let path = capture
            .filename
            .as_deref()
            .map(|filename| self.store.path_for(filename));
        Ok(LatestView { capture, path })
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use tempfile::{tempdir, NamedTempFile};

    use crate::{
        error::ServiceError,
        storage::{
            capture_store::CaptureStore,
            encoding::{decode_payload, to_png_data_url},
        },
        utils::clock::TestClock,
    };

    use super::{RelayService, SaveOutcome};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn test_start() -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE)
    }

    fn service(store: CaptureStore) -> RelayService {
        RelayService::new(store, Box::new(TestClock::starting_at(test_start())))
    }

    #[tokio::test(start_paused = true)]
    async fn test_save_persists_and_updates_latest() -> Result<()> {
        let dir = tempdir()?;
        let service = service(CaptureStore::new(dir.path().join("captures")));
        let payload = to_png_data_url(b"first capture");

        let outcome = service.save(Some(payload.clone())).await?;

        let expected_name = format!("screenshot_{}.png", test_start().timestamp_millis());
        let SaveOutcome::Persisted { filename, path, .. } = outcome else {
            panic!("expected a persisted capture, got {outcome:?}");
        };
        assert_eq!(filename, expected_name);
        assert_eq!(tokio::fs::read(&path).await?, b"first capture");

        let latest = service.latest()?;
        assert_eq!(&*latest.capture.data, payload);
        assert_eq!(latest.path, Some(path));
        Ok(())
    }

    #[tokio::test]
    async fn test_save_without_payload_is_rejected() {
        let dir = tempdir().unwrap();
        let service = service(CaptureStore::new(dir.path().to_path_buf()));

        assert!(matches!(
            service.save(None).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            service.save(Some(String::new())).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(service.latest(), Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_save_with_invalid_base64_leaves_slot_untouched() {
        let dir = tempdir().unwrap();
        let service = service(CaptureStore::new(dir.path().to_path_buf()));

        assert!(matches!(
            service.save(Some("data:image/png;base64,%%%".into())).await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(service.latest(), Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_disk_failure_keeps_capture_in_memory() -> Result<()> {
        let blocker = NamedTempFile::new()?;
        let service = service(CaptureStore::new(blocker.path().join("captures")));
        let payload = to_png_data_url(b"kept in memory");

        let outcome = service.save(Some(payload.clone())).await?;
        assert!(matches!(outcome, SaveOutcome::MemoryOnly { .. }));

        let latest = service.latest()?;
        assert_eq!(&*latest.capture.data, payload);
        assert_eq!(latest.capture.filename, None);
        assert_eq!(latest.path, None);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_save_wins() -> Result<()> {
        let dir = tempdir()?;
        let service = service(CaptureStore::new(dir.path().to_path_buf()));

        service.save(Some(to_png_data_url(b"a"))).await?;
        service.save(Some(to_png_data_url(b"b"))).await?;

        assert_eq!(&*service.latest()?.capture.data, to_png_data_url(b"b"));
        let files = std::fs::read_dir(dir.path())?.count();
        assert_eq!(files, 2);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_saves_in_same_millisecond_keep_their_own_files() -> Result<()> {
        let dir = tempdir()?;
        let service = service(CaptureStore::new(dir.path().to_path_buf()));
        let first = to_png_data_url(b"capture A");
        let second = to_png_data_url(b"capture B");

        // Time is paused, both saves see the same clock reading.
        let (a, b) = tokio::join!(
            service.save(Some(first.clone())),
            service.save(Some(second.clone()))
        );
        let (
            SaveOutcome::Persisted {
                filename: a_name,
                path: a_path,
                ..
            },
            SaveOutcome::Persisted {
                filename: b_name,
                path: b_path,
                ..
            },
        ) = (a?, b?)
        else {
            panic!("expected both captures to be persisted");
        };

        assert_ne!(a_name, b_name);
        assert_eq!(std::fs::read_dir(dir.path())?.count(), 2);
        assert_eq!(tokio::fs::read(&a_path).await?, b"capture A");
        assert_eq!(tokio::fs::read(&b_path).await?, b"capture B");

        let latest = service.latest()?;
        let path = latest.path.expect("latest capture should be on disk");
        assert_eq!(
            tokio::fs::read(&path).await?,
            decode_payload(&latest.capture.data)?
        );
        Ok(())
    }
}
