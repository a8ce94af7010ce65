//! Error types for the two boundaries of the application. Everything else uses [anyhow].

use thiserror::Error;

/// Failures of a single capture cycle. None of these stop the scheduler.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("screen capture failed: {0}")]
    Capture(String),
    #[error("failed to persist capture: {0}")]
    Persistence(#[from] std::io::Error),
    #[error("failed to reach relay service: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for CaptureError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_timeout() {
            CaptureError::Transport(format!("request timed out: {value}"))
        } else {
            CaptureError::Transport(value.to_string())
        }
    }
}

/// Failures reported by the relay service to its callers. Anything unexpected surfaces as a
/// rejection and is answered with 500 by the route layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
}
