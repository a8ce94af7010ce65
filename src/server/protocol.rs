//! JSON bodies exchanged with the relay service. Field names follow the camelCase the web shell
//! expects.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[serde(default)]
    pub base64_image: Option<String>,
}

/// 200 reply of `POST /save-screenshot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
    pub filename: String,
    pub file_path: PathBuf,
}

/// 207 reply of `POST /save-screenshot`. The capture is held in memory only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialSaveResponse {
    pub success: bool,
    pub message: String,
    pub error: String,
    pub timestamp: String,
}

/// 200 reply of `GET /latest-screenshot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestResponse {
    pub success: bool,
    pub data: String,
    pub timestamp: String,
    pub filename: Option<String>,
    pub file_path: Option<PathBuf>,
}

/// 400 reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// 404 and 500 replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}
