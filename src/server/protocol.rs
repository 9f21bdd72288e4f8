//! JSON bodies of the HTTP endpoints. The Progress Channel messages live in
//! [`crate::pipeline::types`] and are re-exported here.

use serde::{Deserialize, Serialize};

pub use crate::pipeline::types::{GenerateRequest, ProgressEvent};

/// Error message of a failed artifact lookup.
pub const AUDIO_NOT_FOUND: &str = "Audio not found";

/// Body of a successful `GET /audio/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioResponse {
    /// Base64-encoded audio bytes
    pub audio: String,
}

/// Body of any non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: crate::version_string(),
        }
    }
}
