//! Error types for weibodcast.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodcastError {
    // Configuration errors
    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Input validation errors
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Invalid audio sample: {message}")]
    InvalidAudioSample { message: String },

    // An upstream stage returned well-formed but empty data
    #[error("{what}")]
    EmptyResult { what: String },

    // Remote collaborator failures (transport, auth, parsing)
    #[error("{service} call failed: {message}")]
    Upstream {
        service: &'static str,
        message: String,
    },

    // Progress channel / wire errors
    #[error("Protocol error: {message}")]
    Protocol { message: String },

    #[error("Server error: {message}")]
    Server { message: String },

    // Terminal error reported by a remote run
    #[error("Podcast generation failed: {message}")]
    RunFailed { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

impl PodcastError {
    /// Build an upstream failure for `service` from any displayable error.
    pub fn upstream(service: &'static str, message: impl std::fmt::Display) -> Self {
        Self::Upstream {
            service,
            message: message.to_string(),
        }
    }
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, PodcastError>;
