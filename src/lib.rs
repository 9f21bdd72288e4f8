//! weibodcast - Turn a Weibo account into a two-voice podcast
//!
//! Fetches a user's recent posts, has an LLM write a host/guest dialogue about
//! them, clones the guest's voice from a sample and synthesizes the dialogue
//! line by line. Progress streams to the caller over a WebSocket.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "client")]
pub mod client;
pub mod config;
pub mod defaults;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod upstream;

// Collaborator traits (fetch → script → clone → synthesize)
pub use upstream::{ContentFetcher, ScriptGenerator, SpeechSynthesizer, Upstreams, VoiceCloner};

// Pipeline
pub use pipeline::{
    ChannelSink, CollectorSink, Completed, DialogueLine, EventSink, GenerateRequest, Pipeline,
    PipelineConfig, Post, ProgressEvent, Role, VoiceId,
};
pub use store::ArtifactStore;

// Error handling
pub use error::{PodcastError, Result};

// Config
pub use config::Config;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
