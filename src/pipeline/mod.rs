//! Podcast generation pipeline.
//!
//! A run moves through four remote collaborators in strict sequence and
//! reports progress through an event sink as it goes.

pub mod orchestrator;
pub mod sink;
pub mod types;

pub use orchestrator::{Completed, Pipeline, PipelineConfig, VoiceMap};
pub use sink::{ChannelSink, CollectorSink, EventSink};
pub use types::{DialogueLine, GenerateRequest, Post, ProgressEvent, Role, VoiceId};
