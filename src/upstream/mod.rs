//! Remote collaborators of the pipeline.
//!
//! Each trait is a single request/response call. Implementations do not retry
//! or cache, and every failure surfaces as [`PodcastError::Upstream`].

pub mod bailian;
pub mod minimax;
pub mod mock;
pub mod weibo;

use crate::config::Config;
use crate::error::{PodcastError, Result};
use crate::pipeline::types::{DialogueLine, Post, VoiceId};
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub use bailian::BailianScriptGenerator;
pub use minimax::MiniMaxClient;
pub use mock::{MockCloner, MockFetcher, MockGenerator, MockSynthesizer};
pub use weibo::WeiboFetcher;

/// Fetches a user's recent posts, newest first, markup already stripped.
#[async_trait::async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch_posts(&self, user_id: &str) -> Result<Vec<Post>>;
}

/// Turns posts into an ordered host/guest dialogue.
#[async_trait::async_trait]
pub trait ScriptGenerator: Send + Sync {
    async fn generate_script(&self, posts: &[Post]) -> Result<Vec<DialogueLine>>;
}

/// Clones a voice from a raw audio sample.
#[async_trait::async_trait]
pub trait VoiceCloner: Send + Sync {
    async fn clone_voice(&self, sample: &[u8]) -> Result<VoiceId>;
}

/// Synthesizes one line of text with the given voice.
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str, voice: &VoiceId) -> Result<Vec<u8>>;
}

/// The four collaborators a pipeline run calls, in call order.
#[derive(Clone)]
pub struct Upstreams {
    pub fetcher: Arc<dyn ContentFetcher>,
    pub generator: Arc<dyn ScriptGenerator>,
    pub cloner: Arc<dyn VoiceCloner>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
}

impl Upstreams {
    /// Build the real HTTP-backed collaborators sharing one connection pool.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| PodcastError::Other(format!("Failed to build HTTP client: {e}")))?;

        let minimax = Arc::new(MiniMaxClient::new(client.clone(), &config.minimax));
        Ok(Self {
            fetcher: Arc::new(WeiboFetcher::new(client.clone(), &config.weibo)),
            generator: Arc::new(BailianScriptGenerator::new(client, &config.llm)),
            cloner: minimax.clone(),
            synthesizer: minimax,
        })
    }
}

/// Send a prepared request and decode a JSON body, mapping every failure to
/// an upstream error for `service`.
pub(crate) async fn send_json<T: DeserializeOwned>(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let response = request
        .send()
        .await
        .map_err(|e| PodcastError::upstream(service, format!("request failed: {e}")))?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| PodcastError::upstream(service, format!("failed to read response: {e}")))?;

    if !status.is_success() {
        return Err(PodcastError::upstream(
            service,
            format!("HTTP {status}: {}", truncate(&text, 200)),
        ));
    }

    serde_json::from_str(&text)
        .map_err(|e| PodcastError::upstream(service, format!("invalid response: {e}")))
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
