//! Scriptable in-memory collaborators for tests and offline runs.

use crate::error::{PodcastError, Result};
use crate::pipeline::types::{DialogueLine, Post, VoiceId};
use crate::upstream::bailian::parse_script;
use crate::upstream::{ContentFetcher, ScriptGenerator, SpeechSynthesizer, VoiceCloner};
use std::sync::Mutex;

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock content fetcher returning a fixed post list
#[derive(Debug, Default)]
pub struct MockFetcher {
    posts: Vec<Post>,
    failure: Option<String>,
    calls: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            posts,
            ..Default::default()
        }
    }

    /// Configure the mock to fail with `message`
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// User ids requested so far
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

#[async_trait::async_trait]
impl ContentFetcher for MockFetcher {
    async fn fetch_posts(&self, user_id: &str) -> Result<Vec<Post>> {
        lock(&self.calls).push(user_id.to_string());
        match &self.failure {
            Some(message) => Err(PodcastError::upstream("Weibo", message)),
            None => Ok(self.posts.clone()),
        }
    }
}

/// Mock script generator returning a fixed script
#[derive(Debug, Default)]
pub struct MockGenerator {
    script: Vec<DialogueLine>,
    failure: Option<String>,
    calls: Mutex<usize>,
}

impl MockGenerator {
    pub fn new(script: Vec<DialogueLine>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    /// Build the script by parsing a raw `HOST:` / `GUEST:` transcript
    pub fn from_transcript(raw: &str) -> Self {
        Self::new(parse_script(raw))
    }

    /// Configure the mock to fail with `message`
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait::async_trait]
impl ScriptGenerator for MockGenerator {
    async fn generate_script(&self, _posts: &[Post]) -> Result<Vec<DialogueLine>> {
        *lock(&self.calls) += 1;
        match &self.failure {
            Some(message) => Err(PodcastError::upstream("LLM", message)),
            None => Ok(self.script.clone()),
        }
    }
}

/// Mock voice cloner returning a fixed voice id
#[derive(Debug)]
pub struct MockCloner {
    voice: VoiceId,
    failure: Option<String>,
    samples: Mutex<Vec<Vec<u8>>>,
}

impl MockCloner {
    pub fn new(voice: &str) -> Self {
        Self {
            voice: VoiceId::new(voice),
            failure: None,
            samples: Mutex::new(Vec::new()),
        }
    }

    /// Configure the mock to fail with `message`
    pub fn with_failure(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Decoded samples received so far
    pub fn samples(&self) -> Vec<Vec<u8>> {
        lock(&self.samples).clone()
    }
}

#[async_trait::async_trait]
impl VoiceCloner for MockCloner {
    async fn clone_voice(&self, sample: &[u8]) -> Result<VoiceId> {
        lock(&self.samples).push(sample.to_vec());
        match &self.failure {
            Some(message) => Err(PodcastError::upstream("MiniMax voice clone", message)),
            None => Ok(self.voice.clone()),
        }
    }
}

/// Mock synthesizer producing `[voice:text]` as the audio bytes of each line
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    fail_at: Option<usize>,
    calls: Mutex<Vec<(String, VoiceId)>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the call with this zero-based index
    pub fn with_failure_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Audio the mock produces for one line
    pub fn chunk_for(text: &str, voice: &VoiceId) -> Vec<u8> {
        format!("[{voice}:{text}]").into_bytes()
    }

    /// `(text, voice)` pairs in call order
    pub fn calls(&self) -> Vec<(String, VoiceId)> {
        lock(&self.calls).clone()
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, voice: &VoiceId) -> Result<Vec<u8>> {
        let index = {
            let mut calls = lock(&self.calls);
            calls.push((text.to_string(), voice.clone()));
            calls.len() - 1
        };
        if self.fail_at == Some(index) {
            return Err(PodcastError::upstream("MiniMax TTS", "mock synthesis failure"));
        }
        Ok(Self::chunk_for(text, voice))
    }
}
