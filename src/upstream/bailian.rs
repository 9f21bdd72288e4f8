//! Script generator backed by an OpenAI-compatible chat completions endpoint
//! (DashScope "Bailian" by default).

use crate::config::LlmConfig;
use crate::error::{PodcastError, Result};
use crate::pipeline::types::{DialogueLine, Post, Role};
use crate::upstream::{ScriptGenerator, send_json};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "LLM";

const HOST_PREFIX: &str = "HOST:";
const GUEST_PREFIX: &str = "GUEST:";

/// Instructions that pin the model to the line-prefixed transcript format.
pub const SYSTEM_PROMPT: &str = "\
You are a professional podcast script writer. From the social media posts provided, \
write a two-person podcast dialogue.

Requirements:
1. The host (HOST) introduces topics, asks questions and wraps up.
2. The guest (GUEST) is the author of the posts and shares views and insights.
3. The conversation should feel natural and interactive.
4. Keep each turn to two or three sentences.
5. Write in the same language as the posts.

Output format (follow strictly):
HOST: what the host says
GUEST: what the guest says
HOST: what the host says
...

Output only the script, nothing else.";

/// Parse a `HOST:` / `GUEST:` transcript into dialogue lines.
///
/// Lines are trimmed before matching; anything without one of the two
/// prefixes is dropped.
pub fn parse_script(raw: &str) -> Vec<DialogueLine> {
    let mut lines = Vec::new();
    for line in raw.trim().lines() {
        let line = line.trim();
        if let Some(text) = line.strip_prefix(HOST_PREFIX) {
            lines.push(DialogueLine {
                role: Role::Host,
                text: text.trim().to_string(),
            });
        } else if let Some(text) = line.strip_prefix(GUEST_PREFIX) {
            lines.push(DialogueLine {
                role: Role::Guest,
                text: text.trim().to_string(),
            });
        } else if !line.is_empty() {
            tracing::debug!(line, "dropping unrecognized script line");
        }
    }
    lines
}

/// User message listing the posts, numbered from 1.
pub fn build_user_prompt(posts: &[Post]) -> String {
    let content = posts
        .iter()
        .enumerate()
        .map(|(i, p)| format!("Post {}: {}", i + 1, p.text))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("Write a podcast script based on these posts:\n\n{content}")
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

fn completion_text(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| PodcastError::upstream(SERVICE, "response contained no message content"))
}

/// Writes the dialogue with a chat completion request.
pub struct BailianScriptGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl BailianScriptGenerator {
    pub fn new(client: reqwest::Client, config: &LlmConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            timeout: config.timeout(),
        }
    }
}

#[async_trait::async_trait]
impl ScriptGenerator for BailianScriptGenerator {
    async fn generate_script(&self, posts: &[Post]) -> Result<Vec<DialogueLine>> {
        let user_prompt = build_user_prompt(posts);
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            temperature: self.temperature,
        };

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout);

        let response: ChatResponse = send_json(SERVICE, request).await?;
        let raw = completion_text(response)?;
        let script = parse_script(&raw);
        tracing::debug!(lines = script.len(), "parsed script");
        Ok(script)
    }
}
