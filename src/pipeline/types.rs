//! Data types flowing through the podcast pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single post from the content source, already stripped of markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    pub created_at: String,
}

impl Post {
    /// Creates a new post.
    pub fn new(
        id: impl Into<String>,
        text: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            created_at: created_at.into(),
        }
    }
}

/// Speaker of a dialogue line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Guest,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Host => "host",
            Role::Guest => "guest",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the podcast script. The order of lines is the playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub role: Role,
    pub text: String,
}

impl DialogueLine {
    pub fn host(text: impl Into<String>) -> Self {
        Self {
            role: Role::Host,
            text: text.into(),
        }
    }

    pub fn guest(text: impl Into<String>) -> Self {
        Self {
            role: Role::Guest,
            text: text.into(),
        }
    }
}

/// Opaque identifier of a synthesizer voice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceId(String);

impl VoiceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The single message that starts a run.
///
/// Fields are optional on the wire so that a missing field becomes an
/// `error` event instead of a parse failure. The older field names
/// `weibo_id` / `audio` are accepted as aliases, and the user id may arrive
/// as a JSON number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(
        default,
        alias = "weibo_id",
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    /// Base64-encoded audio sample of the guest's voice
    #[serde(default, alias = "audio", skip_serializing_if = "Option::is_none")]
    pub audio_sample: Option<String>,
}

impl GenerateRequest {
    pub fn new(user_id: impl Into<String>, audio_sample: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            audio_sample: Some(audio_sample.into()),
        }
    }

    /// Serialize request to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize request from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    use serde_json::Value;

    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number for userId, got {other}"
        ))),
    }
}

/// Event pushed to the observer of a run.
///
/// Serialized with a `kind` tag: `{"kind":"log","message":..}`,
/// `{"kind":"error","message":..}` or
/// `{"kind":"complete","audioId":..,"script":[..]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    /// Human-readable progress message
    Log { message: String },
    /// Run aborted; no artifact was stored
    Error { message: String },
    /// Run finished; audio is retrievable under `audio_id`
    Complete {
        #[serde(rename = "audioId")]
        audio_id: String,
        script: Vec<DialogueLine>,
    },
}

impl ProgressEvent {
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log {
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// True for `error` and `complete`; nothing follows a terminal event.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Log { .. })
    }

    /// Serialize event to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize event from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
