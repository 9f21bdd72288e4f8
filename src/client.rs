//! Client for a remote weibodcast server.
//!
//! Drives one run over the Progress Channel and downloads the finished audio.

use crate::error::{PodcastError, Result};
use crate::pipeline::Completed;
use crate::server::protocol::{AudioResponse, ErrorResponse, GenerateRequest, ProgressEvent};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures_util::{SinkExt, StreamExt};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Connection details of a remote server.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    base_url: String,
    http: reqwest::Client,
}

impl RemoteClient {
    /// Create a client for `base_url` (`http://host:port` or `https://...`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(PodcastError::Protocol {
                message: format!("server URL must start with http:// or https://: {base_url}"),
            });
        }
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| PodcastError::Other(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { base_url, http })
    }

    /// WebSocket URL of the Progress Channel.
    pub fn ws_url(&self) -> String {
        let rest = self
            .base_url
            .strip_prefix("https://")
            .map(|rest| format!("wss://{rest}"))
            .or_else(|| {
                self.base_url
                    .strip_prefix("http://")
                    .map(|rest| format!("ws://{rest}"))
            })
            .unwrap_or_else(|| self.base_url.clone());
        format!("{rest}/ws/generate")
    }

    /// Start a run and feed every progress event to `on_event` until the
    /// terminal one.
    ///
    /// An `error` event becomes [`PodcastError::RunFailed`].
    pub async fn generate<F>(&self, request: &GenerateRequest, mut on_event: F) -> Result<Completed>
    where
        F: FnMut(&ProgressEvent),
    {
        let url = self.ws_url();
        let (mut stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| PodcastError::Protocol {
                message: format!("Failed to connect to {url}: {e}"),
            })?;

        let payload = request.to_json().map_err(|e| PodcastError::Protocol {
            message: format!("Failed to serialize request: {e}"),
        })?;
        stream
            .send(Message::text(payload))
            .await
            .map_err(|e| PodcastError::Protocol {
                message: format!("Failed to send request: {e}"),
            })?;

        while let Some(message) = stream.next().await {
            let message = message.map_err(|e| PodcastError::Protocol {
                message: format!("Connection error: {e}"),
            })?;
            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => break,
                _ => continue,
            };

            let event =
                ProgressEvent::from_json(text.as_str()).map_err(|e| PodcastError::Protocol {
                    message: format!("Invalid progress event: {e}"),
                })?;
            on_event(&event);

            match event {
                ProgressEvent::Log { .. } => {}
                ProgressEvent::Error { message } => {
                    return Err(PodcastError::RunFailed { message });
                }
                ProgressEvent::Complete { audio_id, script } => {
                    if let Err(e) = stream.close(None).await {
                        tracing::debug!(error = %e, "websocket close failed");
                    }
                    return Ok(Completed { audio_id, script });
                }
            }
        }

        Err(PodcastError::Protocol {
            message: "Connection closed before the run finished".to_string(),
        })
    }

    /// Download the audio stored under `audio_id`.
    pub async fn fetch_audio(&self, audio_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/audio/{}", self.base_url, audio_id);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PodcastError::Protocol {
                message: format!("Failed to fetch {url}: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            return Err(PodcastError::Server {
                message: format!("HTTP {status}: {reason}"),
            });
        }

        let body: AudioResponse = response.json().await.map_err(|e| PodcastError::Protocol {
            message: format!("Invalid audio response: {e}"),
        })?;
        BASE64
            .decode(body.audio)
            .map_err(|e| PodcastError::Protocol {
                message: format!("Invalid audio encoding: {e}"),
            })
    }
}
