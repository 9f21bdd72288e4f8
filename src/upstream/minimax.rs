//! MiniMax voice cloning and text-to-speech.

use crate::config::MiniMaxConfig;
use crate::error::{PodcastError, Result};
use crate::pipeline::types::VoiceId;
use crate::upstream::{SpeechSynthesizer, VoiceCloner, send_json};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const CLONE_SERVICE: &str = "MiniMax voice clone";
const TTS_SERVICE: &str = "MiniMax TTS";

/// Status block MiniMax attaches to every response; non-zero means failure
/// even when the HTTP status is 200.
#[derive(Debug, Default, Deserialize)]
struct BaseResp {
    #[serde(default)]
    status_code: i64,
    #[serde(default)]
    status_msg: String,
}

fn check_base_resp(service: &'static str, base_resp: Option<&BaseResp>) -> Result<()> {
    match base_resp {
        Some(resp) if resp.status_code != 0 => Err(PodcastError::upstream(
            service,
            format!("status {}: {}", resp.status_code, resp.status_msg),
        )),
        _ => Ok(()),
    }
}

#[derive(Debug, Serialize)]
struct CloneRequest<'a> {
    voice_id: String,
    audio: String,
    audio_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct CloneResponse {
    #[serde(default)]
    voice_id: Option<String>,
    #[serde(default)]
    base_resp: Option<BaseResp>,
}

/// A successful clone response may leave out `voice_id`; the voice is then
/// registered under the id we asked for.
fn parse_clone_response(response: CloneResponse, requested: String) -> Result<VoiceId> {
    check_base_resp(CLONE_SERVICE, response.base_resp.as_ref())?;
    let id = response
        .voice_id
        .filter(|id| !id.is_empty())
        .unwrap_or(requested);
    Ok(VoiceId::new(id))
}

#[derive(Debug, Serialize)]
struct VoiceSetting<'a> {
    voice_id: &'a str,
    speed: f32,
    vol: f32,
    pitch: i32,
}

#[derive(Debug, Serialize)]
struct AudioSetting<'a> {
    sample_rate: u32,
    bitrate: u32,
    format: &'a str,
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    model: &'a str,
    text: &'a str,
    voice_setting: VoiceSetting<'a>,
    audio_setting: AudioSetting<'a>,
}

#[derive(Debug, Deserialize)]
struct TtsResponse {
    #[serde(default)]
    data: Option<TtsData>,
    #[serde(default)]
    base_resp: Option<BaseResp>,
}

#[derive(Debug, Deserialize)]
struct TtsData {
    #[serde(default)]
    audio: Option<String>,
}

fn parse_tts_response(response: TtsResponse) -> Result<Vec<u8>> {
    check_base_resp(TTS_SERVICE, response.base_resp.as_ref())?;
    let audio_hex = response
        .data
        .and_then(|d| d.audio)
        .filter(|a| !a.is_empty())
        .ok_or_else(|| PodcastError::upstream(TTS_SERVICE, "No audio data in response"))?;
    hex::decode(audio_hex)
        .map_err(|e| PodcastError::upstream(TTS_SERVICE, format!("invalid audio hex: {e}")))
}

/// Fresh id under which MiniMax registers the cloned voice.
fn new_clone_voice_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("clone_{}", &simple[..8])
}

/// Client for the MiniMax clone and synthesis endpoints.
pub struct MiniMaxClient {
    client: reqwest::Client,
    config: MiniMaxConfig,
}

impl MiniMaxClient {
    pub fn new(client: reqwest::Client, config: &MiniMaxConfig) -> Self {
        Self {
            client,
            config: config.clone(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path
        )
    }
}

#[async_trait::async_trait]
impl VoiceCloner for MiniMaxClient {
    async fn clone_voice(&self, sample: &[u8]) -> Result<VoiceId> {
        let requested = new_clone_voice_id();
        let body = CloneRequest {
            voice_id: requested.clone(),
            audio: BASE64.encode(sample),
            audio_format: &self.config.audio_format,
        };

        let request = self
            .client
            .post(self.endpoint("voice_clone"))
            .query(&[("GroupId", self.config.group_id.as_str())])
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .timeout(self.config.clone_timeout());

        let response: CloneResponse = send_json(CLONE_SERVICE, request).await?;
        let voice = parse_clone_response(response, requested)?;
        tracing::debug!(%voice, "voice cloned");
        Ok(voice)
    }
}

#[async_trait::async_trait]
impl SpeechSynthesizer for MiniMaxClient {
    async fn synthesize(&self, text: &str, voice: &VoiceId) -> Result<Vec<u8>> {
        let body = TtsRequest {
            model: &self.config.tts_model,
            text,
            voice_setting: VoiceSetting {
                voice_id: voice.as_str(),
                speed: 1.0,
                vol: 1.0,
                pitch: 0,
            },
            audio_setting: AudioSetting {
                sample_rate: self.config.sample_rate,
                bitrate: self.config.bitrate,
                format: &self.config.audio_format,
            },
        };

        let request = self
            .client
            .post(self.endpoint("t2a_v2"))
            .query(&[("GroupId", self.config.group_id.as_str())])
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .timeout(self.config.tts_timeout());

        let response: TtsResponse = send_json(TTS_SERVICE, request).await?;
        parse_tts_response(response)
    }
}
