//! Default configuration constants for weibodcast.
//!
//! Shared between the configuration types and the upstream adapters so the
//! two never disagree about endpoints, limits, or timeouts.

/// Voice used for every `host` line.
///
/// A stock MiniMax voice; the guest voice is cloned per run.
pub const HOST_VOICE_ID: &str = "male-qn-qingse";

/// Address the server binds to when nothing else is configured.
pub const BIND_ADDR: &str = "0.0.0.0:8000";

/// Most recent posts handed to the script generator.
pub const MAX_POSTS: usize = 10;

/// Weibo web endpoint root.
pub const WEIBO_BASE_URL: &str = "https://weibo.com";

/// Browser user agent sent to Weibo; the ajax API rejects obvious bots.
pub const WEIBO_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// DashScope OpenAI-compatible endpoint.
pub const LLM_BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

/// Chat model used to write the dialogue.
pub const LLM_MODEL: &str = "qwen-max";

/// Sampling temperature for script generation.
pub const LLM_TEMPERATURE: f32 = 0.8;

/// MiniMax API root.
pub const MINIMAX_BASE_URL: &str = "https://api.minimax.chat/v1";

/// MiniMax text-to-speech model.
pub const TTS_MODEL: &str = "speech-01-turbo";

/// Synthesized audio sample rate in Hz.
pub const TTS_SAMPLE_RATE: u32 = 32000;

/// Synthesized audio bitrate in bits per second.
pub const TTS_BITRATE: u32 = 128000;

/// Encoded format for both the clone sample and synthesized speech.
pub const AUDIO_FORMAT: &str = "mp3";

/// Upper bound for the Weibo fetch, in seconds.
pub const FETCH_TIMEOUT_SECS: u64 = 30;

/// Upper bound for one chat completion, in seconds.
pub const SCRIPT_TIMEOUT_SECS: u64 = 120;

/// Upper bound for the voice clone call, in seconds.
pub const CLONE_TIMEOUT_SECS: u64 = 60;

/// Upper bound for synthesizing a single line, in seconds.
pub const TTS_TIMEOUT_SECS: u64 = 120;
