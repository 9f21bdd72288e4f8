use crate::defaults;
use crate::error::{PodcastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub weibo: WeiboConfig,
    pub llm: LlmConfig,
    pub minimax: MiniMaxConfig,
}

/// HTTP / WebSocket server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    /// Allow cross-origin requests from any origin
    pub cors: bool,
}

/// Content fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WeiboConfig {
    pub base_url: String,
    pub cookie: String,
    pub max_posts: usize,
    pub timeout_secs: u64,
}

/// Script generator configuration (OpenAI-compatible chat endpoint)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_secs: u64,
}

/// Voice clone and speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MiniMaxConfig {
    pub base_url: String,
    pub api_key: String,
    pub group_id: String,
    pub host_voice_id: String,
    pub tts_model: String,
    pub sample_rate: u32,
    pub bitrate: u32,
    pub audio_format: String,
    pub clone_timeout_secs: u64,
    pub tts_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::BIND_ADDR.to_string(),
            cors: true,
        }
    }
}

impl Default for WeiboConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::WEIBO_BASE_URL.to_string(),
            cookie: String::new(),
            max_posts: defaults::MAX_POSTS,
            timeout_secs: defaults::FETCH_TIMEOUT_SECS,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::LLM_BASE_URL.to_string(),
            api_key: String::new(),
            model: defaults::LLM_MODEL.to_string(),
            temperature: defaults::LLM_TEMPERATURE,
            timeout_secs: defaults::SCRIPT_TIMEOUT_SECS,
        }
    }
}

impl Default for MiniMaxConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::MINIMAX_BASE_URL.to_string(),
            api_key: String::new(),
            group_id: String::new(),
            host_voice_id: defaults::HOST_VOICE_ID.to_string(),
            tts_model: defaults::TTS_MODEL.to_string(),
            sample_rate: defaults::TTS_SAMPLE_RATE,
            bitrate: defaults::TTS_BITRATE,
            audio_format: defaults::AUDIO_FORMAT.to_string(),
            clone_timeout_secs: defaults::CLONE_TIMEOUT_SECS,
            tts_timeout_secs: defaults::TTS_TIMEOUT_SECS,
        }
    }
}

impl WeiboConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl MiniMaxConfig {
    pub fn clone_timeout(&self) -> Duration {
        Duration::from_secs(self.clone_timeout_secs)
    }

    pub fn tts_timeout(&self) -> Duration {
        Duration::from_secs(self.tts_timeout_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only falls back to defaults if the file is missing.
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(PodcastError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok(Self::default())
            }
            Err(e) => Err(PodcastError::ConfigParse {
                message: format!("{}: {}", path.display(), e),
            }),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - DASHSCOPE_API_KEY → llm.api_key
    /// - MINIMAX_API_KEY → minimax.api_key
    /// - MINIMAX_GROUP_ID → minimax.group_id
    /// - WEIBO_COOKIE → weibo.cookie
    /// - WEIBODCAST_BIND → server.bind
    pub fn with_env_overrides(mut self) -> Self {
        let overrides: [(&str, &mut String); 5] = [
            ("DASHSCOPE_API_KEY", &mut self.llm.api_key),
            ("MINIMAX_API_KEY", &mut self.minimax.api_key),
            ("MINIMAX_GROUP_ID", &mut self.minimax.group_id),
            ("WEIBO_COOKIE", &mut self.weibo.cookie),
            ("WEIBODCAST_BIND", &mut self.server.bind),
        ];

        for (var, slot) in overrides {
            if let Ok(value) = std::env::var(var)
                && !value.is_empty()
            {
                *slot = value;
            }
        }

        self
    }

    /// Reject values that would make every run fail in a confusing way.
    pub fn validate(&self) -> Result<()> {
        if self.server.bind.parse::<SocketAddr>().is_err() {
            return Err(invalid("server.bind", "expected host:port"));
        }
        if self.weibo.max_posts == 0 || self.weibo.max_posts > defaults::MAX_POSTS {
            return Err(invalid(
                "weibo.max_posts",
                &format!("must be between 1 and {}", defaults::MAX_POSTS),
            ));
        }
        let timeouts = [
            ("weibo.timeout_secs", self.weibo.timeout_secs),
            ("llm.timeout_secs", self.llm.timeout_secs),
            ("minimax.clone_timeout_secs", self.minimax.clone_timeout_secs),
            ("minimax.tts_timeout_secs", self.minimax.tts_timeout_secs),
        ];
        for (key, secs) in timeouts {
            if secs == 0 {
                return Err(invalid(key, "must be positive"));
            }
        }
        if self.minimax.host_voice_id.trim().is_empty() {
            return Err(invalid("minimax.host_voice_id", "must not be empty"));
        }
        Ok(())
    }

    /// Names of credentials that are still empty after overrides.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.llm.api_key.is_empty() {
            missing.push("llm.api_key");
        }
        if self.minimax.api_key.is_empty() {
            missing.push("minimax.api_key");
        }
        if self.minimax.group_id.is_empty() {
            missing.push("minimax.group_id");
        }
        if self.weibo.cookie.is_empty() {
            missing.push("weibo.cookie");
        }
        missing
    }

    /// Look up a value by dotted path (e.g. `minimax.tts_model`).
    pub fn get_value_by_path(&self, key: &str) -> Result<String> {
        let root = toml::Value::try_from(self).map_err(|e| PodcastError::ConfigParse {
            message: e.to_string(),
        })?;

        let mut current = &root;
        for part in key.split('.') {
            current = current
                .get(part)
                .ok_or_else(|| invalid(key, "unknown configuration key"))?;
        }

        Ok(match current {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    /// Render one top-level section (e.g. `minimax`) as TOML.
    pub fn display_section(&self, section: &str) -> Result<String> {
        let root = toml::Value::try_from(self).map_err(|e| PodcastError::ConfigParse {
            message: e.to_string(),
        })?;
        let table = root
            .get(section)
            .and_then(toml::Value::as_table)
            .ok_or_else(|| invalid(section, "unknown configuration section"))?;
        let body = toml::to_string_pretty(table).map_err(|e| PodcastError::ConfigParse {
            message: e.to_string(),
        })?;
        Ok(format!("[{section}]\n{body}"))
    }

    /// Serialize the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PodcastError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/weibodcast/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("weibodcast")
            .join("config.toml")
    }
}

fn invalid(key: &str, message: &str) -> PodcastError {
    PodcastError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    }
}

/// Commented configuration template for `weibodcast config dump`.
pub const CONFIG_TEMPLATE: &str = r#"# weibodcast configuration

[server]
# Address for the HTTP + WebSocket server (env: WEIBODCAST_BIND)
bind = "0.0.0.0:8000"
# Allow browser clients on any origin
cors = true

[weibo]
base_url = "https://weibo.com"
# Logged-in weibo.com cookie (env: WEIBO_COOKIE)
cookie = ""
max_posts = 10
timeout_secs = 30

[llm]
# Any OpenAI-compatible chat completions endpoint
base_url = "https://dashscope.aliyuncs.com/compatible-mode/v1"
# env: DASHSCOPE_API_KEY
api_key = ""
model = "qwen-max"
temperature = 0.8
timeout_secs = 120

[minimax]
base_url = "https://api.minimax.chat/v1"
# env: MINIMAX_API_KEY / MINIMAX_GROUP_ID
api_key = ""
group_id = ""
# Stock voice for the host; the guest voice is cloned per run
host_voice_id = "male-qn-qingse"
tts_model = "speech-01-turbo"
sample_rate = 32000
bitrate = 128000
audio_format = "mp3"
clone_timeout_secs = 60
tts_timeout_secs = 120
"#;
