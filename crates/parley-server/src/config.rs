//! Server configuration loading from file and environment variables.

use parley_voice::{ChatConfig, SearchConfig, SynthesisConfig, TranscriptionConfig};
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use thiserror::Error;

/// Top-level server configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-connection scratch storage.
    #[serde(default)]
    pub scratch: ScratchConfig,

    /// Speech-to-text engine.
    #[serde(default)]
    pub transcription: TranscriptionConfig,

    /// Conversational language model.
    #[serde(default)]
    pub chat: ChatConfig,

    /// Search-augmented answer engine (optional).
    #[serde(default)]
    pub search: SearchConfig,

    /// Text-to-speech engine.
    #[serde(default)]
    pub synthesis: SynthesisConfig,
}

/// Network configuration for the HTTP server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory of browser client assets served at `/`.
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "parley_voice=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Where per-connection scratch directories are created.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScratchConfig {
    /// Parent directory. Defaults to the system temp directory.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl ScratchConfig {
    pub fn root(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("static")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required credential was not provided.
    #[error("missing required credential: set {0}")]
    MissingCredential(&'static str),
}

impl Config {
    /// Checks settings that the server cannot run without.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredential` when the transcription or chat
    /// API key is empty. A missing search key is allowed and only disables
    /// search routing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.transcription.api_key.trim().is_empty() || self.chat.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("GROQ_API_KEY"));
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies overrides from the process environment.
///
/// Environment variable overrides:
/// - `PARLEY_HOST` overrides `server.host`
/// - `PORT` or `PARLEY_PORT` overrides `server.port` (`PARLEY_PORT` wins)
/// - `PARLEY_STATIC_DIR` overrides `server.static_dir`
/// - `PARLEY_SCRATCH_DIR` overrides `scratch.dir`
/// - `PARLEY_LOG_LEVEL` overrides `logging.level`
/// - `PARLEY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `GROQ_API_KEY` sets the transcription and chat API keys
/// - `PERPLEXITY_API_KEY` sets the search API key
/// - `PARLEY_TTS_URL` overrides `synthesis.base_url`
/// - `PARLEY_TTS_API_KEY` sets the synthesis API key
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

/// Same as [`load_config`] with an explicit environment lookup.
pub fn load_config_with_env<F>(path: Option<&str>, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    if let Some(host) = env("PARLEY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    for key in ["PORT", "PARLEY_PORT"] {
        if let Some(port) = env(key) {
            if let Ok(parsed) = port.parse() {
                config.server.port = parsed;
            }
        }
    }
    if let Some(dir) = env("PARLEY_STATIC_DIR") {
        config.server.static_dir = PathBuf::from(dir);
    }
    if let Some(dir) = env("PARLEY_SCRATCH_DIR") {
        config.scratch.dir = Some(PathBuf::from(dir));
    }
    if let Some(level) = env("PARLEY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = env("PARLEY_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
    if let Some(key) = env("GROQ_API_KEY") {
        config.transcription.api_key = key.clone();
        config.chat.api_key = key;
    }
    if let Some(key) = env("PERPLEXITY_API_KEY") {
        config.search.api_key = key;
    }
    if let Some(url) = env("PARLEY_TTS_URL") {
        config.synthesis.base_url = url;
    }
    if let Some(key) = env("PARLEY_TTS_API_KEY") {
        config.synthesis.api_key = key;
    }

    Ok(config)
}
