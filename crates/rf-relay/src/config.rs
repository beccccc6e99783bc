use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

const DEFAULT_DIRECT_URL: &str = "https://api.veo3.com/v1/generate-preview";
const DEFAULT_OPERATION_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "veo-3.0-generate-preview";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
    #[error("RELAY_MODE must be 'direct' or 'operation', got {0:?}")]
    UnknownMode(String),
    #[error("VIDEO_API_KEY is required when RELAY_MODE=operation")]
    MissingApiKey,
    #[error("VIDEO_API_URL is not a valid URL: {0:?}")]
    InvalidUrl(String),
}

/// How the relay talks to the video service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// One blocking call that returns the finished video.
    Direct,
    /// Start a long-running operation and poll it.
    Operation,
}

impl FromStr for RelayMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" | "sync" => Ok(Self::Direct),
            "operation" | "poll" | "polling" => Ok(Self::Operation),
            other => Err(ConfigError::UnknownMode(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub mode: RelayMode,
    pub api_url: Url,
    pub api_key: Option<String>,
    pub model: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub max_polls: u32,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub port: u16,
    pub upload_dir: PathBuf,
    pub upstream: UpstreamConfig,
}

impl RelayConfig {
    /// Reads `.env` (when present) and then the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => debug!("Loaded environment from {}", path.display()),
            Err(e) => debug!("No .env loaded: {e}"),
        }

        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mode = match var("RELAY_MODE") {
            Some(raw) => raw.parse()?,
            None => RelayMode::Direct,
        };

        let api_key = var("VIDEO_API_KEY");
        if mode == RelayMode::Operation && api_key.is_none() {
            return Err(ConfigError::MissingApiKey);
        }

        let raw_url = var("VIDEO_API_URL").unwrap_or_else(|| {
            match mode {
                RelayMode::Direct => DEFAULT_DIRECT_URL,
                RelayMode::Operation => DEFAULT_OPERATION_URL,
            }
            .to_string()
        });
        let api_url = Url::parse(&raw_url).map_err(|_| ConfigError::InvalidUrl(raw_url.clone()))?;

        Ok(Self {
            port: parse_number("PORT", var("PORT"), 5000)?,
            upload_dir: var("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("uploads")),
            upstream: UpstreamConfig {
                mode,
                api_url,
                api_key,
                model: var("VIDEO_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
                request_timeout: Duration::from_secs(parse_number(
                    "VIDEO_REQUEST_TIMEOUT_SECS",
                    var("VIDEO_REQUEST_TIMEOUT_SECS"),
                    120,
                )?),
                poll_interval: Duration::from_secs(parse_number("POLL_INTERVAL_SECS", var("POLL_INTERVAL_SECS"), 10)?),
                max_polls: parse_number("MAX_POLLS", var("MAX_POLLS"), 20)?,
            },
        })
    }
}

fn parse_number<T: FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value.parse().map_err(|_| ConfigError::NotANumber { name, value }),
        None => Ok(default),
    }
}
