//! 运行配置 — 从环境变量加载凭据、模型与超时设置
//!
//! Relay configuration loaded from the process environment.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `GEMINI_API_KEY` (fallback `GOOGLE_API_KEY`) | required |
//! | `GEMINI_MODEL` | `gemini-2.5-flash` |
//! | `GEMINI_BASE_URL` | `https://generativelanguage.googleapis.com` |
//! | `GEMINI_HTTP_TIMEOUT_SECS` | 120 |
//! | `GEMINI_UPLOAD_TIMEOUT_SECS` | 600 |
//! | `GEMINI_CONNECT_TIMEOUT_SECS` | 10 |
//! | `RELAY_STAGING_DIR` | OS temp dir |
//! | `HOST` / `PORT` | `0.0.0.0` / 3000 |

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, ErrorContext, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Everything the relay needs to talk to the remote model.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub http_timeout: Duration,
    pub upload_timeout: Duration,
    pub connect_timeout: Duration,
    pub staging_dir: PathBuf,
    pub host: String,
    pub port: u16,
}

impl RelayConfig {
    /// Config with the given key and every other knob at its default.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(120),
            upload_timeout: Duration::from_secs(600),
            connect_timeout: Duration::from_secs(10),
            staging_dir: env::temp_dir(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }

    /// Load from the environment. Fails only when no API key is present.
    pub fn from_env() -> Result<Self> {
        let api_key = non_empty_var("GEMINI_API_KEY")
            .or_else(|| non_empty_var("GOOGLE_API_KEY"))
            .ok_or_else(|| {
                Error::configuration_with_context(
                    "Gemini API key is not set",
                    ErrorContext::new()
                        .with_field_path("GEMINI_API_KEY")
                        .with_details("set GEMINI_API_KEY or GOOGLE_API_KEY")
                        .with_source("config"),
                )
            })?;

        let mut config = Self::new(api_key);
        if let Some(model) = non_empty_var("GEMINI_MODEL") {
            config.model = model;
        }
        if let Some(base_url) = non_empty_var("GEMINI_BASE_URL") {
            config.base_url = validate_base_url(&base_url)?;
        }
        if let Some(secs) = parse_var::<u64>("GEMINI_HTTP_TIMEOUT_SECS") {
            config.http_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = parse_var::<u64>("GEMINI_UPLOAD_TIMEOUT_SECS") {
            config.upload_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(secs) = parse_var::<u64>("GEMINI_CONNECT_TIMEOUT_SECS") {
            config.connect_timeout = Duration::from_secs(secs.max(1));
        }
        if let Some(dir) = non_empty_var("RELAY_STAGING_DIR") {
            config.staging_dir = PathBuf::from(dir);
        }
        if let Some(host) = non_empty_var("HOST") {
            config.host = host;
        }
        if let Some(port) = parse_var::<u16>("PORT") {
            config.port = port;
        }
        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Point the client at another endpoint (mock servers in tests, regional proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = dir.into();
        self
    }
}

/// Base URLs must be absolute http(s); a trailing slash is dropped.
pub fn validate_base_url(raw: &str) -> Result<String> {
    let parsed = url::Url::parse(raw).map_err(|e| {
        Error::configuration_with_context(
            format!("Invalid base URL '{}': {}", raw, e),
            ErrorContext::new()
                .with_field_path("GEMINI_BASE_URL")
                .with_source("config"),
        )
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::configuration_with_context(
            format!("Unsupported base URL scheme '{}'", parsed.scheme()),
            ErrorContext::new()
                .with_field_path("GEMINI_BASE_URL")
                .with_details("expected http or https")
                .with_source("config"),
        ));
    }
    Ok(raw.trim_end_matches('/').to_string())
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    non_empty_var(name).and_then(|s| s.parse::<T>().ok())
}
