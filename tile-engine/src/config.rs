use std::time::Duration;
use url::Url;

use crate::error::TileError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub api_token: Option<String>,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self, TileError> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(TileError::ConfigError {
                message: format!("Base URL cannot carry a path: {}", base_url),
            });
        }

        Ok(Self {
            base_url,
            api_token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into()).filter(|t: &String| !t.trim().is_empty());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `TILE_API_BASE_URL`, `TILE_API_TOKEN` and
    /// `TILE_HTTP_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, TileError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, TileError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("TILE_API_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Some(token) = lookup("TILE_API_TOKEN") {
            config = config.with_token(token);
        }

        if let Some(raw) = lookup("TILE_HTTP_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| TileError::ConfigError {
                message: format!("Invalid TILE_HTTP_TIMEOUT_SECS: {}", raw),
            })?;
            if secs == 0 {
                return Err(TileError::ConfigError {
                    message: "TILE_HTTP_TIMEOUT_SECS must be greater than zero".to_string(),
                });
            }
            config = config.with_timeout(Duration::from_secs(secs));
        }

        Ok(config)
    }

    /// Base URL with `segments` appended, each percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, TileError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TileError::ConfigError {
                message: format!("Base URL cannot carry a path: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}
