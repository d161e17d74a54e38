//! Configuration module for loading environment variables and settings.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::ConfigError;

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default upstream synthesis endpoint (Google Cloud TTS).
pub const DEFAULT_PROVIDER_ENDPOINT: &str = "https://texttospeech.googleapis.com/v1/text:synthesize";

/// Default deadline for a single provider call.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    /// Address the HTTP server binds to
    pub host: String,
    /// HTTP server port
    pub port: u16,
    /// Google-Cloud-TTS-compatible endpoint that performs the synthesis
    pub provider_endpoint: String,
    /// Static bearer token for the provider; ADC is used when absent
    pub provider_token: Option<String>,
    /// Deadline applied to every provider call
    pub request_timeout_secs: u64,
    /// JSON voice catalog; the built-in catalog is used when absent
    pub voices_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            provider_endpoint: DEFAULT_PROVIDER_ENDPOINT.to_string(),
            provider_token: None,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            voices_file: None,
        }
    }
}

// The token must never end up in logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("provider_endpoint", &self.provider_endpoint)
            .field("provider_token", &self.provider_token.as_ref().map(|_| "<redacted>"))
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("voices_file", &self.voices_file)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables and .env file.
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|e| ConfigError::invalid_value("PORT", format!("'{}': {}", raw, e)))?,
            None => DEFAULT_PORT,
        };

        let provider_endpoint = get("TTS_PROVIDER_ENDPOINT")
            .map(|e| e.trim().to_string())
            .unwrap_or_else(|| DEFAULT_PROVIDER_ENDPOINT.to_string());
        if !provider_endpoint.starts_with("http://") && !provider_endpoint.starts_with("https://") {
            return Err(ConfigError::invalid_value(
                "TTS_PROVIDER_ENDPOINT",
                format!("'{}' is not an http(s) URL", provider_endpoint),
            ));
        }

        let provider_token = get("TTS_PROVIDER_TOKEN");

        let request_timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|e| {
                    ConfigError::invalid_value("REQUEST_TIMEOUT_SECS", format!("'{}': {}", raw, e))
                })?;
                if secs == 0 {
                    return Err(ConfigError::invalid_value(
                        "REQUEST_TIMEOUT_SECS",
                        "must be greater than zero",
                    ));
                }
                secs
            }
            None => DEFAULT_REQUEST_TIMEOUT_SECS,
        };

        let voices_file = get("VOICES_FILE").map(PathBuf::from);

        Ok(Self {
            host,
            port,
            provider_endpoint,
            provider_token,
            request_timeout_secs,
            voices_file,
        })
    }

    /// Provider call deadline as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// `host:port` string suitable for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
