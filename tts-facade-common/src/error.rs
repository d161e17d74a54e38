//! Error types shared by the facade crates.
//!
//! [`Error`] covers everything below the HTTP layer: configuration,
//! credentials, the upstream synthesis call and local file access. The server
//! crate maps it onto status codes.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Upstream call failed. `status_code` is 0 when no response arrived.
    #[error("API error for {endpoint} (HTTP {status_code}): {message}")]
    Api {
        endpoint: String,
        status_code: u16,
        message: String,
    },

    /// Upstream answered successfully but without audio.
    #[error("No audio content returned from {0}")]
    EmptyAudio(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Upstream call exceeded the request deadline.
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Upstream failure for `endpoint`.
    ///
    /// ```
    /// use tts_facade_common::error::Error;
    ///
    /// let err = Error::api("http://tts.local/v1/text:synthesize", 503, "busy");
    /// assert_eq!(err.to_string(), "API error for http://tts.local/v1/text:synthesize (HTTP 503): busy");
    /// ```
    pub fn api(endpoint: impl Into<String>, status_code: u16, message: impl Into<String>) -> Self {
        Error::Api {
            endpoint: endpoint.into(),
            status_code,
            message: message.into(),
        }
    }

    /// ```
    /// use std::time::Duration;
    /// use tts_facade_common::error::Error;
    ///
    /// assert_eq!(Error::timeout(Duration::from_millis(250)).to_string(), "Operation timed out after 250ms");
    /// ```
    pub fn timeout(after: Duration) -> Self {
        Error::Timeout(after)
    }

    pub fn empty_audio(source: impl Into<String>) -> Self {
        Error::EmptyAudio(source.into())
    }
}

/// Invalid environment, command line or voice catalog.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl ConfigError {
    pub fn invalid_value(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue(name.into(), reason.into())
    }
}

/// Failure to obtain a bearer token for the provider.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("ADC not configured. Set TTS_PROVIDER_TOKEN, run 'gcloud auth application-default login' or set GOOGLE_APPLICATION_CREDENTIALS")]
    NotConfigured,

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
}

impl AuthError {
    pub fn refresh_failed(message: impl Into<String>) -> Self {
        AuthError::RefreshFailed(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        let err: Error = ConfigError::invalid_value("PORT", "not a number").into();
        assert!(matches!(err, Error::Config(_)));

        let err: Error = AuthError::NotConfigured.into();
        assert!(matches!(err, Error::Auth(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "voices.json");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_auth_error_points_at_token_variable() {
        assert!(AuthError::NotConfigured.to_string().contains("TTS_PROVIDER_TOKEN"));
    }
}
