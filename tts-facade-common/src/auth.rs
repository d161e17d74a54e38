//! Upstream authentication for the synthesis provider.
//!
//! Three credential sources are supported:
//! - a static bearer token (`TTS_PROVIDER_TOKEN`)
//! - Application Default Credentials via `gcp_auth`, used for
//!   `*.googleapis.com` endpoints when no static token is configured
//! - anonymous access, for self-hosted compatible endpoints

use std::sync::Arc;

use gcp_auth::TokenProvider;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::error::AuthError;

/// Common OAuth2 scopes for Google Cloud APIs.
pub mod scopes {
    /// Full access to Google Cloud Platform APIs.
    pub const CLOUD_PLATFORM: &str = "https://www.googleapis.com/auth/cloud-platform";
}

enum TokenSource {
    Adc(Arc<dyn TokenProvider>),
    Static(String),
    Anonymous,
}

/// Bearer token source for the synthesis provider.
///
/// ADC tokens are cached and refreshed by `gcp_auth`; callers should ask for a
/// token on every request instead of holding on to one.
pub struct AuthProvider {
    source: TokenSource,
}

impl AuthProvider {
    /// Pick the credential source for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::NotConfigured` if the endpoint is a Google endpoint,
    /// no static token is set, and ADC cannot be discovered.
    #[instrument(level = "debug", name = "auth_provider_from_config", skip_all)]
    pub async fn from_config(config: &Config) -> Result<Self, AuthError> {
        if let Some(token) = &config.provider_token {
            debug!("Using static provider token");
            return Ok(Self::fixed(token));
        }

        if is_google_endpoint(&config.provider_endpoint) {
            return Self::adc().await;
        }

        debug!(endpoint = %config.provider_endpoint, "No credentials configured, calling provider anonymously");
        Ok(Self::anonymous())
    }

    /// Discover Application Default Credentials.
    pub async fn adc() -> Result<Self, AuthError> {
        debug!("Initializing AuthProvider with ADC");

        let provider = gcp_auth::provider().await.map_err(|e| {
            debug!("Failed to initialize ADC: {}", e);
            AuthError::NotConfigured
        })?;

        Ok(Self {
            source: TokenSource::Adc(provider),
        })
    }

    /// Always hand out the given token.
    pub fn fixed(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(token.into()),
        }
    }

    /// Never send an `Authorization` header.
    pub fn anonymous() -> Self {
        Self {
            source: TokenSource::Anonymous,
        }
    }

    /// Get a bearer token for the given scopes, or `None` for anonymous access.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RefreshFailed` if ADC cannot produce a token.
    #[instrument(level = "debug", name = "get_token", skip(self))]
    pub async fn get_token(&self, scopes: &[&str]) -> Result<Option<String>, AuthError> {
        match &self.source {
            TokenSource::Adc(provider) => {
                let token = provider.token(scopes).await.map_err(|e| {
                    debug!("Token refresh failed: {}", e);
                    AuthError::refresh_failed(e.to_string())
                })?;
                Ok(Some(token.as_str().to_string()))
            }
            TokenSource::Static(token) => Ok(Some(token.clone())),
            TokenSource::Anonymous => Ok(None),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self.source {
            TokenSource::Adc(_) => "adc",
            TokenSource::Static(_) => "static",
            TokenSource::Anonymous => "anonymous",
        }
    }
}

fn is_google_endpoint(endpoint: &str) -> bool {
    let without_scheme = endpoint
        .strip_prefix("https://")
        .or_else(|| endpoint.strip_prefix("http://"))
        .unwrap_or(endpoint);
    let host = without_scheme
        .split(['/', ':'])
        .next()
        .unwrap_or_default();
    host == "googleapis.com" || host.ends_with(".googleapis.com")
}
