//! Synthesis providers.
//!
//! The facade hands a fully validated [`ProviderRequest`] to a
//! [`SynthesisProvider`] and gets raw audio bytes back. [`CloudTtsProvider`]
//! talks to any Google-Cloud-TTS-compatible `text:synthesize` endpoint.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use tts_facade_common::auth::{AuthProvider, scopes};
use tts_facade_common::config::Config;
use tts_facade_common::error::Error;

use crate::encoding::AudioEncoding;

/// Text to synthesize, plain or SSML.
#[derive(Debug, Clone, PartialEq)]
pub enum SynthesisText {
    Plain(String),
    Ssml(String),
}

/// Sampling parameters of the voice model.
#[derive(Debug, Clone, PartialEq)]
pub struct Prosody {
    pub style: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub seed: i64,
}

/// Output parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioParams {
    pub encoding: AudioEncoding,
    pub speaking_rate: f64,
    pub pitch: f64,
    pub volume_gain_db: f64,
    pub sample_rate_hertz: u32,
    pub batch_size: u32,
    pub spliter_threshold: u32,
}

/// A request that already passed schema and domain validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderRequest {
    pub text: SynthesisText,
    /// Language code as registered for the voice
    pub language_code: String,
    /// Provider-side voice identifier
    pub voice_id: String,
    pub prosody: Prosody,
    pub audio: AudioParams,
}

/// External speech synthesis backend.
#[async_trait]
pub trait SynthesisProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Encodings this provider can produce.
    fn supported_encodings(&self) -> &[AudioEncoding];

    /// Synthesize audio, returning the encoded bytes.
    async fn synthesize(&self, request: ProviderRequest) -> Result<Vec<u8>, Error>;
}

/// Encodings the Google Cloud TTS API can return.
pub const CLOUD_TTS_ENCODINGS: &[AudioEncoding] =
    &[AudioEncoding::Mp3, AudioEncoding::Wav, AudioEncoding::Ogg];

/// Provider backed by a Google-Cloud-TTS-compatible HTTP endpoint.
pub struct CloudTtsProvider {
    endpoint: String,
    http: reqwest::Client,
    auth: AuthProvider,
}

impl CloudTtsProvider {
    /// Create a provider for the configured endpoint.
    ///
    /// # Errors
    /// Returns an error if credentials for a Google endpoint cannot be found.
    #[instrument(level = "debug", name = "cloud_tts_provider_new", skip_all)]
    pub async fn new(config: &Config) -> Result<Self, Error> {
        let auth = AuthProvider::from_config(config).await?;
        info!(endpoint = %config.provider_endpoint, auth = auth.kind(), "Initialized Cloud TTS provider");
        Ok(Self::with_deps(
            config.provider_endpoint.clone(),
            reqwest::Client::new(),
            auth,
        ))
    }

    /// Create a provider with explicit dependencies.
    pub fn with_deps(endpoint: impl Into<String>, http: reqwest::Client, auth: AuthProvider) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
            auth,
        }
    }

    /// The upstream endpoint.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SynthesisProvider for CloudTtsProvider {
    fn name(&self) -> &str {
        "cloud-tts"
    }

    fn supported_encodings(&self) -> &[AudioEncoding] {
        CLOUD_TTS_ENCODINGS
    }

    #[instrument(level = "info", name = "cloud_tts_synthesize", skip(self, request), fields(voice = %request.voice_id))]
    async fn synthesize(&self, request: ProviderRequest) -> Result<Vec<u8>, Error> {
        let body = TtsRequest::from(&request);
        let token = self.auth.get_token(&[scopes::CLOUD_PLATFORM]).await?;

        debug!(endpoint = %self.endpoint, "Calling synthesis endpoint");

        let mut http_request = self.http.post(&self.endpoint).json(&body);
        if let Some(token) = token {
            http_request = http_request.bearer_auth(token);
        }

        let response = http_request
            .send()
            .await
            .map_err(|e| Error::api(&self.endpoint, 0, format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::api(&self.endpoint, status.as_u16(), body));
        }

        let api_response: TtsResponse = response.json().await.map_err(|e| {
            Error::api(
                &self.endpoint,
                status.as_u16(),
                format!("Failed to parse response: {}", e),
            )
        })?;

        let audio = decode_audio_content(&api_response.audio_content).map_err(|e| {
            Error::api(&self.endpoint, status.as_u16(), format!("Invalid audioContent: {}", e))
        })?;

        if audio.is_empty() {
            return Err(Error::empty_audio(&self.endpoint));
        }

        debug!(bytes = audio.len(), "Received audio from synthesis endpoint");
        Ok(audio)
    }
}

/// Decode `audioContent`, which may be raw base64 or a `data:` URI.
pub fn decode_audio_content(content: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let payload = match content.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, p)| p).unwrap_or(""),
        None => content,
    };
    BASE64.decode(payload.trim())
}

// =============================================================================
// Wire types
// =============================================================================

/// Upstream request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsRequest {
    pub input: TtsInput,
    pub voice: TtsVoice,
    pub audio_config: TtsAudioConfig,
}

/// Upstream input (text or SSML).
#[derive(Debug, Serialize)]
pub struct TtsInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssml: Option<String>,
}

/// Upstream voice; sampling fields are extensions Google ignores.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsVoice {
    pub language_code: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub style: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub seed: i64,
}

/// Upstream audio configuration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsAudioConfig {
    pub audio_encoding: AudioEncoding,
    pub speaking_rate: f64,
    pub pitch: f64,
    pub volume_gain_db: f64,
    pub sample_rate_hertz: u32,
    pub batch_size: u32,
    pub spliter_threshold: u32,
}

/// Upstream response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TtsResponse {
    pub audio_content: String,
}

impl From<&ProviderRequest> for TtsRequest {
    fn from(request: &ProviderRequest) -> Self {
        let (text, ssml) = match &request.text {
            SynthesisText::Plain(text) => (Some(text.clone()), None),
            SynthesisText::Ssml(ssml) => (None, Some(ssml.clone())),
        };

        Self {
            input: TtsInput { text, ssml },
            voice: TtsVoice {
                language_code: request.language_code.clone(),
                name: request.voice_id.clone(),
                style: request.prosody.style.clone(),
                temperature: request.prosody.temperature,
                top_p: request.prosody.top_p,
                top_k: request.prosody.top_k,
                seed: request.prosody.seed,
            },
            audio_config: TtsAudioConfig {
                audio_encoding: request.audio.encoding,
                speaking_rate: request.audio.speaking_rate,
                pitch: request.audio.pitch,
                volume_gain_db: request.audio.volume_gain_db,
                sample_rate_hertz: request.audio.sample_rate_hertz,
                batch_size: request.audio.batch_size,
                spliter_threshold: request.audio.spliter_threshold,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sample_request() -> ProviderRequest {
        ProviderRequest {
            text: SynthesisText::Plain("Hello world".to_string()),
            language_code: "EN-US".to_string(),
            voice_id: "Alice".to_string(),
            prosody: Prosody {
                style: String::new(),
                temperature: 0.5,
                top_p: 0.8,
                top_k: 50,
                seed: 42,
            },
            audio: AudioParams {
                encoding: AudioEncoding::Mp3,
                speaking_rate: 1.0,
                pitch: 0.0,
                volume_gain_db: 0.0,
                sample_rate_hertz: 24000,
                batch_size: 1,
                spliter_threshold: 100,
            },
        }
    }

    fn provider(server: &MockServer, auth: AuthProvider) -> CloudTtsProvider {
        CloudTtsProvider::with_deps(
            format!("{}/v1/text:synthesize", server.uri()),
            reqwest::Client::new(),
            auth,
        )
    }

    #[test]
    fn test_request_wire_format() {
        let body = serde_json::to_value(TtsRequest::from(&sample_request())).unwrap();
        assert_eq!(body["input"], json!({"text": "Hello world"}));
        assert_eq!(body["voice"]["languageCode"], "EN-US");
        assert_eq!(body["voice"]["name"], "Alice");
        assert!(body["voice"].get("style").is_none());
        assert_eq!(body["voice"]["topK"], 50);
        assert_eq!(body["audioConfig"]["audioEncoding"], "MP3");
        assert_eq!(body["audioConfig"]["sampleRateHertz"], 24000);
        assert_eq!(body["audioConfig"]["spliterThreshold"], 100);
    }

    #[test]
    fn test_ssml_request_wire_format() {
        let mut request = sample_request();
        request.text = SynthesisText::Ssml("<speak>Hi</speak>".to_string());
        let body = serde_json::to_value(TtsRequest::from(&request)).unwrap();
        assert_eq!(body["input"], json!({"ssml": "<speak>Hi</speak>"}));
    }

    #[test]
    fn test_decode_audio_content_variants() {
        assert_eq!(decode_audio_content("SUQz").unwrap(), b"ID3");
        assert_eq!(decode_audio_content("data:audio/mp3;base64,SUQz").unwrap(), b"ID3");
        assert!(decode_audio_content("not base64!").is_err());
    }

    #[tokio::test]
    async fn test_synthesize_success_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/text:synthesize"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(json!({"voice": {"name": "Alice"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"audioContent": "SUQzBAA="})))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server, AuthProvider::fixed("test-token"));
        let audio = provider.synthesize(sample_request()).await.unwrap();
        assert_eq!(&audio[..3], b"ID3");
    }

    #[tokio::test]
    async fn test_synthesize_accepts_data_uri_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"audioContent": "data:audio/mp3;base64,SUQzBAA="})),
            )
            .mount(&server)
            .await;

        let provider = provider(&server, AuthProvider::anonymous());
        let audio = provider.synthesize(sample_request()).await.unwrap();
        assert_eq!(&audio[..3], b"ID3");
    }

    #[tokio::test]
    async fn test_synthesize_upstream_error_keeps_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let provider = provider(&server, AuthProvider::anonymous());
        let err = provider.synthesize(sample_request()).await.unwrap_err();
        match err {
            Error::Api {
                status_code,
                message,
                ..
            } => {
                assert_eq!(status_code, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_synthesize_empty_audio_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"audioContent": ""})))
            .mount(&server)
            .await;

        let provider = provider(&server, AuthProvider::anonymous());
        let err = provider.synthesize(sample_request()).await.unwrap_err();
        assert!(matches!(err, Error::EmptyAudio(_)));
        assert!(err.to_string().contains("No audio content"));
    }

    #[tokio::test]
    async fn test_synthesize_malformed_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let provider = provider(&server, AuthProvider::anonymous());
        let err = provider.synthesize(sample_request()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse response"));
    }

    #[tokio::test]
    async fn test_synthesize_connection_refused() {
        let provider = CloudTtsProvider::with_deps(
            "http://127.0.0.1:1/v1/text:synthesize",
            reqwest::Client::new(),
            AuthProvider::anonymous(),
        );
        let err = provider.synthesize(sample_request()).await.unwrap_err();
        assert!(matches!(err, Error::Api { status_code: 0, .. }));
    }

    #[test]
    fn test_supported_encodings() {
        let provider = CloudTtsProvider::with_deps(
            "http://localhost/v1/text:synthesize",
            reqwest::Client::new(),
            AuthProvider::anonymous(),
        );
        assert!(provider.supported_encodings().contains(&AudioEncoding::Mp3));
        assert!(!provider.supported_encodings().contains(&AudioEncoding::Flac));
        assert_eq!(provider.name(), "cloud-tts");
    }
}
