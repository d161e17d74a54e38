//! The synthesis facade.
//!
//! Processing order for every request:
//! 1. structural validation of the JSON body ([`crate::schema`], 422)
//! 2. domain validation: voice lookup, supported encoding, text, ranges (400)
//! 3. dispatch to the [`SynthesisProvider`] under a deadline (5xx on failure)
//! 4. wrapping the audio as a `data:audio/<fmt>;base64,` URI (200)

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use tts_facade_common::config::DEFAULT_REQUEST_TIMEOUT_SECS;
use tts_facade_common::error::Error;

use crate::encoding::AudioEncoding;
use crate::error::ApiError;
use crate::provider::{AudioParams, ProviderRequest, Prosody, SynthesisProvider, SynthesisText};
use crate::schema::{self, SynthesizeRequest};
use crate::voices::VoiceRegistry;

/// Minimum speaking rate.
pub const MIN_SPEAKING_RATE: f64 = 0.25;
/// Maximum speaking rate.
pub const MAX_SPEAKING_RATE: f64 = 4.0;
/// Minimum pitch (semitones).
pub const MIN_PITCH: f64 = -20.0;
/// Maximum pitch (semitones).
pub const MAX_PITCH: f64 = 20.0;
/// Minimum volume gain (dB).
pub const MIN_VOLUME_GAIN_DB: f64 = -96.0;
/// Maximum volume gain (dB).
pub const MAX_VOLUME_GAIN_DB: f64 = 16.0;
/// Minimum output sample rate.
pub const MIN_SAMPLE_RATE_HERTZ: i64 = 8000;
/// Maximum output sample rate.
pub const MAX_SAMPLE_RATE_HERTZ: i64 = 48000;

/// A semantically invalid request value.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainError {
    /// Dotted path of the offending field, e.g. `voice.name`.
    pub field: String,
    /// Description of the failure.
    pub message: String,
}

impl DomainError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Successful synthesis response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeResponse {
    /// `data:audio/<fmt>;base64,<payload>`
    pub audio_content: String,
}

/// Validation-and-dispatch layer in front of a synthesis provider.
#[derive(Clone)]
pub struct SynthesisFacade {
    registry: Arc<dyn VoiceRegistry>,
    provider: Arc<dyn SynthesisProvider>,
    timeout: Duration,
}

impl SynthesisFacade {
    pub fn new(registry: Arc<dyn VoiceRegistry>, provider: Arc<dyn SynthesisProvider>) -> Self {
        Self {
            registry,
            provider,
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    /// Set the deadline for each provider call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn registry(&self) -> &dyn VoiceRegistry {
        self.registry.as_ref()
    }

    pub fn provider(&self) -> &dyn SynthesisProvider {
        self.provider.as_ref()
    }

    /// Run the full pipeline on a raw JSON body.
    pub async fn synthesize_json(&self, body: &[u8]) -> Result<SynthesizeResponse, ApiError> {
        let request = schema::parse_request(body).map_err(|errors| {
            warn!(errors = %errors, "Rejected structurally invalid request");
            ApiError::Schema(errors)
        })?;
        self.synthesize(request).await
    }

    /// Validate, dispatch and wrap a structurally valid request.
    #[instrument(level = "info", name = "facade_synthesize", skip_all, fields(
        language_code = %request.voice.language_code,
        voice = %request.voice.name,
        encoding = %request.audio_config.audio_encoding,
    ))]
    pub async fn synthesize(
        &self,
        request: SynthesizeRequest,
    ) -> Result<SynthesizeResponse, ApiError> {
        let provider_request = self.validate(&request).map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            warn!(errors = %messages.join("; "), "Rejected semantically invalid request");
            ApiError::Domain(errors)
        })?;

        let encoding = provider_request.audio.encoding;
        info!(provider = self.provider.name(), "Dispatching to synthesis provider");

        let audio = tokio::time::timeout(self.timeout, self.provider.synthesize(provider_request))
            .await
            .map_err(|_| {
                error!(timeout = ?self.timeout, "Synthesis provider timed out");
                ApiError::Upstream(Error::timeout(self.timeout))
            })?
            .map_err(|e| {
                error!(error = %e, "Synthesis provider failed");
                ApiError::Upstream(e)
            })?;

        if audio.is_empty() {
            error!("Synthesis provider returned no audio");
            return Err(ApiError::Upstream(Error::empty_audio(self.provider.name())));
        }

        info!(bytes = audio.len(), "Synthesized audio");
        Ok(SynthesizeResponse {
            audio_content: encoding.to_data_uri(&audio),
        })
    }

    /// Domain validation; returns every problem found.
    pub fn validate(
        &self,
        request: &SynthesizeRequest,
    ) -> Result<ProviderRequest, Vec<DomainError>> {
        let mut errors = Vec::new();
        let voice = &request.voice;
        let audio = &request.audio_config;

        let resolved = self.registry.resolve(&voice.language_code, &voice.name);
        if resolved.is_none() {
            errors.push(DomainError::new(
                "voice",
                format!(
                    "Voice not found: languageCode={}, name={}",
                    voice.language_code, voice.name
                ),
            ));
        }

        let encoding = self.check_encoding(&audio.audio_encoding, &mut errors);

        let text = match (&request.input.ssml, &request.input.text) {
            (Some(ssml), _) => SynthesisText::Ssml(ssml.clone()),
            (None, Some(text)) => SynthesisText::Plain(text.clone()),
            (None, None) => SynthesisText::Plain(String::new()),
        };
        let is_blank = match &text {
            SynthesisText::Plain(t) | SynthesisText::Ssml(t) => t.trim().is_empty(),
        };
        if is_blank {
            errors.push(DomainError::new("input.text", "Text cannot be empty"));
        }

        check_range(
            &mut errors,
            "audioConfig.speakingRate",
            audio.speaking_rate,
            MIN_SPEAKING_RATE,
            MAX_SPEAKING_RATE,
        );
        check_range(&mut errors, "audioConfig.pitch", audio.pitch, MIN_PITCH, MAX_PITCH);
        check_range(
            &mut errors,
            "audioConfig.volumeGainDb",
            audio.volume_gain_db,
            MIN_VOLUME_GAIN_DB,
            MAX_VOLUME_GAIN_DB,
        );

        let sample_rate_range = MIN_SAMPLE_RATE_HERTZ..=MAX_SAMPLE_RATE_HERTZ;
        let sample_rate_hertz = if sample_rate_range.contains(&audio.sample_rate_hertz) {
            u32::try_from(audio.sample_rate_hertz).ok()
        } else {
            errors.push(DomainError::new(
                "audioConfig.sampleRateHertz",
                format!(
                    "sampleRateHertz must be between {} and {}, got {}",
                    MIN_SAMPLE_RATE_HERTZ, MAX_SAMPLE_RATE_HERTZ, audio.sample_rate_hertz
                ),
            ));
            None
        };

        if voice.temperature < 0.0 {
            errors.push(DomainError::new(
                "voice.temperature",
                format!("temperature must be non-negative, got {}", voice.temperature),
            ));
        }
        if voice.top_p <= 0.0 || voice.top_p > 1.0 {
            errors.push(DomainError::new(
                "voice.topP",
                format!("topP must be in (0, 1], got {}", voice.top_p),
            ));
        }

        let top_k = positive_u32(&mut errors, "voice.topK", voice.top_k);
        let batch_size = positive_u32(&mut errors, "audioConfig.batchSize", audio.batch_size);
        let spliter_threshold = positive_u32(
            &mut errors,
            "audioConfig.spliterThreshold",
            audio.spliter_threshold,
        );

        match (resolved, encoding, sample_rate_hertz, top_k, batch_size, spliter_threshold) {
            (
                Some(resolved),
                Some(encoding),
                Some(sample_rate_hertz),
                Some(top_k),
                Some(batch_size),
                Some(spliter_threshold),
            ) if errors.is_empty() => {
                Ok(ProviderRequest {
                    text,
                    language_code: resolved.language_code.clone(),
                    voice_id: resolved.provider_id().to_string(),
                    prosody: Prosody {
                        style: voice.style.clone(),
                        temperature: voice.temperature,
                        top_p: voice.top_p,
                        top_k,
                        seed: voice.seed,
                    },
                    audio: AudioParams {
                        encoding,
                        speaking_rate: audio.speaking_rate,
                        pitch: audio.pitch,
                        volume_gain_db: audio.volume_gain_db,
                        sample_rate_hertz,
                        batch_size,
                        spliter_threshold,
                    },
                })
            }
            _ => Err(errors),
        }
    }

    fn check_encoding(&self, raw: &str, errors: &mut Vec<DomainError>) -> Option<AudioEncoding> {
        let supported = self.provider.supported_encodings();
        match raw.parse::<AudioEncoding>() {
            Ok(encoding) if supported.contains(&encoding) => Some(encoding),
            _ => {
                let names: Vec<&str> = supported.iter().map(|e| e.as_str()).collect();
                errors.push(DomainError::new(
                    "audioConfig.audioEncoding",
                    format!(
                        "Unsupported audio encoding '{}'. Must be one of: {}",
                        raw,
                        names.join(", ")
                    ),
                ));
                None
            }
        }
    }
}

fn check_range(errors: &mut Vec<DomainError>, field: &str, value: f64, min: f64, max: f64) {
    if !(min..=max).contains(&value) {
        let name = field.rsplit('.').next().unwrap_or(field);
        errors.push(DomainError::new(
            field,
            format!("{} must be between {} and {}, got {}", name, min, max, value),
        ));
    }
}

fn positive_u32(errors: &mut Vec<DomainError>, field: &str, value: i64) -> Option<u32> {
    match u32::try_from(value) {
        Ok(v) if v >= 1 => Some(v),
        _ => {
            let name = field.rsplit('.').next().unwrap_or(field);
            errors.push(DomainError::new(
                field,
                format!(
                    "{} must be a positive integer no larger than {}, got {}",
                    name,
                    u32::MAX,
                    value
                ),
            ));
            None
        }
    }
}
