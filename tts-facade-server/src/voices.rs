//! Voice registry: resolves `(languageCode, name)` pairs to provider voices.
//!
//! The registry is read-only after construction and shared across requests.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use tts_facade_common::error::{ConfigError, Error};

/// A voice the facade accepts.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Voice {
    /// Language code the voice is registered under (e.g. "ZH-CN")
    pub language_code: String,
    /// Public voice name clients select
    pub name: String,
    /// Identifier forwarded to the synthesis provider; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_voice: Option<String>,
    /// SSML gender ("FEMALE", "MALE", "NEUTRAL")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssml_gender: Option<String>,
    /// Native sample rate of the voice
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_sample_rate_hertz: Option<u32>,
}

impl Voice {
    /// Identifier to send to the provider.
    pub fn provider_id(&self) -> &str {
        self.provider_voice.as_deref().unwrap_or(&self.name)
    }

    /// Language codes compare case-insensitively, names exactly.
    pub fn matches(&self, language_code: &str, name: &str) -> bool {
        self.name == name && self.language_code.eq_ignore_ascii_case(language_code)
    }
}

/// Lookup of known voices.
pub trait VoiceRegistry: Send + Sync {
    /// Resolve a voice by language code and name.
    fn resolve(&self, language_code: &str, name: &str) -> Option<Voice>;

    /// List voices, optionally restricted to one language code.
    fn list(&self, language_code: Option<&str>) -> Vec<Voice>;
}

/// Built-in catalog used when no voice file is configured.
const BUILTIN_VOICES: &[(&str, &str, &str)] = &[
    ("ZH-CN", "female1", "FEMALE"),
    ("ZH-CN", "female2", "FEMALE"),
    ("ZH-CN", "male1", "MALE"),
    ("ZH-CN", "male2", "MALE"),
    ("EN-US", "Alice", "FEMALE"),
    ("EN-US", "Bob", "MALE"),
];

/// Sample rate of the built-in voices.
pub const BUILTIN_SAMPLE_RATE_HERTZ: u32 = 24000;

/// In-memory registry backed by a fixed list.
#[derive(Debug, Clone)]
pub struct StaticVoiceRegistry {
    voices: Vec<Voice>,
}

impl StaticVoiceRegistry {
    /// Registry containing the built-in catalog.
    pub fn builtin() -> Self {
        let voices = BUILTIN_VOICES
            .iter()
            .map(|(language_code, name, gender)| Voice {
                language_code: language_code.to_string(),
                name: name.to_string(),
                provider_voice: None,
                ssml_gender: Some(gender.to_string()),
                natural_sample_rate_hertz: Some(BUILTIN_SAMPLE_RATE_HERTZ),
            })
            .collect();
        Self { voices }
    }

    /// Registry over an explicit list.
    ///
    /// # Errors
    /// Returns a configuration error if the list is empty or contains the same
    /// `(languageCode, name)` twice.
    pub fn new(voices: Vec<Voice>) -> Result<Self, ConfigError> {
        if voices.is_empty() {
            return Err(ConfigError::invalid_value("VOICES_FILE", "voice catalog is empty"));
        }

        let mut seen = HashSet::new();
        for voice in &voices {
            if voice.name.trim().is_empty() || voice.language_code.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "VOICES_FILE",
                    "voice entries need a non-empty languageCode and name",
                ));
            }
            let key = (voice.language_code.to_ascii_uppercase(), voice.name.clone());
            if !seen.insert(key) {
                return Err(ConfigError::invalid_value(
                    "VOICES_FILE",
                    format!("duplicate voice {}/{}", voice.language_code, voice.name),
                ));
            }
        }

        Ok(Self { voices })
    }

    /// Load a JSON array of voices.
    #[instrument(level = "debug", name = "load_voices")]
    pub async fn from_file(path: &Path) -> Result<Self, Error> {
        let raw = tokio::fs::read(path).await?;
        let voices: Vec<Voice> = serde_json::from_slice(&raw).map_err(|e| {
            ConfigError::invalid_value("VOICES_FILE", format!("{}: {}", path.display(), e))
        })?;

        let registry = Self::new(voices)?;
        info!(path = %path.display(), count = registry.voices.len(), "Loaded voice catalog");
        Ok(registry)
    }

    /// File-backed registry if `path` is set, otherwise the built-in catalog.
    pub async fn load(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(path) => Self::from_file(path).await,
            None => {
                debug!("Using built-in voice catalog");
                Ok(Self::builtin())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

impl VoiceRegistry for StaticVoiceRegistry {
    fn resolve(&self, language_code: &str, name: &str) -> Option<Voice> {
        self.voices
            .iter()
            .find(|voice| voice.matches(language_code, name))
            .cloned()
    }

    fn list(&self, language_code: Option<&str>) -> Vec<Voice> {
        self.voices
            .iter()
            .filter(|voice| {
                language_code.is_none_or(|code| voice.language_code.eq_ignore_ascii_case(code))
            })
            .cloned()
            .collect()
    }
}
