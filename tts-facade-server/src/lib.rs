//! TTS Facade Server Library
//!
//! Exposes a Google-Cloud-TTS-compatible `text:synthesize` endpoint. Requests
//! are validated against the request schema and the voice catalog, forwarded
//! to a [`provider::SynthesisProvider`], and answered with the audio as a
//! base64 `data:` URI.

pub mod encoding;
pub mod error;
pub mod facade;
pub mod provider;
pub mod schema;
pub mod server;
pub mod voices;

pub use encoding::AudioEncoding;
pub use error::ApiError;
pub use facade::{DomainError, SynthesisFacade, SynthesizeResponse};
pub use provider::{CloudTtsProvider, ProviderRequest, SynthesisProvider};
pub use schema::{SynthesizeRequest, ValidationErrors, parse_request};
pub use server::{AppState, router};
pub use voices::{StaticVoiceRegistry, Voice, VoiceRegistry};
