//! HTTP surface of the facade.
//!
//! - `POST /v1/text:synthesize` synthesizes speech
//! - `GET /v1/voices` lists the voice catalog, optionally filtered by `languageCode`
//! - `GET /health` liveness probe

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{Instrument, debug, info_span};
use uuid::Uuid;

use crate::error::ApiError;
use crate::facade::{SynthesisFacade, SynthesizeResponse};
use crate::voices::Voice;

/// Path of the synthesis endpoint.
pub const SYNTHESIZE_PATH: &str = "/v1/text:synthesize";
/// Path of the voice listing endpoint.
pub const VOICES_PATH: &str = "/v1/voices";
/// Path of the health endpoint.
pub const HEALTH_PATH: &str = "/health";

/// Shared request state.
#[derive(Clone)]
pub struct AppState {
    facade: SynthesisFacade,
}

impl AppState {
    pub fn new(facade: SynthesisFacade) -> Self {
        Self { facade }
    }

    pub fn facade(&self) -> &SynthesisFacade {
        &self.facade
    }
}

/// Build the router with all endpoints.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(SYNTHESIZE_PATH, post(synthesize))
        .route(VOICES_PATH, get(list_voices))
        .route(HEALTH_PATH, get(health))
        .fallback(not_found)
        .with_state(state)
}

async fn synthesize(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<SynthesizeResponse>, ApiError> {
    let request_id = Uuid::new_v4();
    let span = info_span!("synthesize", %request_id);

    state
        .facade
        .synthesize_json(&body)
        .instrument(span)
        .await
        .map(Json)
}

#[derive(Debug, Deserialize)]
struct VoicesQuery {
    #[serde(rename = "languageCode")]
    language_code: Option<String>,
}

/// One entry of the voice listing, in Google's `voices.list` shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInfo {
    pub name: String,
    pub language_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssml_gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_sample_rate_hertz: Option<u32>,
}

impl From<Voice> for VoiceInfo {
    fn from(voice: Voice) -> Self {
        Self {
            name: voice.name,
            language_codes: vec![voice.language_code],
            ssml_gender: voice.ssml_gender,
            natural_sample_rate_hertz: voice.natural_sample_rate_hertz,
        }
    }
}

/// Body of `GET /v1/voices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoicesResponse {
    pub voices: Vec<VoiceInfo>,
}

async fn list_voices(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VoicesQuery>,
) -> Json<VoicesResponse> {
    let language_code = query.language_code.as_deref().filter(|code| !code.trim().is_empty());
    let voices: Vec<VoiceInfo> = state
        .facade
        .registry()
        .list(language_code)
        .into_iter()
        .map(VoiceInfo::from)
        .collect();

    debug!(language_code = ?language_code, count = voices.len(), "Listed voices");
    Json(VoicesResponse { voices })
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "OK" }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "detail": "Not Found" })))
}
