//! Router tests for the facade endpoints.
//!
//! The synthesis provider is replaced by in-process fakes, so these tests
//! need no network access or credentials.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use proptest::prelude::*;
use serde_json::{Value, json};
use tower::util::ServiceExt;
use tts_facade_common::error::Error;
use tts_facade_server::provider::SynthesisText;
use tts_facade_server::{
    AppState, AudioEncoding, ProviderRequest, StaticVoiceRegistry, SynthesisFacade,
    SynthesisProvider, router,
};

/// Minimal MPEG-1 Layer III frame behind an ID3v2 header.
const FAKE_MP3: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x00\xff\xfb\x90\x64\x00";

struct FakeProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl SynthesisProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    fn supported_encodings(&self) -> &[AudioEncoding] {
        &[AudioEncoding::Mp3, AudioEncoding::Wav, AudioEncoding::Ogg]
    }

    async fn synthesize(&self, _request: ProviderRequest) -> Result<Vec<u8>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FAKE_MP3.to_vec())
    }
}

struct FailingProvider;

#[async_trait]
impl SynthesisProvider for FailingProvider {
    fn name(&self) -> &str {
        "failing"
    }

    fn supported_encodings(&self) -> &[AudioEncoding] {
        &[AudioEncoding::Mp3]
    }

    async fn synthesize(&self, _request: ProviderRequest) -> Result<Vec<u8>, Error> {
        Err(Error::api("https://tts.example/v1/text:synthesize", 500, "model crashed"))
    }
}

struct SlowProvider;

#[async_trait]
impl SynthesisProvider for SlowProvider {
    fn name(&self) -> &str {
        "slow"
    }

    fn supported_encodings(&self) -> &[AudioEncoding] {
        &[AudioEncoding::Mp3]
    }

    async fn synthesize(&self, _request: ProviderRequest) -> Result<Vec<u8>, Error> {
        tokio::time::sleep(Duration::from_secs(10)).await;
        Ok(FAKE_MP3.to_vec())
    }
}

fn app_with(provider: Arc<dyn SynthesisProvider>, timeout: Duration) -> Router {
    let facade = SynthesisFacade::new(Arc::new(StaticVoiceRegistry::builtin()), provider)
        .with_timeout(timeout);
    router(Arc::new(AppState::new(facade)))
}

fn app() -> (Router, Arc<FakeProvider>) {
    let provider = Arc::new(FakeProvider {
        calls: AtomicUsize::new(0),
    });
    (app_with(provider.clone(), Duration::from_secs(5)), provider)
}

fn fixture() -> Value {
    json!({
        "input": {"text": "这是一个测试文本。"},
        "voice": {
            "languageCode": "ZH-CN",
            "name": "female2",
            "style": "",
            "temperature": 0.5,
            "topP": 0.8,
            "topK": 50,
            "seed": 42
        },
        "audioConfig": {
            "audioEncoding": "mp3",
            "speakingRate": 1.0,
            "pitch": 0.0,
            "volumeGainDb": 0.0,
            "sampleRateHertz": 24000,
            "batchSize": 1,
            "spliterThreshold": 100
        }
    })
}

async fn post_raw(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/text:synthesize")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn post(app: Router, body: &Value) -> (StatusCode, Value) {
    post_raw(app, body.to_string()).await
}

async fn get(app: Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

fn decode_audio_content(body: &Value) -> Vec<u8> {
    let content = body["audioContent"].as_str().expect("audioContent missing");
    let payload = content.split(',').nth(1).expect("not a data URI");
    BASE64.decode(payload).expect("invalid base64")
}

#[tokio::test]
async fn test_synthesize_success() {
    let (app, provider) = app();
    let (status, body) = post(app, &fixture()).await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        body["audioContent"]
            .as_str()
            .unwrap()
            .starts_with("data:audio/mp3;base64,")
    );

    let audio = decode_audio_content(&body);
    assert!(!audio.is_empty());
    assert_eq!(&audio[..3], b"ID3", "Expected an MP3 byte stream");
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_synthesize_is_idempotent() {
    let (app, provider) = app();

    let (first_status, first) = post(app.clone(), &fixture()).await;
    let (second_status, second) = post(app, &fixture()).await;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(decode_audio_content(&first), decode_audio_content(&second));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_synthesize_invalid_voice() {
    let (app, provider) = app();
    let mut body = fixture();
    body["voice"]["languageCode"] = json!("EN-US");
    body["voice"]["name"] = json!("invalid_voice");

    let (status, body) = post(app, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("detail").is_some());
    assert!(body["detail"].as_str().unwrap().contains("invalid_voice"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_synthesize_invalid_encoding() {
    let (app, provider) = app();
    let mut body = fixture();
    body["audioConfig"]["audioEncoding"] = json!("invalid_format");

    let (status, body) = post(app, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("invalid_format"));
    assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_synthesize_invalid_voice_and_encoding() {
    let (app, _) = app();
    let mut body = fixture();
    body["voice"]["name"] = json!("invalid_voice");
    body["audioConfig"]["audioEncoding"] = json!("invalid_format");

    let (status, body) = post(app, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = body["detail"].as_str().unwrap();
    assert!(detail.contains("invalid_voice"));
    assert!(detail.contains("invalid_format"));
}

#[tokio::test]
async fn test_synthesize_empty_body_object() {
    let (app, _) = app();
    let (status, body) = post(app, &json!({})).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["msg"], "Field required");
    assert_eq!(body["detail"][0]["type"], "missing");
    assert_eq!(body["detail"][0]["loc"], json!(["body", "input"]));
}

#[tokio::test]
async fn test_synthesize_null_body() {
    let (app, _) = app();
    let (status, body) = post_raw(app, "null").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["type"], "missing");
    assert_eq!(body["detail"][0]["msg"], "Field required");
    assert_eq!(body["detail"][0]["loc"], json!(["body"]));
}

#[tokio::test]
async fn test_synthesize_missing_nested_field() {
    let (app, _) = app();
    let mut body = fixture();
    body["voice"].as_object_mut().unwrap().remove("name");

    let (status, body) = post(app, &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["loc"], json!(["body", "voice", "name"]));
    assert_eq!(body["detail"][0]["msg"], "Field required");
}

#[tokio::test]
async fn test_synthesize_malformed_json() {
    let (app, _) = app();
    let (status, body) = post_raw(app, "{\"input\": ").await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["detail"][0]["type"], "json_invalid");
}

#[tokio::test]
async fn test_synthesize_wrong_field_type() {
    let (app, _) = app();
    let mut body = fixture();
    body["audioConfig"]["speakingRate"] = json!("fast");

    let (status, body) = post(app, &body).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        body["detail"][0]["loc"],
        json!(["body", "audioConfig", "speakingRate"])
    );
}

#[tokio::test]
async fn test_synthesize_out_of_range_is_bad_request() {
    let (app, _) = app();
    let mut body = fixture();
    body["audioConfig"]["speakingRate"] = json!(10.0);

    let (status, body) = post(app, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].as_str().unwrap().contains("speakingRate"));
}

#[tokio::test]
async fn test_synthesize_blank_text_is_bad_request() {
    let (app, _) = app();
    let mut body = fixture();
    body["input"]["text"] = json!("   ");

    let (status, _) = post(app, &body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_provider_failure_is_bad_gateway() {
    let app = app_with(Arc::new(FailingProvider), Duration::from_secs(5));
    let (status, body) = post(app, &fixture()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body.get("detail").is_some());
    assert!(!body["detail"].as_str().unwrap().contains("model crashed"));
}

#[tokio::test(start_paused = true)]
async fn test_provider_timeout_is_gateway_timeout() {
    let app = app_with(Arc::new(SlowProvider), Duration::from_secs(1));
    let (status, body) = post(app, &fixture()).await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(body.get("detail").is_some());
}

#[tokio::test]
async fn test_list_voices() {
    let (app, _) = app();
    let (status, body) = get(app, "/v1/voices").await;

    assert_eq!(status, StatusCode::OK);
    let voices = body["voices"].as_array().unwrap();
    assert_eq!(voices.len(), 6);
    assert!(voices.iter().any(|v| v["name"] == "female2"
        && v["languageCodes"] == json!(["ZH-CN"])
        && v["ssmlGender"] == "FEMALE"
        && v["naturalSampleRateHertz"] == 24000));
}

#[tokio::test]
async fn test_list_voices_by_language() {
    let (app, _) = app();
    let (status, body) = get(app, "/v1/voices?languageCode=en-us").await;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["voices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alice", "Bob"]);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = app();
    let (status, body) = get(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "OK");
}

#[tokio::test]
async fn test_unknown_route() {
    let (app, _) = app();
    let (status, body) = get(app, "/v1/nothing").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Not Found");
}

/// Echoes the requested text back as audio so each response can be traced to its request.
struct EchoProvider {
    calls: AtomicUsize,
}

#[async_trait]
impl SynthesisProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    fn supported_encodings(&self) -> &[AudioEncoding] {
        &[AudioEncoding::Mp3]
    }

    async fn synthesize(&self, request: ProviderRequest) -> Result<Vec<u8>, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match request.text {
            SynthesisText::Plain(text) | SynthesisText::Ssml(text) => Ok(text.into_bytes()),
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_do_not_interfere() {
    let provider = Arc::new(EchoProvider {
        calls: AtomicUsize::new(0),
    });
    let app = app_with(provider.clone(), Duration::from_secs(5));

    let mut handles = Vec::new();
    for i in 0..30usize {
        let (body, expected) = match i % 3 {
            0 => {
                let mut body = fixture();
                body["input"]["text"] = json!(format!("request number {}", i));
                (body, StatusCode::OK)
            }
            1 => {
                let mut body = fixture();
                body["voice"]["name"] = json!(format!("nobody_{}", i));
                (body, StatusCode::BAD_REQUEST)
            }
            _ => (json!({}), StatusCode::UNPROCESSABLE_ENTITY),
        };

        let app = app.clone();
        handles.push(tokio::spawn(async move {
            let (status, response) = post(app, &body).await;
            (i, body, expected, status, response)
        }));
    }

    let mut valid = 0;
    for handle in handles {
        let (i, body, expected, status, response) = handle.await.unwrap();
        assert_eq!(status, expected, "request {} got {}", i, response);

        if expected == StatusCode::OK {
            valid += 1;
            let audio = decode_audio_content(&response);
            assert_eq!(audio, body["input"]["text"].as_str().unwrap().as_bytes());
        } else if expected == StatusCode::BAD_REQUEST {
            let detail = response["detail"].as_str().unwrap();
            assert!(detail.contains(body["voice"]["name"].as_str().unwrap()));
        } else {
            assert_eq!(response["detail"][0]["msg"], "Field required");
            assert_eq!(response["detail"][0]["loc"], json!(["body", "input"]));
        }
    }

    assert_eq!(valid, 10);
    assert_eq!(provider.calls.load(Ordering::SeqCst), valid);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    /// Removing any required field yields 422 with a "Field required" entry.
    #[test]
    fn prop_missing_required_field_is_unprocessable(
        path in prop::sample::select(vec![
            vec!["input"],
            vec!["voice"],
            vec!["audioConfig"],
            vec!["input", "text"],
            vec!["voice", "languageCode"],
            vec!["voice", "name"],
            vec!["audioConfig", "audioEncoding"],
        ])
    ) {
        let mut body = fixture();
        let (last, parents) = path.split_last().unwrap();
        let mut target = &mut body;
        for key in parents {
            target = target.get_mut(*key).unwrap();
        }
        target.as_object_mut().unwrap().remove(*last);

        let rt = tokio::runtime::Runtime::new().unwrap();
        let (status, response) = rt.block_on(async {
            let (app, _) = app();
            post(app, &body).await
        });

        prop_assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let mut expected_loc = vec!["body"];
        expected_loc.extend(path.iter().copied());
        prop_assert_eq!(&response["detail"][0]["msg"], "Field required");
        prop_assert_eq!(&response["detail"][0]["loc"], &json!(expected_loc));
    }

    /// Any voice outside the catalog is rejected before synthesis.
    #[test]
    fn prop_unknown_voice_is_bad_request(name in "[a-z]{1,12}_unknown") {
        let mut body = fixture();
        body["voice"]["name"] = json!(name);

        let rt = tokio::runtime::Runtime::new().unwrap();
        let (status, calls) = rt.block_on(async {
            let (app, provider) = app();
            let (status, _) = post(app, &body).await;
            (status, provider.calls.load(Ordering::SeqCst))
        });

        prop_assert_eq!(status, StatusCode::BAD_REQUEST);
        prop_assert_eq!(calls, 0);
    }
}
