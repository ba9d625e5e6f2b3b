use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use futures::future::BoxFuture;
use genie_agents::IntentOrchestrator;
use genie_api::{build_router, ApiSettings, ApiState};
use genie_observability::AppMetrics;
use genie_providers::{IntentProvider, ProviderError, ProviderRegistry, RegisteredProvider};
use genie_speech::{
    encode_wav, AudioTranscoder, NormalizedAudio, SpeechError, SpeechRecognizer,
    SpeechSynthesizer, VoicePipeline,
};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "genie-test-boundary";

struct CannedProvider {
    name: &'static str,
    reply: Result<&'static str, ()>,
}

impl IntentProvider for CannedProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    fn model(&self) -> &str {
        "canned-model"
    }

    fn generate<'a>(&'a self, _prompt: &'a str) -> BoxFuture<'a, Result<String, ProviderError>> {
        Box::pin(async move {
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(()) => Err(ProviderError::Status {
                    provider: self.name,
                    status: 503,
                    body: "overloaded".to_string(),
                }),
            }
        })
    }
}

struct SilenceTranscoder;

impl AudioTranscoder for SilenceTranscoder {
    fn to_wav<'a>(
        &'a self,
        input: &'a [u8],
        _format_hint: Option<&'a str>,
    ) -> BoxFuture<'a, Result<NormalizedAudio, SpeechError>> {
        Box::pin(async move { encode_wav(&vec![0; input.len()]) })
    }
}

struct FixedRecognizer;

impl SpeechRecognizer for FixedRecognizer {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn recognize<'a>(&'a self, _audio: &'a NormalizedAudio) -> BoxFuture<'a, Result<String, SpeechError>> {
        Box::pin(async { Ok("my kitchen sink is leaking".to_string()) })
    }
}

struct EchoSynthesizer;

impl SpeechSynthesizer for EchoSynthesizer {
    fn name(&self) -> &'static str {
        "echo"
    }

    fn synthesize<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<Vec<u8>, SpeechError>> {
        Box::pin(async move { Ok(text.as_bytes().to_vec()) })
    }
}

fn failing(name: &'static str) -> RegisteredProvider {
    RegisteredProvider::ready(
        0,
        "Failing",
        Arc::new(CannedProvider {
            name,
            reply: Err(()),
        }),
    )
}

fn answering(priority: usize, name: &'static str, reply: &'static str) -> RegisteredProvider {
    RegisteredProvider::ready(
        priority,
        "Canned",
        Arc::new(CannedProvider {
            name,
            reply: Ok(reply),
        }),
    )
}

fn app_with(providers: Vec<RegisteredProvider>, settings: ApiSettings) -> Router {
    let metrics = AppMetrics::shared();
    let orchestrator = IntentOrchestrator::new(
        Arc::new(ProviderRegistry::new(providers)),
        metrics.clone(),
    )
    .with_attempt_timeout(Duration::from_millis(500));
    let voice = VoicePipeline::new(
        Arc::new(SilenceTranscoder),
        Arc::new(FixedRecognizer),
        Arc::new(EchoSynthesizer),
        metrics.clone(),
    );

    build_router(ApiState::new(orchestrator, voice, metrics, &settings))
}

fn app(providers: Vec<RegisteredProvider>) -> Router {
    app_with(providers, ApiSettings::default())
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap()
}

fn post_audio(field: &str, filename: &str, audio: &[u8]) -> Request<Body> {
    let mut body = format!(
        "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: audio/webm\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(audio);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/speech-to-text")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn approx(value: &Value, expected: f64) -> bool {
    value
        .as_f64()
        .is_some_and(|actual| (actual - expected).abs() < 1e-4)
}

#[tokio::test]
async fn health_reports_service_identity() {
    let response = app(Vec::new()).oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["service"], "HomeGenie Voice Assistant");
    assert_eq!(body["version"], "2.1.0");
    assert_eq!(body["ai_model"], "fallback");
    assert_eq!(body["metrics"]["requests_total"], 0);
}

#[tokio::test]
async fn root_lists_endpoints() {
    let body = read_json(app(Vec::new()).oneshot(get("/")).await.unwrap()).await;
    assert_eq!(body["endpoints"]["recognize_intent"], "/api/recognize-intent");
    assert_eq!(body["endpoints"]["speech_to_text"], "/api/speech-to-text");
}

#[tokio::test]
async fn ai_info_reports_provider_status() {
    let providers = vec![
        RegisteredProvider::unconfigured(0, "gemini", "Google Gemini", "gemini-2.0-flash-exp"),
        answering(1, "huggingface", r#"{"intent":"UNKNOWN"}"#),
    ];
    let body = read_json(app(providers).oneshot(get("/ai-info")).await.unwrap()).await;

    assert_eq!(body["current_provider"], "gemini");
    assert_eq!(body["gemini_configured"], false);
    assert_eq!(body["huggingface_configured"], true);
    assert_eq!(body["available_providers"]["gemini"]["status"], "not configured");
    assert_eq!(body["fallback"], "Rule-based detection (always available)");
}

#[tokio::test]
async fn failing_providers_fall_back_to_rules() {
    let app = app(vec![failing("gemini"), failing("huggingface")]);
    let response = app
        .clone()
        .oneshot(post_json(
            "/api/recognize-intent",
            json!({ "query": "My sink is leaking", "userId": 42 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert!(body["error"].is_null());
    assert_eq!(body["intent"]["intent"], "CREATE_MAINTENANCE_REQUEST");
    assert!(approx(&body["intent"]["confidence"], 0.8));
    assert_eq!(body["intent"]["extractedData"]["category"], "PLUMBING");
    assert_eq!(body["intent"]["isEmergency"], false);
    assert!(body["response"].as_str().unwrap().contains("HIGH priority"));

    let health = read_json(app.oneshot(get("/health")).await.unwrap()).await;
    assert_eq!(health["metrics"]["rule_fallbacks_total"], 1);
    assert_eq!(health["metrics"]["provider_failures_total"], 2);
}

#[tokio::test]
async fn emergency_without_maintenance_words_is_flagged() {
    let response = app(Vec::new())
        .oneshot(post_json(
            "/api/recognize-intent",
            json!({ "query": "There's a fire! Emergency!", "userId": 1 }),
        ))
        .await
        .unwrap();

    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["intent"]["intent"], "GENERAL_INQUIRY");
    assert!(approx(&body["intent"]["confidence"], 0.5));
    assert_eq!(body["intent"]["isEmergency"], true);
}

#[tokio::test]
async fn status_question_outranks_emergency_words() {
    let response = app(Vec::new())
        .oneshot(post_json(
            "/api/recognize-intent",
            json!({ "query": "What's the status of my urgent request?", "userId": 1 }),
        ))
        .await
        .unwrap();

    let body = read_json(response).await;
    assert_eq!(body["intent"]["intent"], "QUERY_STATUS");
    assert_eq!(body["intent"]["isEmergency"], false);
    assert_eq!(body["response"], "Let me check the status of your request.");
}

#[tokio::test]
async fn fenced_provider_output_is_used() {
    let providers = vec![
        failing("gemini"),
        answering(
            1,
            "huggingface",
            "```json\n{\"intent\":\"EMERGENCY\",\"confidence\":0.97,\"isEmergency\":true,\"response\":\"Call 911 and leave the building.\"}\n```",
        ),
    ];
    let response = app(providers)
        .oneshot(post_json(
            "/api/recognize-intent",
            json!({ "query": "I smell gas", "userId": 5, "context": "Unit 4B" }),
        ))
        .await
        .unwrap();

    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["response"], "Call 911 and leave the building.");
    assert_eq!(body["intent"]["intent"], "EMERGENCY");
    assert_eq!(body["intent"]["isEmergency"], true);
    assert_eq!(
        body["intent"]["additionalInfo"],
        "Call 911 and leave the building."
    );
}

#[tokio::test]
async fn empty_query_is_rejected_in_payload() {
    let response = app(Vec::new())
        .oneshot(post_json(
            "/api/recognize-intent",
            json!({ "query": "   ", "userId": 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/recognize-intent")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(Vec::new()).oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn empty_audio_upload_is_reported() {
    let response = app(Vec::new())
        .oneshot(post_audio("audio", "recording.webm", b""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = read_json(response).await;
    assert_eq!(body["success"], false);
    assert!(approx(&body["confidence"], 0.0));
    assert!(body["error"].as_str().unwrap().contains("empty"));
}

#[tokio::test]
async fn audio_upload_is_transcribed() {
    let response = app(Vec::new())
        .oneshot(post_audio("audio", "recording.webm", &[7u8; 4_096]))
        .await
        .unwrap();

    let body = read_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["text"], "my kitchen sink is leaking");
    assert!(approx(&body["confidence"], 0.9));
}

#[tokio::test]
async fn upload_without_audio_field_is_bad_request() {
    let response = app(Vec::new())
        .oneshot(post_audio("file", "recording.webm", &[7u8; 64]))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = read_json(response).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn text_to_speech_returns_mp3_payload() {
    let app = app(Vec::new());

    let ok = read_json(
        app.clone()
            .oneshot(post_json(
                "/api/text-to-speech",
                json!({ "text": "Your request was created." }),
            ))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(ok["success"], true);
    assert_eq!(ok["format"], "mp3");
    assert!(!ok["audioBase64"].as_str().unwrap().is_empty());

    let empty = read_json(
        app.oneshot(post_json("/api/text-to-speech", json!({ "text": "" })))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(empty["success"], false);
    assert_eq!(empty["audioBase64"], "");
    assert!(empty["format"].is_null());
}

#[tokio::test]
async fn api_routes_are_rate_limited_per_client() {
    let settings = ApiSettings {
        rate_limit_max: 2,
        ..ApiSettings::default()
    };
    let app = app_with(Vec::new(), settings);
    let request = || {
        let mut request = post_json(
            "/api/recognize-intent",
            json!({ "query": "list my requests", "userId": 3 }),
        );
        request
            .headers_mut()
            .insert("x-forwarded-for", "198.51.100.7".parse().unwrap());
        request
    };

    for _ in 0..2 {
        let response = app.clone().oneshot(request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let limited = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));

    let health = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
}
