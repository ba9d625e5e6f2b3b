mod config;
mod rate_limit;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::multipart::{Multipart, MultipartError};
use axum::extract::{DefaultBodyLimit, Json, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use genie_agents::IntentOrchestrator;
use genie_core::{
    IntentQuery, ProcessingResponse, SpeechToTextResponse, TextToSpeechRequest,
};
use genie_observability::{AppMetrics, MetricsSnapshot};
use genie_providers::{ProviderRegistry, ProviderSettings};
use genie_speech::{SpeechSettings, VoicePipeline, MAX_AUDIO_BYTES};
use reqwest::Client;
use serde::Serialize;
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use config::ApiSettings;
pub use rate_limit::{client_key, ClientRateLimiter, RateDecision};

pub const SERVICE_NAME: &str = "HomeGenie Voice Assistant";
pub const SERVICE_VERSION: &str = "2.1.0";
const AUDIO_FIELD: &str = "audio";
const AUDIO_FORMATS: [&str; 5] = ["WAV", "WebM", "MP3", "OGG", "FLAC"];
const RULE_FALLBACK: &str = "Rule-based detection (always available)";

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<IntentOrchestrator>,
    pub voice: Arc<VoicePipeline>,
    pub metrics: Arc<AppMetrics>,
    pub limiter: ClientRateLimiter,
    pub allowed_origins: Arc<Vec<String>>,
}

impl ApiState {
    pub fn new(
        orchestrator: IntentOrchestrator,
        voice: VoicePipeline,
        metrics: Arc<AppMetrics>,
        settings: &ApiSettings,
    ) -> Self {
        Self {
            orchestrator: Arc::new(orchestrator),
            voice: Arc::new(voice),
            metrics,
            limiter: ClientRateLimiter::new(settings.rate_limit_window, settings.rate_limit_max),
            allowed_origins: Arc::new(settings.allowed_origins.clone()),
        }
    }

    fn registry(&self) -> &ProviderRegistry {
        self.orchestrator.registry()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
    timestamp_utc: String,
    ai_provider: &'static str,
    ai_model: String,
    providers_available: usize,
    features: HealthFeatures,
    metrics: MetricsSnapshot,
}

#[derive(Debug, Serialize)]
struct HealthFeatures {
    speech_to_text: &'static str,
    text_to_speech: &'static str,
    ai_processing: String,
    audio_formats: [&'static str; 5],
}

/// Builds the full application from `GENIE_*` environment variables.
pub fn build_app() -> Result<Router> {
    let metrics = AppMetrics::shared();
    let api_settings = ApiSettings::from_env();
    let provider_settings = ProviderSettings::from_env();
    let speech_settings = SpeechSettings::from_env();

    let http_client = Client::builder()
        .connect_timeout(Duration::from_secs(6))
        .timeout(Duration::from_secs(20))
        .build()
        .context("failed to build HTTP client")?;

    let registry = ProviderRegistry::from_settings(&provider_settings, http_client.clone());
    info!(
        active = provider_settings.active.as_str(),
        available = registry.available_count(),
        "provider registry ready"
    );

    let orchestrator = IntentOrchestrator::new(Arc::new(registry), metrics.clone())
        .with_attempt_timeout(provider_settings.attempt_timeout);
    let voice = VoicePipeline::from_settings(&speech_settings, http_client, metrics.clone());

    Ok(build_router(ApiState::new(
        orchestrator,
        voice,
        metrics,
        &api_settings,
    )))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ai-info", get(ai_info))
        .route("/api/speech-to-text", post(speech_to_text))
        .route("/api/text-to-speech", post(text_to_speech))
        .route("/api/recognize-intent", post(recognize_intent))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_AUDIO_BYTES + 64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

async fn root() -> impl IntoResponse {
    Json(json!({
        "service": "HomeGenie Voice Assistant API",
        "version": SERVICE_VERSION,
        "status": "running",
        "endpoints": {
            "health": "/health",
            "ai_info": "/ai-info",
            "speech_to_text": "/api/speech-to-text",
            "text_to_speech": "/api/text-to-speech",
            "recognize_intent": "/api/recognize-intent"
        }
    }))
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let registry = state.registry();
    let primary = registry.primary();
    let ai_model = primary
        .filter(|descriptor| descriptor.available)
        .map(|descriptor| descriptor.model.clone())
        .unwrap_or_else(|| "fallback".to_string());
    let ai_processing = primary
        .filter(|descriptor| descriptor.available)
        .map(|descriptor| descriptor.display_name.to_string())
        .unwrap_or_else(|| RULE_FALLBACK.to_string());

    let payload = HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: SERVICE_VERSION,
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        ai_provider: primary.map(|descriptor| descriptor.name).unwrap_or("rules"),
        ai_model,
        providers_available: registry.available_count(),
        features: HealthFeatures {
            speech_to_text: state.voice.recognizer_name(),
            text_to_speech: state.voice.synthesizer_name(),
            ai_processing,
            audio_formats: AUDIO_FORMATS,
        },
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

async fn ai_info(State(state): State<ApiState>) -> impl IntoResponse {
    let registry = state.registry();
    let mut available = serde_json::Map::new();
    let mut configured = serde_json::Map::new();

    for descriptor in registry.descriptors() {
        let status = if descriptor.available {
            "configured"
        } else {
            "not configured"
        };
        configured.insert(
            format!("{}_configured", descriptor.name),
            json!(descriptor.available),
        );
        available.insert(
            descriptor.name.to_string(),
            json!({
                "name": descriptor.display_name,
                "model": descriptor.model,
                "priority": descriptor.priority,
                "status": status,
            }),
        );
    }

    let mut payload = json!({
        "current_provider": registry.primary().map(|descriptor| descriptor.name),
        "available_providers": available,
        "attempt_timeout_ms": state.orchestrator.attempt_timeout().as_millis() as u64,
        "fallback": RULE_FALLBACK,
    });
    if let Some(object) = payload.as_object_mut() {
        object.extend(configured);
    }
    Json(payload)
}

async fn recognize_intent(
    State(state): State<ApiState>,
    Json(query): Json<IntentQuery>,
) -> impl IntoResponse {
    let query = match query.validated() {
        Ok(query) => query,
        Err(err) => {
            warn!(error = %err, "rejected intent query");
            return Json(ProcessingResponse::rejected(err.to_string()));
        }
    };

    info!(user_id = query.user_id, "processing intent");
    Json(state.orchestrator.recognize_intent(&query).await)
}

async fn speech_to_text(State(state): State<ApiState>, mut multipart: Multipart) -> Response {
    let upload = match read_audio_field(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(SpeechToTextResponse::failed(format!(
                    "Missing multipart field '{}'",
                    AUDIO_FIELD
                ))),
            )
                .into_response()
        }
        Err(err) => {
            warn!(error = %err, "unreadable audio upload");
            return (err.status(), Json(SpeechToTextResponse::failed(err.body_text())))
                .into_response();
        }
    };

    info!(
        filename = upload.filename.as_deref().unwrap_or("<none>"),
        content_type = upload.content_type.as_deref().unwrap_or("<none>"),
        bytes = upload.bytes.len(),
        "received audio upload"
    );

    Json(
        state
            .voice
            .speech_to_text(&upload.bytes, upload.filename.as_deref())
            .await,
    )
    .into_response()
}

struct AudioUpload {
    filename: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

async fn read_audio_field(multipart: &mut Multipart) -> Result<Option<AudioUpload>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(AUDIO_FIELD) {
            continue;
        }

        let filename = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        return Ok(Some(AudioUpload {
            filename,
            content_type,
            bytes: bytes.to_vec(),
        }));
    }
    Ok(None)
}

async fn text_to_speech(
    State(state): State<ApiState>,
    Json(request): Json<TextToSpeechRequest>,
) -> impl IntoResponse {
    Json(state.voice.text_to_speech(&request.text).await)
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() == Method::OPTIONS || !request.uri().path().starts_with("/api/") {
        return next.run(request).await;
    }

    let client = client_key(request.headers());
    match state.limiter.check(&client) {
        RateDecision::Allowed { .. } => next.run(request).await,
        RateDecision::Limited { retry_after } => {
            warn!(client = %client, "rate limit exceeded");
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "success": false,
                    "error": "rate limit exceeded for this client",
                    "retry_after_seconds": retry_after.as_secs().max(1)
                })),
            )
                .into_response();
            if let Ok(value) = HeaderValue::from_str(&retry_after.as_secs().max(1).to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
    }
}

