//! HTTP route layer: health/config endpoints, the speech preview, and
//! the streaming synthesis endpoint.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{info, warn};

use lightning_core::LightningClient;

use crate::config::ServerConfig;
use crate::error::ApiError;
use crate::pipeline::{self, SpeakRequest, SpeakResponse};
use crate::validation::validate_speak_request;

#[derive(Clone)]
pub struct AppState {
    pub lightning: Arc<LightningClient>,
    pub request_count: Arc<AtomicU64>,
    pub started_at: Instant,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(client: LightningClient, config: ServerConfig) -> Self {
        Self {
            lightning: Arc::new(client),
            request_count: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
            config,
        }
    }
}

/// Build the full application router. Shared between the binary and the
/// integration tests.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(cors)
        .into_inner();

    let api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/metrics", get(metrics_endpoint))
        .route("/lightning/speak", post(lightning_speak))
        .route("/lightning/stream", post(lightning_stream));

    Router::new()
        .route("/", get(root))
        .merge(api.clone()) // root paths
        .nest("/api", api) // /api prefix
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack)
        .with_state(state)
}

// CORS configuration - environment-aware
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let permissive = || {
        CorsLayer::new()
            .allow_origin(tower_http::cors::Any)
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(tower_http::cors::Any)
    };

    match &config.cors_allowed_origins {
        Some(allowed_origins) => {
            let origins: Vec<axum::http::HeaderValue> = allowed_origins
                .iter()
                .filter_map(|origin| origin.parse::<axum::http::HeaderValue>().ok())
                .collect();

            if origins.is_empty() {
                warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
                permissive()
            } else {
                info!("CORS configured for {} origin(s)", origins.len());
                CorsLayer::new()
                    .allow_origin(tower_http::cors::AllowOrigin::list(origins))
                    .allow_methods([
                        axum::http::Method::GET,
                        axum::http::Method::POST,
                        axum::http::Method::OPTIONS,
                    ])
                    .allow_headers(tower_http::cors::Any)
            }
        }
        None => {
            warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
            permissive()
        }
    }
}

// Request ID middleware for tracing
async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    request.headers_mut().insert(
        "x-request-id",
        axum::http::HeaderValue::from_str(&request_id).unwrap(),
    );
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        "x-request-id",
        axum::http::HeaderValue::from_str(&request_id).unwrap(),
    );
    response
}

pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "service": "AI Voice Lecture Backend",
        "health": "/health",
        "speak": "/lightning/speak",
        "stream": "/lightning/stream",
    }))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub environment: String,
    pub service: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        environment: state.config.app_env.clone(),
        service: "AI Voice Lecture Backend",
    })
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub cpu_usage_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub memory_usage_percent: f32,
    pub request_count: u64,
    pub uptime_seconds: u64,
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    let mut system = sysinfo::System::new();
    system.refresh_cpu();
    system.refresh_memory();

    let cpu_usage = system.global_cpu_info().cpu_usage();
    let memory_used = system.used_memory();
    let memory_total = system.total_memory();
    let memory_usage_percent = if memory_total > 0 {
        (memory_used as f64 / memory_total as f64 * 100.0) as f32
    } else {
        0.0
    };

    Json(MetricsResponse {
        cpu_usage_percent: cpu_usage,
        memory_used_mb: memory_used / 1024 / 1024,
        memory_total_mb: memory_total / 1024 / 1024,
        memory_usage_percent,
        request_count: state.request_count.load(Ordering::Relaxed),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}

/// Preview endpoint: parse only, never contacts the upstream provider.
pub async fn lightning_speak(
    State(state): State<AppState>,
    Json(req): Json<SpeakRequest>,
) -> Result<Json<SpeakResponse>, ApiError> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    validate_speak_request(&req.latex_summary)?;
    Ok(Json(pipeline::speak_preview(&req)))
}

/// Streaming endpoint: raw PCM bytes for browser playback.
pub async fn lightning_stream(
    State(state): State<AppState>,
    Json(req): Json<SpeakRequest>,
) -> Result<Response, ApiError> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    validate_speak_request(&req.latex_summary)?;

    let settings = state.lightning.settings().clone();
    let stream = pipeline::stream_speech(state.lightning.clone(), req).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header("x-sample-rate", settings.sample_rate.to_string())
        .header("x-output-format", settings.output_format)
        .body(Body::from_stream(stream))
        .map_err(|err| ApiError::Internal(err.to_string()))
}
