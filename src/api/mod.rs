//! HTTP routes and handlers

mod error;

pub use error::ApiError;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::core::types::{GatewayRequest, GatewayResponse};
use crate::middleware::CircuitBreaker;
use crate::orchestration::InferenceGateway;
use crate::utils::Metrics;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: InferenceGateway,
    pub metrics: Metrics,
    /// Breaker of the hosted inference client, reported on /health
    pub circuit_breaker: Option<CircuitBreaker>,
}

/// Router limits taken from configuration
#[derive(Debug, Clone, Copy)]
pub struct RouterLimits {
    pub max_body_bytes: usize,
    pub request_timeout: Duration,
}

pub fn create_router(state: AppState, limits: RouterLimits) -> Router {
    let api_routes = Router::new()
        .route("/image-to-speech", post(image_to_speech))
        .route("/read-document", post(read_document))
        .route("/translate-text", post(translate_text))
        .route("/text-to-icon", post(text_to_icon))
        .route("/recognize-command", post(recognize_command))
        .route("/sign-to-speech", post(sign_to_speech));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/metrics", get(metrics_endpoint))
        .route("/stats", get(stats_endpoint))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(limits.max_body_bytes))
        .layer(TimeoutLayer::new(limits.request_timeout))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageBody {
    image_data: String,
}

#[derive(Debug, Deserialize)]
struct TranslateBody {
    #[serde(default)]
    text: String,
    target_lang: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IconBody {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct CommandBody {
    #[serde(default)]
    command: String,
}

type ApiResult = Result<Json<GatewayResponse>, ApiError>;

async fn dispatch(state: &AppState, request: GatewayRequest) -> ApiResult {
    Ok(Json(state.gateway.handle(request).await?))
}

async fn image_to_speech(
    State(state): State<AppState>,
    body: Result<Json<ImageBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    dispatch(&state, GatewayRequest::Caption { image_data: body.image_data }).await
}

async fn read_document(
    State(state): State<AppState>,
    body: Result<Json<ImageBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    dispatch(&state, GatewayRequest::ExtractText { image_data: body.image_data }).await
}

async fn translate_text(
    State(state): State<AppState>,
    body: Result<Json<TranslateBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    dispatch(
        &state,
        GatewayRequest::Translate {
            text: body.text,
            target_lang: body.target_lang,
        },
    )
    .await
}

async fn text_to_icon(
    State(state): State<AppState>,
    body: Result<Json<IconBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    dispatch(&state, GatewayRequest::TextToIcon { text: body.text }).await
}

async fn recognize_command(
    State(state): State<AppState>,
    body: Result<Json<CommandBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    dispatch(&state, GatewayRequest::RecognizeIntent { command: body.command }).await
}

async fn sign_to_speech(
    State(state): State<AppState>,
    body: Result<Json<ImageBody>, JsonRejection>,
) -> ApiResult {
    let Json(body) = body?;
    dispatch(&state, GatewayRequest::SignToSpeech { image_data: body.image_data }).await
}

async fn root() -> &'static str {
    "Assistive Inference Gateway"
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "models": state.gateway.health(),
        "circuit_breaker": state.circuit_breaker.as_ref().map(|cb| cb.stats()),
    }))
}

/// Prometheus metrics endpoint
async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("Content-Type", "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

/// Detailed statistics endpoint (JSON)
async fn stats_endpoint(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    serde_json::to_value(state.metrics.snapshot())
        .map(Json)
        .map_err(|e| ApiError::internal("serialization_error", format!("Failed to serialize metrics: {}", e)))
}
