// Main entry point for the assistive inference gateway

use assistive_gateway::{
    api::{create_router, AppState, RouterLimits},
    core::Config,
    middleware::{CircuitBreaker, CircuitBreakerConfig},
    orchestration::{Backends, InferenceGateway},
    services::{
        Base64ImageDecoder, ExtractOptions, HfInferenceClient, HttpLandmarkSource, ModelCache,
        TesseractOcr,
    },
    utils::Metrics,
};

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Arc::new(Config::new().context("Failed to load configuration")?);

    // Initialize logging
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new(format!(
        "assistive_gateway={},tower_http=info",
        match config.log_level() {
            tracing::Level::TRACE => "trace",
            tracing::Level::DEBUG => "debug",
            tracing::Level::INFO => "info",
            tracing::Level::WARN => "warn",
            tracing::Level::ERROR => "error",
        }
    ));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("=== ASSISTIVE INFERENCE GATEWAY ===");
    info!(
        "Inference API: {} (token: {}), caption model: {}",
        config.backends.hf_inference_url,
        if config.backends.hf_api_token.is_some() { "set" } else { "unset" },
        config.backends.caption_model
    );

    // Initialize metrics
    let metrics = Metrics::new();

    // Hosted inference client serves captioning, model loading and translation
    let circuit_breaker = CircuitBreaker::new(
        "hf_inference",
        CircuitBreakerConfig::from(&config.circuit),
        Some(metrics.clone()),
    );
    let hf_client = Arc::new(HfInferenceClient::new(
        &config,
        circuit_breaker.clone(),
        Some(metrics.clone()),
    )?);

    let landmarks = HttpLandmarkSource::new(config.backends.landmark_endpoint.clone(), config.api_timeout())?;
    if !landmarks.is_configured() {
        warn!("LANDMARK_ENDPOINT not set, sign-to-speech requests will fail");
    }

    let backends = Backends {
        decoder: Arc::new(Base64ImageDecoder::new()),
        caption: hf_client.clone(),
        ocr: Arc::new(TesseractOcr::new(config.backends.tesseract_cmd.clone())),
        translation: hf_client.clone(),
        landmarks: Arc::new(landmarks),
    };

    let cache = ModelCache::new(hf_client, Some(metrics.clone()));
    let extract_options = ExtractOptions {
        max_hands: config.backends.max_hands,
        min_confidence: config.backends.min_detection_confidence,
    };
    let gateway = InferenceGateway::new(backends, cache.clone(), extract_options, metrics.clone());

    // Warm configured languages in the background
    let preload = config.cache.preload_languages.clone();
    if !preload.is_empty() {
        tokio::spawn(async move {
            for (key, result) in cache.preload(&preload).await {
                match result {
                    Ok(()) => info!("Preloaded {} model", key.display_name()),
                    Err(e) => warn!("Preload of {} failed: {}", key.display_name(), e),
                }
            }
        });
    }

    let state = AppState {
        gateway,
        metrics,
        circuit_breaker: Some(circuit_breaker),
    };

    let app = create_router(
        state,
        RouterLimits {
            max_body_bytes: config.server.max_body_bytes,
            request_timeout: config.request_timeout(),
        },
    );

    let addr = format!("{}:{}", config.server_host(), config.server_port());
    info!("{}", "=".repeat(70));
    info!("Server starting on http://{}", addr);
    info!("{}", "-".repeat(70));
    info!("Endpoints:");
    info!("  GET  /                       - Root endpoint");
    info!("  GET  /health                 - Health check");
    info!("  GET  /metrics                - Prometheus metrics");
    info!("  GET  /stats                  - Detailed statistics");
    info!("  POST /api/image-to-speech    - Caption an image");
    info!("  POST /api/read-document      - Extract printed text");
    info!("  POST /api/translate-text     - Translate English text");
    info!("  POST /api/text-to-icon       - Map words to pictograms");
    info!("  POST /api/recognize-command  - Match a voice command intent");
    info!("  POST /api/sign-to-speech     - Recognize a hand sign");
    info!("{}", "=".repeat(70));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
