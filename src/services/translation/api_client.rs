use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

use crate::core::config::Config;
use crate::core::types::{CanonicalImage, LanguageKey};
use crate::middleware::circuit_breaker::CircuitBreaker;
use crate::services::backends::{CaptionBackend, ModelEntry, ModelLoader, TranslationBackend};
use crate::utils::{encode_png_async, Metrics};

/// Text used to warm a hosted translation model before it is marked ready
const WARMUP_INPUT: &str = "Hello";

/// Hugging Face hosted inference client with circuit breaker, retries and metrics.
///
/// Serves captioning directly and acts as the translation model loader: a
/// "load" resolves the language's MarianMT checkpoint and waits until the
/// hosted model answers, then hands back a `RemoteModel` handle.
pub struct HfInferenceClient {
    base_url: String,
    api_token: Option<String>,
    caption_model: String,
    max_retries: u32,
    http_client: reqwest::Client,
    circuit_breaker: CircuitBreaker,
    metrics: Option<Metrics>,
}

/// Handle stored inside a `ModelEntry` produced by this client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteModel {
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

#[derive(Debug, Deserialize)]
struct TranslationText {
    translation_text: String,
}

#[derive(Clone, Copy)]
enum Payload<'a> {
    Json(&'a serde_json::Value),
    Png(&'a [u8]),
}

impl HfInferenceClient {
    pub fn new(
        config: &Config,
        circuit_breaker: CircuitBreaker,
        metrics: Option<Metrics>,
    ) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.api_timeout())
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: config.backends.hf_inference_url.clone(),
            api_token: config.backends.hf_api_token.clone(),
            caption_model: config.backends.caption_model.clone(),
            max_retries: config.backends.max_retries,
            http_client,
            circuit_breaker,
            metrics,
        })
    }

    pub fn circuit_breaker(&self) -> &CircuitBreaker {
        &self.circuit_breaker
    }

    fn model_url(&self, model_id: &str) -> String {
        format!("{}/{}", self.base_url, model_id)
    }

    /// Run one logical API call behind the circuit breaker and record its outcome.
    ///
    /// If this future is dropped mid-call the permit records a failure, so a
    /// cancelled half-open call cannot keep the circuit shut.
    async fn guarded<T, F, Fut>(&self, operation: &'static str, call: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let Some(permit) = self.circuit_breaker.try_acquire() else {
            warn!(operation, "Circuit breaker is open, failing fast");
            anyhow::bail!("Circuit breaker is open, inference API is unavailable");
        };

        let start = Instant::now();
        let result = call().await;

        if result.is_ok() {
            permit.success();
        } else {
            permit.failure();
        }
        if let Some(ref m) = self.metrics {
            m.record_api_call(result.is_ok(), start.elapsed());
        }

        result
    }

    /// POST with retries. 503 (model still loading) and 429 wait and retry,
    /// other client errors fail immediately.
    async fn send_with_retries(&self, url: &str, payload: Payload<'_>) -> Result<String> {
        for attempt in 0..=self.max_retries {
            let mut request = self.http_client.post(url);
            if let Some(ref token) = self.api_token {
                request = request.bearer_auth(token);
            }
            request = match payload {
                Payload::Json(body) => request.json(body),
                Payload::Png(bytes) => request
                    .header(reqwest::header::CONTENT_TYPE, "image/png")
                    .body(bytes.to_vec()),
            };

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    return response
                        .text()
                        .await
                        .context("Failed to read response body");
                }
                Ok(response) => {
                    let status = response.status();
                    let error_text = response.text().await.unwrap_or_default();
                    let retryable = status.as_u16() == 429 || status.is_server_error();

                    if !retryable || attempt == self.max_retries {
                        anyhow::bail!("Inference API request failed: {} - {}", status, error_text);
                    }
                    debug!(
                        "Inference API returned {}: {}. Retrying ({}/{})",
                        status,
                        error_text,
                        attempt + 1,
                        self.max_retries
                    );
                }
                Err(e) => {
                    if attempt == self.max_retries {
                        return Err(e).context("HTTP request failed after retries");
                    }
                    debug!(
                        "HTTP request error: {}. Retrying ({}/{})",
                        e,
                        attempt + 1,
                        self.max_retries
                    );
                }
            }

            // Exponential backoff with jitter
            let base_delay = 2_u64.pow(attempt);
            let jitter = rand::random::<u64>() % 250;
            tokio::time::sleep(Duration::from_millis(base_delay * 500 + jitter)).await;
        }

        anyhow::bail!("Failed after {} retries", self.max_retries)
    }

    async fn run_translation(&self, endpoint: &str, text: &str) -> Result<String> {
        let body = serde_json::json!({
            "inputs": text,
            "options": { "wait_for_model": true }
        });
        let response = self.send_with_retries(endpoint, Payload::Json(&body)).await?;
        parse_translation(&response)
    }
}

#[async_trait]
impl CaptionBackend for HfInferenceClient {
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    async fn caption(&self, image: &CanonicalImage) -> Result<String> {
        let png = encode_png_async(image.pixels.clone()).await?;
        let url = self.model_url(&self.caption_model);

        self.guarded("caption", || async {
            let response = self.send_with_retries(&url, Payload::Png(&png)).await?;
            parse_caption(&response)
        })
        .await
    }

    fn name(&self) -> &str {
        "hf-caption"
    }
}

#[async_trait]
impl ModelLoader for HfInferenceClient {
    #[instrument(skip(self))]
    async fn load(&self, key: LanguageKey) -> Result<ModelEntry> {
        let endpoint = self.model_url(key.model_id());

        self.guarded("load", || async {
            self.run_translation(&endpoint, WARMUP_INPUT)
                .await
                .with_context(|| format!("Warm-up of {} failed", key.model_id()))
        })
        .await?;

        Ok(ModelEntry::new(key, key.model_id(), RemoteModel { endpoint }))
    }
}

#[async_trait]
impl TranslationBackend for HfInferenceClient {
    #[instrument(skip(self, text, model), fields(language = %model.key(), chars = text.len()))]
    async fn translate(&self, text: &str, model: &ModelEntry) -> Result<String> {
        let remote = model
            .handle::<RemoteModel>()
            .context("Model entry was not loaded by the hosted inference client")?;

        self.guarded("translate", || self.run_translation(&remote.endpoint, text))
            .await
    }

    fn name(&self) -> &str {
        "hf-translation"
    }
}

fn parse_caption(response: &str) -> Result<String> {
    let outputs: Vec<GeneratedText> =
        serde_json::from_str(response).context("Failed to parse caption response")?;
    outputs
        .into_iter()
        .next()
        .map(|o| o.generated_text.trim().to_string())
        .context("Caption response contained no output")
}

fn parse_translation(response: &str) -> Result<String> {
    let outputs: Vec<TranslationText> =
        serde_json::from_str(response).context("Failed to parse translation response")?;
    outputs
        .into_iter()
        .next()
        .map(|o| o.translation_text)
        .context("Translation response contained no output")
}
