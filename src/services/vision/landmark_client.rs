use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::types::CanonicalImage;
use crate::services::backends::{ExtractOptions, LandmarkSource};
use crate::services::gesture::{Landmark, LandmarkSet};
use crate::utils::encode_png_async;

#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    image: &'a str,
    max_hands: usize,
    min_detection_confidence: f32,
}

/// A tracked point as sent by the sidecar; either coordinate may be missing
#[derive(Debug, Deserialize)]
struct RawPoint {
    x: Option<f32>,
    y: Option<f32>,
}

impl RawPoint {
    fn into_landmark(self) -> Option<Landmark> {
        Some(Landmark::new(self.x?, self.y?))
    }
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    #[serde(default)]
    hands: Vec<Vec<RawPoint>>,
}

/// Parse a hand-tracking response body into one landmark set per hand.
///
/// Incomplete points become absent joints, which the classifier reports as
/// malformed input.
pub fn parse_hands(body: &str) -> Result<Vec<LandmarkSet>> {
    let parsed: ExtractResponse =
        serde_json::from_str(body).context("Failed to parse hand tracking response")?;
    Ok(parsed
        .hands
        .into_iter()
        .map(|points| {
            LandmarkSet::from_optional_points(points.into_iter().map(RawPoint::into_landmark))
        })
        .collect())
}

/// Landmark source backed by an HTTP hand-tracking sidecar
pub struct HttpLandmarkSource {
    endpoint: Option<String>,
    http_client: reqwest::Client,
}

impl HttpLandmarkSource {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            endpoint,
            http_client,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

#[async_trait]
impl LandmarkSource for HttpLandmarkSource {
    #[instrument(skip(self, image), fields(width = image.width(), height = image.height()))]
    async fn extract(
        &self,
        image: &CanonicalImage,
        options: ExtractOptions,
    ) -> Result<Vec<LandmarkSet>> {
        let Some(ref endpoint) = self.endpoint else {
            bail!("Hand tracking is not configured (set LANDMARK_ENDPOINT)");
        };

        let png = encode_png_async(image.pixels.clone()).await?;
        let encoded = STANDARD.encode(&png);
        let request = ExtractRequest {
            image: &encoded,
            max_hands: options.max_hands,
            min_detection_confidence: options.min_confidence,
        };

        let response = self
            .http_client
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .context("Failed to reach hand tracking service")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read hand tracking response")?;
        if !status.is_success() {
            bail!("Hand tracking service returned {}: {}", status, body);
        }

        let mut hands = parse_hands(&body)?;
        hands.truncate(options.max_hands);
        debug!("Hand tracking found {} hand(s)", hands.len());
        Ok(hands)
    }

    fn name(&self) -> &str {
        "hand_tracking"
    }
}
