// Inference gateway: dispatches typed requests to backends and the model cache

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use crate::core::errors::{GatewayError, GatewayResult};
use crate::core::types::{
    GatewayRequest, GatewayResponse, GestureLabel, IconResult, Intent, LanguageKey,
    TargetLanguage,
};
use crate::services::backends::{
    CaptionBackend, ExtractOptions, ImageDecoder, LandmarkSource, OcrBackend, TranslationBackend,
};
use crate::services::gesture::classify;
use crate::services::lexicon::{recognize_intent, text_to_icon};
use crate::services::translation::{LoadState, ModelCache};
use crate::utils::Metrics;

/// Returned when OCR finds nothing but whitespace
pub const NO_TEXT_FOUND: &str = "No readable text was found in the image.";

/// Returned when no tracked hand forms a known sign
pub const NO_SIGN_DETECTED: &str = "No sign detected";

/// External collaborators the gateway dispatches to
#[derive(Clone)]
pub struct Backends {
    pub decoder: Arc<dyn ImageDecoder>,
    pub caption: Arc<dyn CaptionBackend>,
    pub ocr: Arc<dyn OcrBackend>,
    pub translation: Arc<dyn TranslationBackend>,
    pub landmarks: Arc<dyn LandmarkSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GatewayHealth {
    pub loaded_languages: Vec<LanguageKey>,
    pub model_states: BTreeMap<&'static str, LoadState>,
}

/// Request façade over the backends and the translation model cache.
///
/// Every component failure is converted into `GatewayError` here and nowhere
/// else.
#[derive(Clone)]
pub struct InferenceGateway {
    backends: Backends,
    cache: ModelCache,
    extract_options: ExtractOptions,
    metrics: Metrics,
}

impl InferenceGateway {
    pub fn new(
        backends: Backends,
        cache: ModelCache,
        extract_options: ExtractOptions,
        metrics: Metrics,
    ) -> Self {
        Self {
            backends,
            cache,
            extract_options,
            metrics,
        }
    }

    pub fn cache(&self) -> &ModelCache {
        &self.cache
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Dispatch one request and record its outcome
    #[instrument(skip(self, request), fields(kind = request.kind().as_str()))]
    pub async fn handle(&self, request: GatewayRequest) -> GatewayResult<GatewayResponse> {
        let kind = request.kind();
        let start = Instant::now();

        let result = match request {
            GatewayRequest::Caption { image_data } => self
                .caption(&image_data)
                .await
                .map(|caption| GatewayResponse::Caption { caption }),
            GatewayRequest::ExtractText { image_data } => self
                .extract_text(&image_data)
                .await
                .map(|text| GatewayResponse::Text { text }),
            GatewayRequest::Translate { text, target_lang } => self
                .translate(&text, target_lang.as_deref())
                .await
                .map(|translated_text| GatewayResponse::Translation { translated_text }),
            GatewayRequest::TextToIcon { text } => Ok(GatewayResponse::Icons(self.text_to_icon(&text))),
            GatewayRequest::RecognizeIntent { command } => Ok(GatewayResponse::Intent {
                intent: self.recognize_intent(&command),
            }),
            GatewayRequest::SignToSpeech { image_data } => self
                .sign_to_speech(&image_data)
                .await
                .map(|word| GatewayResponse::Sign { word }),
        };

        let elapsed = start.elapsed();
        self.metrics.record_request(kind, elapsed);
        match &result {
            Ok(_) => debug!("{} completed in {:.0}ms", kind.as_str(), elapsed.as_secs_f64() * 1000.0),
            Err(e) if e.is_client_error() => {
                self.metrics.record_error(true);
                warn!(error_kind = e.kind(), "{} rejected: {}", kind.as_str(), e);
            }
            Err(e) => {
                self.metrics.record_error(false);
                error!(error_kind = e.kind(), "{} failed: {}", kind.as_str(), e);
            }
        }

        result
    }

    pub async fn caption(&self, image_data: &str) -> GatewayResult<String> {
        let image = self.backends.decoder.decode(image_data).await?;
        self.backends
            .caption
            .caption(&image)
            .await
            .map_err(|e| GatewayError::backend("caption", &e))
    }

    pub async fn extract_text(&self, image_data: &str) -> GatewayResult<String> {
        let image = self.backends.decoder.decode(image_data).await?;
        let text = self
            .backends
            .ocr
            .extract_text(&image)
            .await
            .map_err(|e| GatewayError::backend("ocr", &e))?;

        if text.trim().is_empty() {
            return Ok(NO_TEXT_FOUND.to_string());
        }
        Ok(text)
    }

    /// Translate English text. A missing or `en` target is identity and never
    /// touches the model cache.
    pub async fn translate(&self, text: &str, target_lang: Option<&str>) -> GatewayResult<String> {
        let key = match TargetLanguage::resolve(target_lang)? {
            TargetLanguage::Source => return Ok(text.to_string()),
            TargetLanguage::Model(key) => key,
        };

        let model = self.cache.get_or_load(key).await?;
        debug!("Translating {} chars to {}", text.len(), key.display_name());

        self.backends
            .translation
            .translate(text, &model)
            .await
            .map_err(|e| GatewayError::backend("translation", &e))
    }

    pub fn text_to_icon(&self, text: &str) -> IconResult {
        text_to_icon(text)
    }

    pub fn recognize_intent(&self, command: &str) -> Intent {
        recognize_intent(command)
    }

    /// Classify tracked hands in order; the first known sign wins.
    pub async fn sign_to_speech(&self, image_data: &str) -> GatewayResult<String> {
        let image = self.backends.decoder.decode(image_data).await?;
        let hands = self
            .backends
            .landmarks
            .extract(&image, self.extract_options)
            .await
            .map_err(|e| GatewayError::backend("hand_tracking", &e))?;

        for hand in &hands {
            let label = classify(hand)?;
            if label != GestureLabel::None {
                info!("Recognized sign: {}", label.as_str());
                return Ok(label.as_str().to_string());
            }
        }

        debug!("No sign among {} hand(s)", hands.len());
        Ok(NO_SIGN_DETECTED.to_string())
    }

    pub fn health(&self) -> GatewayHealth {
        GatewayHealth {
            loaded_languages: self.cache.loaded_keys(),
            model_states: LanguageKey::ALL
                .iter()
                .map(|key| (key.code(), self.cache.state(*key)))
                .collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::errors::DecodeError;
    use crate::core::types::CanonicalImage;
    use crate::services::backends::{ModelEntry, ModelLoader};
    use crate::services::gesture::{HandJoint, Landmark, LandmarkSet};
    use crate::services::vision::Base64ImageDecoder;
    use crate::utils::encode_png_sync;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use image::{Rgb, RgbImage};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub struct FakeCaption(pub Option<String>);

    #[async_trait]
    impl CaptionBackend for FakeCaption {
        async fn caption(&self, _image: &CanonicalImage) -> Result<String> {
            self.0.clone().ok_or_else(|| anyhow!("caption model unavailable"))
        }

        fn name(&self) -> &str {
            "fake_caption"
        }
    }

    pub struct FakeOcr(pub String);

    #[async_trait]
    impl OcrBackend for FakeOcr {
        async fn extract_text(&self, _image: &CanonicalImage) -> Result<String> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fake_ocr"
        }
    }

    #[derive(Default)]
    pub struct CountingLoader {
        pub loads: AtomicUsize,
    }

    #[async_trait]
    impl ModelLoader for CountingLoader {
        async fn load(&self, key: LanguageKey) -> Result<ModelEntry> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            Ok(ModelEntry::new(key, key.model_id(), key.code().to_string()))
        }
    }

    /// Tags the text with the model's language
    pub struct FakeTranslator;

    #[async_trait]
    impl TranslationBackend for FakeTranslator {
        async fn translate(&self, text: &str, model: &ModelEntry) -> Result<String> {
            let code = model
                .handle::<String>()
                .ok_or_else(|| anyhow!("unexpected model handle"))?;
            Ok(format!("[{}] {}", code, text))
        }

        fn name(&self) -> &str {
            "fake_translator"
        }
    }

    pub struct FakeLandmarks(pub Mutex<Vec<LandmarkSet>>);

    #[async_trait]
    impl LandmarkSource for FakeLandmarks {
        async fn extract(
            &self,
            _image: &CanonicalImage,
            options: ExtractOptions,
        ) -> Result<Vec<LandmarkSet>> {
            let mut hands = self.0.lock().clone();
            hands.truncate(options.max_hands);
            Ok(hands)
        }

        fn name(&self) -> &str {
            "fake_landmarks"
        }
    }

    pub struct Harness {
        pub gateway: InferenceGateway,
        pub loader: Arc<CountingLoader>,
    }

    pub fn harness_with(
        caption: Option<&str>,
        ocr_text: &str,
        hands: Vec<LandmarkSet>,
        max_hands: usize,
    ) -> Harness {
        let metrics = Metrics::new();
        let loader = Arc::new(CountingLoader::default());
        let cache = ModelCache::new(loader.clone(), Some(metrics.clone()));
        let backends = Backends {
            decoder: Arc::new(Base64ImageDecoder::new()),
            caption: Arc::new(FakeCaption(caption.map(str::to_string))),
            ocr: Arc::new(FakeOcr(ocr_text.to_string())),
            translation: Arc::new(FakeTranslator),
            landmarks: Arc::new(FakeLandmarks(Mutex::new(hands))),
        };
        let options = ExtractOptions {
            max_hands,
            ..ExtractOptions::default()
        };

        Harness {
            gateway: InferenceGateway::new(backends, cache, options, metrics),
            loader,
        }
    }

    pub fn harness() -> Harness {
        harness_with(Some("a dog on a beach"), "EXIT", Vec::new(), 1)
    }

    pub fn sample_image() -> String {
        let img = RgbImage::from_pixel(4, 4, Rgb([200, 200, 200]));
        format!(
            "data:image/png;base64,{}",
            STANDARD.encode(encode_png_sync(&img).unwrap())
        )
    }

    fn hand(thumb: (f32, f32), finger_tip_y: f32) -> LandmarkSet {
        let pip = 0.5;
        LandmarkSet::new()
            .with(HandJoint::ThumbTip, Landmark::new(thumb.0, thumb.1))
            .with(HandJoint::IndexTip, Landmark::new(0.4, finger_tip_y))
            .with(HandJoint::IndexPip, Landmark::new(0.4, pip))
            .with(HandJoint::MiddleTip, Landmark::new(0.5, finger_tip_y))
            .with(HandJoint::MiddlePip, Landmark::new(0.5, pip))
            .with(HandJoint::RingTip, Landmark::new(0.6, finger_tip_y))
            .with(HandJoint::RingPip, Landmark::new(0.6, pip))
            .with(HandJoint::PinkyTip, Landmark::new(0.7, finger_tip_y))
            .with(HandJoint::PinkyPip, Landmark::new(0.7, pip))
    }

    pub fn open_palm() -> LandmarkSet {
        hand((0.2, 0.6), 0.3)
    }

    pub fn thumbs_up() -> LandmarkSet {
        hand((0.3, 0.1), 0.7)
    }

    /// Curled fingers with the thumb left of the index and below its PIP
    pub fn unknown_pose() -> LandmarkSet {
        hand((0.1, 0.65), 0.7)
    }

    #[tokio::test]
    async fn test_caption() {
        let h = harness();
        let response = h
            .gateway
            .handle(GatewayRequest::Caption {
                image_data: sample_image(),
            })
            .await
            .unwrap();
        assert_eq!(
            response,
            GatewayResponse::Caption {
                caption: "a dog on a beach".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_caption_backend_failure_is_server_error() {
        let h = harness_with(None, "", Vec::new(), 1);
        let err = h.gateway.caption(&sample_image()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Backend { backend: "caption", .. }));
        assert!(!err.is_client_error());
    }

    #[tokio::test]
    async fn test_invalid_image_is_decode_error() {
        let h = harness();
        let err = h
            .gateway
            .handle(GatewayRequest::ExtractText {
                image_data: String::new(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Decode(DecodeError::EmptyPayload));
        assert_eq!(h.gateway.metrics().snapshot().client_errors, 1);
    }

    #[tokio::test]
    async fn test_ocr_text_passthrough_and_sentinel() {
        let h = harness();
        assert_eq!(h.gateway.extract_text(&sample_image()).await.unwrap(), "EXIT");

        let h = harness_with(None, "  \n\t ", Vec::new(), 1);
        assert_eq!(
            h.gateway.extract_text(&sample_image()).await.unwrap(),
            NO_TEXT_FOUND
        );
    }

    #[tokio::test]
    async fn test_english_target_is_identity_without_cache() {
        let h = harness();
        for target in [None, Some("en"), Some("en-GB")] {
            let out = h.gateway.translate("Where is the bus?", target).await.unwrap();
            assert_eq!(out, "Where is the bus?");
        }
        assert_eq!(h.loader.loads.load(Ordering::SeqCst), 0);
        assert!(h.gateway.cache().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_language_is_client_error() {
        let h = harness();
        let err = h.gateway.translate("hi", Some("fr")).await.unwrap_err();
        assert_eq!(err, GatewayError::UnsupportedLanguage("fr".to_string()));
        assert!(err.is_client_error());
        assert!(h.gateway.cache().is_empty());
    }

    #[tokio::test]
    async fn test_translate_loads_model_once() {
        let h = harness();

        let first = h.gateway.translate("Hello", Some("hi-IN")).await.unwrap();
        let second = h.gateway.translate("Thanks", Some("hi")).await.unwrap();

        assert_eq!(first, "[hi] Hello");
        assert_eq!(second, "[hi] Thanks");
        assert_eq!(h.loader.loads.load(Ordering::SeqCst), 1);
        assert_eq!(h.gateway.health().loaded_languages, vec![LanguageKey::Hi]);
    }

    #[tokio::test]
    async fn test_concurrent_translations_share_one_load() {
        let h = harness();
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let gateway = h.gateway.clone();
                tokio::spawn(async move { gateway.translate(&format!("line {}", i), Some("ta")).await })
            })
            .collect();

        for task in tasks {
            assert!(task.await.unwrap().unwrap().starts_with("[ta]"));
        }
        assert_eq!(h.loader.loads.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_text_to_icon_and_intent() {
        let h = harness();

        let icons = h
            .gateway
            .handle(GatewayRequest::TextToIcon {
                text: "I need help, yes?".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            icons,
            GatewayResponse::Icons(IconResult {
                icons: "🆘 ✅".to_string(),
                found_words: vec!["help".to_string(), "yes".to_string()],
            })
        );

        let intent = h
            .gateway
            .handle(GatewayRequest::RecognizeIntent {
                command: "I need to find a hospital".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            intent,
            GatewayResponse::Intent {
                intent: Intent::FindHospital
            }
        );
    }

    #[tokio::test]
    async fn test_sign_no_hands() {
        let h = harness();
        assert_eq!(
            h.gateway.sign_to_speech(&sample_image()).await.unwrap(),
            NO_SIGN_DETECTED
        );
    }

    #[tokio::test]
    async fn test_sign_first_known_hand_wins() {
        let h = harness_with(None, "", vec![unknown_pose(), thumbs_up(), open_palm()], 2);
        assert_eq!(h.gateway.sign_to_speech(&sample_image()).await.unwrap(), "Yes");

        let h = harness_with(None, "", vec![open_palm()], 1);
        assert_eq!(h.gateway.sign_to_speech(&sample_image()).await.unwrap(), "Hello");

        let h = harness_with(None, "", vec![unknown_pose()], 1);
        assert_eq!(
            h.gateway.sign_to_speech(&sample_image()).await.unwrap(),
            NO_SIGN_DETECTED
        );
    }

    #[tokio::test]
    async fn test_malformed_landmarks_are_client_errors() {
        let h = harness_with(None, "", vec![LandmarkSet::new()], 1);
        let err = h
            .gateway
            .handle(GatewayRequest::SignToSpeech {
                image_data: sample_image(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::MalformedInput(_)));
        assert!(err.is_client_error());
    }

    #[tokio::test]
    async fn test_requests_are_counted_per_kind() {
        let h = harness();
        h.gateway
            .handle(GatewayRequest::RecognizeIntent {
                command: "go home".to_string(),
            })
            .await
            .unwrap();
        let _ = h
            .gateway
            .handle(GatewayRequest::Caption {
                image_data: "%%%".to_string(),
            })
            .await;

        let snapshot = h.gateway.metrics().snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert_eq!(snapshot.requests_by_kind.get("recognize_intent"), Some(&1));
        assert_eq!(snapshot.requests_by_kind.get("caption"), Some(&1));
        assert_eq!(snapshot.client_errors, 1);
    }
}
