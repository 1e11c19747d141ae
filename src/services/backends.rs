//! Contracts for the external collaborators the gateway dispatches to.
//!
//! Every backend is object-safe so the gateway can hold `Arc<dyn ...>` and
//! tests can swap in fakes.

use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::time::Instant;

use crate::core::errors::DecodeError;
use crate::core::types::{CanonicalImage, LanguageKey};
use crate::services::gesture::LandmarkSet;

/// Turns a client image payload into a canonical image.
#[async_trait]
pub trait ImageDecoder: Send + Sync + 'static {
    async fn decode(&self, payload: &str) -> Result<CanonicalImage, DecodeError>;
}

/// Image captioning backend
#[async_trait]
pub trait CaptionBackend: Send + Sync + 'static {
    async fn caption(&self, image: &CanonicalImage) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

/// Printed text extraction backend
#[async_trait]
pub trait OcrBackend: Send + Sync + 'static {
    async fn extract_text(&self, image: &CanonicalImage) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

/// Loads the translation model for one language. Called at most once per key
/// at a time by the model cache.
#[async_trait]
pub trait ModelLoader: Send + Sync + 'static {
    async fn load(&self, key: LanguageKey) -> anyhow::Result<ModelEntry>;
}

/// Runs a loaded translation model
#[async_trait]
pub trait TranslationBackend: Send + Sync + 'static {
    async fn translate(&self, text: &str, model: &ModelEntry) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

/// Hand tracking options passed to a landmark source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractOptions {
    pub max_hands: usize,
    pub min_confidence: f32,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            max_hands: 1,
            min_confidence: 0.7,
        }
    }
}

/// Hand landmark detector. Returns one set per detected hand, possibly none.
#[async_trait]
pub trait LandmarkSource: Send + Sync + 'static {
    async fn extract(
        &self,
        image: &CanonicalImage,
        options: ExtractOptions,
    ) -> anyhow::Result<Vec<LandmarkSet>>;

    fn name(&self) -> &str;
}

/// A loaded tokenizer/model pair for exactly one language.
///
/// The handle is whatever the loader produced; the matching translation
/// backend downcasts it back. Entries are immutable once built.
pub struct ModelEntry {
    key: LanguageKey,
    model_id: String,
    handle: Box<dyn Any + Send + Sync>,
    loaded_at: Instant,
}

impl ModelEntry {
    pub fn new<H>(key: LanguageKey, model_id: impl Into<String>, handle: H) -> Self
    where
        H: Any + Send + Sync,
    {
        Self {
            key,
            model_id: model_id.into(),
            handle: Box::new(handle),
            loaded_at: Instant::now(),
        }
    }

    pub fn key(&self) -> LanguageKey {
        self.key
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn loaded_at(&self) -> Instant {
        self.loaded_at
    }

    pub fn handle<H: Any>(&self) -> Option<&H> {
        self.handle.downcast_ref::<H>()
    }
}

impl fmt::Debug for ModelEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelEntry")
            .field("key", &self.key)
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}
