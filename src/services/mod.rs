pub mod backends;
pub mod gesture;
pub mod lexicon;
pub mod translation;
pub mod vision;

// Re-export commonly used services
pub use backends::{
    CaptionBackend, ExtractOptions, ImageDecoder, LandmarkSource, ModelEntry, ModelLoader,
    OcrBackend, TranslationBackend,
};
pub use gesture::classify;
pub use translation::{HfInferenceClient, ModelCache};
pub use vision::{Base64ImageDecoder, HttpLandmarkSource, TesseractOcr};
