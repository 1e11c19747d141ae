// Library exports for the assistive inference gateway

// Core modules
pub mod api;
pub mod core;
pub mod middleware;
pub mod orchestration;
pub mod services;
pub mod utils;

// Re-export commonly used types and functions
pub use core::{
    config::Config,
    errors::{ConfigError, DecodeError, GatewayError, GestureError, LoadError},
    types::{
        CanonicalImage, GatewayRequest, GatewayResponse, GestureLabel, IconResult, Intent,
        LanguageKey, TargetLanguage,
    },
};

pub use middleware::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

pub use orchestration::{Backends, InferenceGateway};

pub use services::{
    Base64ImageDecoder, ExtractOptions, HfInferenceClient, HttpLandmarkSource, ModelCache,
    ModelEntry, TesseractOcr,
};

pub use utils::Metrics;
