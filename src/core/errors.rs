// Error types for every gateway component
//
// Each component reports its own thiserror enum; the gateway folds them into
// GatewayError exactly once and the HTTP layer only ever sees GatewayError.

use thiserror::Error;

/// Image payload decoding errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Image payload is empty")]
    EmptyPayload,

    #[error("Invalid base64 image payload: {0}")]
    InvalidBase64(String),

    #[error("Unrecognized or corrupt image data: {0}")]
    InvalidImage(String),
}

impl From<base64::DecodeError> for DecodeError {
    fn from(err: base64::DecodeError) -> Self {
        DecodeError::InvalidBase64(err.to_string())
    }
}

/// Translation model cache errors
///
/// Cloneable so a single load outcome can be handed to every waiter.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("Translation model for language \"{0}\" is not available.")]
    UnsupportedLanguage(String),

    #[error("Failed to load translation model {model_id}: {cause}")]
    LoadFailed { model_id: String, cause: String },
}

/// Gesture classification errors
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GestureError {
    #[error("Landmark set is missing required joints: {missing:?}")]
    MissingJoints { missing: Vec<&'static str> },

    #[error("Landmark {joint} has a non-finite coordinate ({x}, {y})")]
    NonFiniteCoordinate { joint: &'static str, x: f32, y: f32 },
}

/// Errors surfaced by the inference gateway
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    #[error("Invalid image: {0}")]
    Decode(#[from] DecodeError),

    #[error("Translation model for language \"{0}\" is not available.")]
    UnsupportedLanguage(String),

    #[error("Translation model unavailable: {0}")]
    LoadFailed(String),

    #[error("{backend} backend failed: {cause}")]
    Backend { backend: &'static str, cause: String },

    #[error("Malformed landmark input: {0}")]
    MalformedInput(String),
}

impl GatewayError {
    pub fn backend(backend: &'static str, err: &anyhow::Error) -> Self {
        GatewayError::Backend {
            backend,
            cause: format!("{:#}", err),
        }
    }

    /// Client-caused failures map to the 400 class, everything else to 500.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            GatewayError::Decode(_)
                | GatewayError::UnsupportedLanguage(_)
                | GatewayError::MalformedInput(_)
        )
    }

    /// HTTP status class for this error
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }

    /// Stable machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Decode(_) => "decode_error",
            GatewayError::UnsupportedLanguage(_) => "unsupported_language",
            GatewayError::LoadFailed(_) => "load_failed",
            GatewayError::Backend { .. } => "backend_error",
            GatewayError::MalformedInput(_) => "malformed_input",
        }
    }
}

impl From<LoadError> for GatewayError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::UnsupportedLanguage(code) => GatewayError::UnsupportedLanguage(code),
            err @ LoadError::LoadFailed { .. } => GatewayError::LoadFailed(err.to_string()),
        }
    }
}

impl From<GestureError> for GatewayError {
    fn from(err: GestureError) -> Self {
        GatewayError::MalformedInput(err.to_string())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid server config: {0}")]
    InvalidServerConfig(String),

    #[error("Invalid backend config: {0}")]
    InvalidBackendConfig(String),

    #[error("Detection confidence must be in [0.0, 1.0], got {0}")]
    InvalidConfidenceThreshold(f32),

    #[error("Unsupported preload language: {0}")]
    UnsupportedPreloadLanguage(String),

    #[error("Invalid circuit breaker config: {0}")]
    InvalidCircuitConfig(String),
}

pub type DecodeResult<T> = Result<T, DecodeError>;
pub type LoadResult<T> = Result<T, LoadError>;
pub type GatewayResult<T> = Result<T, GatewayError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
