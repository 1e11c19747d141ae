pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items for convenience
pub use config::Config;
pub use errors::{ConfigError, DecodeError, GatewayError, GestureError, LoadError};
pub use types::{
    CanonicalImage, GatewayRequest, GatewayResponse, GestureLabel, IconResult, Intent,
    LanguageKey, RequestKind, TargetLanguage,
};
