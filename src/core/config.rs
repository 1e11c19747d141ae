use crate::core::errors::ConfigError;
use crate::core::types::LanguageKey;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub log_level: Level,
    pub request_timeout_seconds: u64,
    pub max_body_bytes: usize,
}

/// External inference backends
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub hf_api_token: Option<String>,
    pub hf_inference_url: String,
    pub caption_model: String,
    pub api_timeout_seconds: u64,
    pub max_retries: u32,
    pub tesseract_cmd: String,
    pub landmark_endpoint: Option<String>,
    pub max_hands: usize,
    pub min_detection_confidence: f32,
}

/// Translation model cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Languages loaded eagerly at startup
    pub preload_languages: Vec<LanguageKey>,
}

/// Circuit breaker guarding the hosted inference API
#[derive(Debug, Clone)]
pub struct CircuitConfig {
    pub failure_threshold: usize,
    pub timeout_seconds: u64,
    pub success_threshold: usize,
}

/// Parse a trimmed variable, treating unparsable values as unset
fn parsed<T, F>(var: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    var(name).and_then(|s| s.trim().parse().ok())
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub backends: BackendConfig,
    pub cache: CacheConfig,
    pub circuit: CircuitConfig,
}

impl Config {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        let config = Self::from_vars(|name| env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| {
            var(name)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };

        let log_level = var("LOG_LEVEL")
            .and_then(|s| match s.to_lowercase().as_str() {
                "trace" => Some(Level::TRACE),
                "debug" => Some(Level::DEBUG),
                "info" => Some(Level::INFO),
                "warn" | "warning" => Some(Level::WARN),
                "error" => Some(Level::ERROR),
                _ => None,
            })
            .unwrap_or(Level::INFO);

        let preload_languages = var("PRELOAD_LANGUAGES")
            .map(|codes| {
                codes
                    .split(',')
                    .map(str::trim)
                    .filter(|code| !code.is_empty())
                    .map(|code| {
                        code.parse::<LanguageKey>()
                            .map_err(|_| ConfigError::UnsupportedPreloadLanguage(code.to_string()))
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            server: ServerConfig {
                port: parsed(&var, "SERVER_PORT").unwrap_or(5001),
                host: non_empty("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                log_level,
                request_timeout_seconds: parsed(&var, "REQUEST_TIMEOUT_SECONDS").unwrap_or(120),
                max_body_bytes: parsed(&var, "MAX_BODY_BYTES").unwrap_or(20 * 1024 * 1024),
            },
            backends: BackendConfig {
                hf_api_token: non_empty("HF_API_TOKEN"),
                hf_inference_url: non_empty("HF_INFERENCE_URL")
                    .map(|url| url.trim_end_matches('/').to_string())
                    .unwrap_or_else(|| "https://api-inference.huggingface.co/models".to_string()),
                caption_model: non_empty("CAPTION_MODEL")
                    .unwrap_or_else(|| "Salesforce/blip-image-captioning-base".to_string()),
                api_timeout_seconds: parsed(&var, "API_TIMEOUT_SECONDS").unwrap_or(60),
                max_retries: parsed(&var, "MAX_RETRIES").unwrap_or(2),
                tesseract_cmd: non_empty("TESSERACT_CMD")
                    .unwrap_or_else(|| "tesseract".to_string()),
                landmark_endpoint: non_empty("LANDMARK_ENDPOINT"),
                max_hands: parsed(&var, "MAX_HANDS").unwrap_or(1),
                min_detection_confidence: parsed(&var, "MIN_DETECTION_CONFIDENCE").unwrap_or(0.7),
            },
            cache: CacheConfig { preload_languages },
            circuit: CircuitConfig {
                failure_threshold: parsed(&var, "CIRCUIT_FAILURE_THRESHOLD").unwrap_or(5),
                timeout_seconds: parsed(&var, "CIRCUIT_TIMEOUT_SECONDS").unwrap_or(60),
                success_threshold: parsed(&var, "CIRCUIT_SUCCESS_THRESHOLD").unwrap_or(1),
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidServerConfig(
                "SERVER_PORT must be > 0".to_string(),
            ));
        }

        if self.server.request_timeout_seconds == 0 {
            return Err(ConfigError::InvalidServerConfig(
                "REQUEST_TIMEOUT_SECONDS must be > 0".to_string(),
            ));
        }

        if self.server.max_body_bytes < 1024 {
            return Err(ConfigError::InvalidServerConfig(format!(
                "MAX_BODY_BYTES must be at least 1024, got {}",
                self.server.max_body_bytes
            )));
        }

        if !(0.0..=1.0).contains(&self.backends.min_detection_confidence) {
            return Err(ConfigError::InvalidConfidenceThreshold(
                self.backends.min_detection_confidence,
            ));
        }

        if self.backends.max_hands == 0 {
            return Err(ConfigError::InvalidBackendConfig(
                "MAX_HANDS must be > 0".to_string(),
            ));
        }

        if self.backends.api_timeout_seconds == 0 {
            return Err(ConfigError::InvalidBackendConfig(
                "API_TIMEOUT_SECONDS must be > 0".to_string(),
            ));
        }

        if self.circuit.failure_threshold == 0 || self.circuit.success_threshold == 0 {
            return Err(ConfigError::InvalidCircuitConfig(
                "failure and success thresholds must be > 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn server_port(&self) -> u16 {
        self.server.port
    }

    pub fn server_host(&self) -> &str {
        &self.server.host
    }

    pub fn log_level(&self) -> Level {
        self.server.log_level
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_seconds)
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.backends.api_timeout_seconds)
    }

    pub fn circuit_timeout(&self) -> Duration {
        Duration::from_secs(self.circuit.timeout_seconds)
    }
}
