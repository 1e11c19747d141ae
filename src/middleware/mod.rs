// Middleware for resilient backend calls

pub mod circuit_breaker;

pub use circuit_breaker::{CallPermit, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
