use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::Write as _;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::types::RequestKind;

/// Latency samples kept per series; older samples are dropped first
pub const LATENCY_SAMPLE_CAP: usize = 1024;

/// Metrics collector for the gateway.
///
/// Tracks requests per kind, model cache behaviour and hosted API usage.
/// Cheap to clone; every clone shares the same counters.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    // Requests
    requests_by_kind: DashMap<&'static str, AtomicUsize>,
    client_errors: AtomicUsize,
    server_errors: AtomicUsize,
    request_latency_ms: RwLock<VecDeque<u64>>,

    // Model cache
    model_cache_hits: AtomicUsize,
    model_cache_waits: AtomicUsize,
    model_loads_started: AtomicUsize,
    model_loads_succeeded: AtomicUsize,
    model_loads_failed: AtomicUsize,
    models_loaded: AtomicUsize,

    // Hosted inference API
    api_calls_total: AtomicUsize,
    api_calls_success: AtomicUsize,
    api_calls_failed: AtomicUsize,
    api_latency_ms: RwLock<VecDeque<u64>>,
    circuit_breaker_trips: AtomicUsize,

    start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsInner {
                requests_by_kind: DashMap::new(),
                client_errors: AtomicUsize::new(0),
                server_errors: AtomicUsize::new(0),
                request_latency_ms: RwLock::new(VecDeque::with_capacity(LATENCY_SAMPLE_CAP)),
                model_cache_hits: AtomicUsize::new(0),
                model_cache_waits: AtomicUsize::new(0),
                model_loads_started: AtomicUsize::new(0),
                model_loads_succeeded: AtomicUsize::new(0),
                model_loads_failed: AtomicUsize::new(0),
                models_loaded: AtomicUsize::new(0),
                api_calls_total: AtomicUsize::new(0),
                api_calls_success: AtomicUsize::new(0),
                api_calls_failed: AtomicUsize::new(0),
                api_latency_ms: RwLock::new(VecDeque::with_capacity(LATENCY_SAMPLE_CAP)),
                circuit_breaker_trips: AtomicUsize::new(0),
                start_time: Instant::now(),
            }),
        }
    }

    // Requests
    pub fn record_request(&self, kind: RequestKind, duration: Duration) {
        self.inner
            .requests_by_kind
            .entry(kind.as_str())
            .or_insert_with(|| AtomicUsize::new(0))
            .fetch_add(1, Ordering::Relaxed);
        push_sample(&self.inner.request_latency_ms, duration);
    }

    pub fn record_error(&self, client_caused: bool) {
        if client_caused {
            self.inner.client_errors.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.server_errors.fetch_add(1, Ordering::Relaxed);
        }
    }

    // Model cache
    pub fn record_model_cache_hit(&self) {
        self.inner.model_cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    /// A caller joined a load that was already in flight
    pub fn record_model_cache_wait(&self) {
        self.inner.model_cache_waits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_load_started(&self) {
        self.inner.model_loads_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_model_load_finished(&self, success: bool, loaded_models: usize) {
        if success {
            self.inner.model_loads_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.model_loads_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.inner.models_loaded.store(loaded_models, Ordering::Relaxed);
    }

    // Hosted API
    pub fn record_api_call(&self, success: bool, duration: Duration) {
        self.inner.api_calls_total.fetch_add(1, Ordering::Relaxed);
        if success {
            self.inner.api_calls_success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inner.api_calls_failed.fetch_add(1, Ordering::Relaxed);
        }
        push_sample(&self.inner.api_latency_ms, duration);
    }

    pub fn record_circuit_breaker_trip(&self) {
        self.inner.circuit_breaker_trips.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests_by_kind: BTreeMap<String, usize> = self
            .inner
            .requests_by_kind
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().load(Ordering::Relaxed)))
            .collect();

        let request_latency = self.inner.request_latency_ms.read();
        let request_latency_avg_ms = avg(&request_latency);
        let request_latency_p95_ms = percentile(&request_latency, 0.95);
        drop(request_latency);

        let api_latency = self.inner.api_latency_ms.read();
        let api_latency_avg_ms = avg(&api_latency);
        let api_latency_p95_ms = percentile(&api_latency, 0.95);
        drop(api_latency);

        MetricsSnapshot {
            requests_total: requests_by_kind.values().sum(),
            requests_by_kind,
            client_errors: self.inner.client_errors.load(Ordering::Relaxed),
            server_errors: self.inner.server_errors.load(Ordering::Relaxed),
            request_latency_avg_ms,
            request_latency_p95_ms,
            model_cache_hits: self.inner.model_cache_hits.load(Ordering::Relaxed),
            model_cache_waits: self.inner.model_cache_waits.load(Ordering::Relaxed),
            model_loads_started: self.inner.model_loads_started.load(Ordering::Relaxed),
            model_loads_succeeded: self.inner.model_loads_succeeded.load(Ordering::Relaxed),
            model_loads_failed: self.inner.model_loads_failed.load(Ordering::Relaxed),
            models_loaded: self.inner.models_loaded.load(Ordering::Relaxed),
            api_calls_total: self.inner.api_calls_total.load(Ordering::Relaxed),
            api_calls_success: self.inner.api_calls_success.load(Ordering::Relaxed),
            api_calls_failed: self.inner.api_calls_failed.load(Ordering::Relaxed),
            api_latency_avg_ms,
            api_latency_p95_ms,
            circuit_breaker_trips: self.inner.circuit_breaker_trips.load(Ordering::Relaxed),
            uptime_seconds: self.inner.start_time.elapsed().as_secs(),
        }
    }

    /// Generate Prometheus-format metrics
    pub fn to_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut out = String::new();

        let _ = writeln!(out, "# HELP gateway_requests_total Requests handled per kind");
        let _ = writeln!(out, "# TYPE gateway_requests_total counter");
        for (kind, count) in &snapshot.requests_by_kind {
            let _ = writeln!(out, "gateway_requests_total{{kind=\"{}\"}} {}", kind, count);
        }

        let _ = write!(
            out,
            r#"
# HELP gateway_errors_total Failed requests by cause
# TYPE gateway_errors_total counter
gateway_errors_total{{cause="client"}} {}
gateway_errors_total{{cause="server"}} {}

# HELP gateway_request_latency_avg_ms Average request latency in milliseconds
# TYPE gateway_request_latency_avg_ms gauge
gateway_request_latency_avg_ms {}

# HELP model_cache_hits_total Translation model lookups served from cache
# TYPE model_cache_hits_total counter
model_cache_hits_total {}

# HELP model_cache_waits_total Lookups that joined an in-flight load
# TYPE model_cache_waits_total counter
model_cache_waits_total {}

# HELP model_loads_total Translation model load attempts by outcome
# TYPE model_loads_total counter
model_loads_total{{outcome="started"}} {}
model_loads_total{{outcome="succeeded"}} {}
model_loads_total{{outcome="failed"}} {}

# HELP models_loaded Translation models currently resident
# TYPE models_loaded gauge
models_loaded {}

# HELP api_calls_total Hosted inference API calls by outcome
# TYPE api_calls_total counter
api_calls_total{{outcome="success"}} {}
api_calls_total{{outcome="failed"}} {}

# HELP api_latency_avg_ms Average hosted API latency in milliseconds
# TYPE api_latency_avg_ms gauge
api_latency_avg_ms {}

# HELP circuit_breaker_trips_total Total circuit breaker trips
# TYPE circuit_breaker_trips_total counter
circuit_breaker_trips_total {}

# HELP uptime_seconds Application uptime in seconds
# TYPE uptime_seconds counter
uptime_seconds {}
"#,
            snapshot.client_errors,
            snapshot.server_errors,
            snapshot.request_latency_avg_ms,
            snapshot.model_cache_hits,
            snapshot.model_cache_waits,
            snapshot.model_loads_started,
            snapshot.model_loads_succeeded,
            snapshot.model_loads_failed,
            snapshot.models_loaded,
            snapshot.api_calls_success,
            snapshot.api_calls_failed,
            snapshot.api_latency_avg_ms,
            snapshot.circuit_breaker_trips,
            snapshot.uptime_seconds,
        );

        out
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub requests_total: usize,
    pub requests_by_kind: BTreeMap<String, usize>,
    pub client_errors: usize,
    pub server_errors: usize,
    pub request_latency_avg_ms: u64,
    pub request_latency_p95_ms: u64,
    pub model_cache_hits: usize,
    pub model_cache_waits: usize,
    pub model_loads_started: usize,
    pub model_loads_succeeded: usize,
    pub model_loads_failed: usize,
    pub models_loaded: usize,
    pub api_calls_total: usize,
    pub api_calls_success: usize,
    pub api_calls_failed: usize,
    pub api_latency_avg_ms: u64,
    pub api_latency_p95_ms: u64,
    pub circuit_breaker_trips: usize,
    pub uptime_seconds: u64,
}

fn push_sample(samples: &RwLock<VecDeque<u64>>, duration: Duration) {
    let mut samples = samples.write();
    if samples.len() >= LATENCY_SAMPLE_CAP {
        samples.pop_front();
    }
    samples.push_back(duration.as_millis() as u64);
}

fn percentile(values: &VecDeque<u64>, p: f64) -> u64 {
    if values.is_empty() {
        return 0;
    }
    let mut sorted: Vec<u64> = values.iter().copied().collect();
    sorted.sort_unstable();
    let idx = ((values.len() as f64 - 1.0) * p) as usize;
    sorted[idx]
}

fn avg(values: &VecDeque<u64>) -> u64 {
    if values.is_empty() {
        return 0;
    }
    values.iter().sum::<u64>() / values.len() as u64
}
