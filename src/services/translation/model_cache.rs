use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::core::errors::LoadError;
use crate::core::types::LanguageKey;
use crate::services::backends::{ModelEntry, ModelLoader};
use crate::utils::Metrics;

type LoadOutcome = Result<Arc<ModelEntry>, LoadError>;
type PendingLoad = Shared<BoxFuture<'static, LoadOutcome>>;

/// Observable per-key load state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    Unloaded,
    Loading,
    Ready,
}

enum Slot {
    Loading(PendingLoad),
    Ready(Arc<ModelEntry>),
}

/// On-demand translation model cache.
///
/// - At most one load per language is in flight; callers arriving during a
///   load await the same shared outcome.
/// - Ready models stay resident for the lifetime of the cache.
/// - A failed load is reported to every waiter and the key goes back to
///   `Unloaded`, so the next request retries.
///
/// Loads run on a detached task which publishes the outcome itself, so a
/// caller that gives up never cancels a load others are waiting on. The state
/// table lock is only held to inspect or swap a slot, never across a load.
#[derive(Clone)]
pub struct ModelCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    loader: Arc<dyn ModelLoader>,
    slots: Mutex<HashMap<LanguageKey, Slot>>,
    metrics: Option<Metrics>,
}

impl ModelCache {
    pub fn new(loader: Arc<dyn ModelLoader>, metrics: Option<Metrics>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                loader,
                slots: Mutex::new(HashMap::new()),
                metrics,
            }),
        }
    }

    /// Resolve a raw language code, then get or load its model.
    ///
    /// Unknown codes fail with `UnsupportedLanguage` before touching the table.
    pub async fn get_or_load_code(&self, code: &str) -> Result<Arc<ModelEntry>, LoadError> {
        let key: LanguageKey = code.parse()?;
        self.get_or_load(key).await
    }

    /// Get the model for `key`, loading it if nobody has yet.
    pub async fn get_or_load(&self, key: LanguageKey) -> Result<Arc<ModelEntry>, LoadError> {
        let pending = {
            let mut slots = self.inner.slots.lock();
            match slots.get(&key) {
                Some(Slot::Ready(entry)) => {
                    if let Some(ref m) = self.inner.metrics {
                        m.record_model_cache_hit();
                    }
                    return Ok(Arc::clone(entry));
                }
                Some(Slot::Loading(pending)) => {
                    debug!(language = %key, "Joining in-flight model load");
                    if let Some(ref m) = self.inner.metrics {
                        m.record_model_cache_wait();
                    }
                    pending.clone()
                }
                None => {
                    let pending = Self::spawn_load(Arc::clone(&self.inner), key);
                    slots.insert(key, Slot::Loading(pending.clone()));
                    pending
                }
            }
        };

        pending.await
    }

    /// Must be called with the slot table locked: the spawned task takes the
    /// same lock to publish, so it cannot finish before the Loading slot exists.
    fn spawn_load(inner: Arc<CacheInner>, key: LanguageKey) -> PendingLoad {
        if let Some(ref m) = inner.metrics {
            m.record_model_load_started();
        }

        let task = tokio::spawn(async move {
            let started = Instant::now();
            info!(language = %key, model = key.model_id(), "Loading translation model");

            let result = match AssertUnwindSafe(inner.loader.load(key)).catch_unwind().await {
                Ok(Ok(entry)) => Ok(Arc::new(entry)),
                Ok(Err(e)) => Err(LoadError::LoadFailed {
                    model_id: key.model_id().to_string(),
                    cause: format!("{:#}", e),
                }),
                Err(_) => Err(LoadError::LoadFailed {
                    model_id: key.model_id().to_string(),
                    cause: "model loader panicked".to_string(),
                }),
            };

            let loaded = {
                let mut slots = inner.slots.lock();
                match &result {
                    Ok(entry) => {
                        slots.insert(key, Slot::Ready(Arc::clone(entry)));
                    }
                    Err(_) => {
                        slots.remove(&key);
                    }
                }
                slots
                    .values()
                    .filter(|slot| matches!(slot, Slot::Ready(_)))
                    .count()
            };

            match &result {
                Ok(_) => info!(
                    language = %key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Translation model loaded"
                ),
                Err(e) => warn!(
                    language = %key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "Translation model load failed"
                ),
            }

            if let Some(ref m) = inner.metrics {
                m.record_model_load_finished(result.is_ok(), loaded);
            }

            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(LoadError::LoadFailed {
                    model_id: key.model_id().to_string(),
                    cause: format!("load task aborted: {}", e),
                }),
            }
        }
        .boxed()
        .shared()
    }

    /// Load several languages concurrently, e.g. at startup.
    pub async fn preload(&self, keys: &[LanguageKey]) -> Vec<(LanguageKey, Result<(), LoadError>)> {
        let loads = keys.iter().map(|&key| {
            let cache = self.clone();
            async move { (key, cache.get_or_load(key).await.map(|_| ())) }
        });
        futures::future::join_all(loads).await
    }

    pub fn state(&self, key: LanguageKey) -> LoadState {
        match self.inner.slots.lock().get(&key) {
            None => LoadState::Unloaded,
            Some(Slot::Loading(_)) => LoadState::Loading,
            Some(Slot::Ready(_)) => LoadState::Ready,
        }
    }

    /// Languages whose model is resident, in enumeration order
    pub fn loaded_keys(&self) -> Vec<LanguageKey> {
        let slots = self.inner.slots.lock();
        LanguageKey::ALL
            .iter()
            .copied()
            .filter(|key| matches!(slots.get(key), Some(Slot::Ready(_))))
            .collect()
    }

    /// Number of keys with any slot (loading or ready)
    pub fn len(&self) -> usize {
        self.inner.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    /// Loader that blocks on a gate and fails its first `fail_first` attempts.
    struct GatedLoader {
        attempts: AtomicUsize,
        fail_first: usize,
        gate: Semaphore,
    }

    impl GatedLoader {
        fn new(fail_first: usize, open: bool) -> Arc<Self> {
            Arc::new(Self {
                attempts: AtomicUsize::new(0),
                fail_first,
                gate: Semaphore::new(if open { Semaphore::MAX_PERMITS } else { 0 }),
            })
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        fn open(&self) {
            self.gate.add_permits(1_000);
        }
    }

    #[async_trait]
    impl ModelLoader for GatedLoader {
        async fn load(&self, key: LanguageKey) -> anyhow::Result<ModelEntry> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
            let _permit = self.gate.acquire().await?;
            if attempt < self.fail_first {
                anyhow::bail!("flaky download (attempt {})", attempt + 1);
            }
            Ok(ModelEntry::new(key, key.model_id(), attempt))
        }
    }

    async fn wait_for_attempts(loader: &GatedLoader, n: usize) {
        for _ in 0..200 {
            if loader.attempts() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("loader never reached {} attempts", n);
    }

    #[tokio::test]
    async fn test_unsupported_code_creates_no_entry() {
        let loader = GatedLoader::new(0, true);
        let cache = ModelCache::new(loader.clone(), None);

        for code in ["fr", "", "EN", "hi-IN", "xx"] {
            let err = cache.get_or_load_code(code).await.unwrap_err();
            assert_eq!(err, LoadError::UnsupportedLanguage(code.to_string()));
        }

        assert!(cache.is_empty());
        assert_eq!(loader.attempts(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_share_one_load() {
        let loader = GatedLoader::new(0, false);
        let metrics = Metrics::new();
        let cache = ModelCache::new(loader.clone(), Some(metrics.clone()));

        let callers: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_or_load(LanguageKey::Hi).await })
            })
            .collect();

        wait_for_attempts(&loader, 1).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(cache.state(LanguageKey::Hi), LoadState::Loading);
        loader.open();

        let mut entries = Vec::new();
        for caller in callers {
            entries.push(caller.await.unwrap().unwrap());
        }

        assert_eq!(loader.attempts(), 1);
        assert!(entries.iter().all(|e| Arc::ptr_eq(e, &entries[0])));
        assert_eq!(cache.state(LanguageKey::Hi), LoadState::Ready);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.model_loads_started, 1);
        assert_eq!(snapshot.model_loads_succeeded, 1);
        assert_eq!(snapshot.models_loaded, 1);
    }

    #[tokio::test]
    async fn test_ready_entry_served_without_reload() {
        let loader = GatedLoader::new(0, true);
        let cache = ModelCache::new(loader.clone(), None);

        let first = cache.get_or_load(LanguageKey::Ta).await.unwrap();
        let second = cache.get_or_load_code("ta").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(loader.attempts(), 1);
        assert_eq!(cache.loaded_keys(), vec![LanguageKey::Ta]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_failure_reaches_all_waiters_then_retries() {
        let loader = GatedLoader::new(1, false);
        let cache = ModelCache::new(loader.clone(), None);

        let callers: Vec<_> = (0..6)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.get_or_load(LanguageKey::Kn).await })
            })
            .collect();

        wait_for_attempts(&loader, 1).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        loader.open();

        let mut errors = Vec::new();
        for caller in callers {
            errors.push(caller.await.unwrap().unwrap_err());
        }
        assert!(errors.iter().all(|e| e == &errors[0]));
        assert!(matches!(&errors[0], LoadError::LoadFailed { cause, .. } if cause.contains("flaky")));
        assert_eq!(loader.attempts(), 1);
        assert_eq!(cache.state(LanguageKey::Kn), LoadState::Unloaded);

        let entry = cache.get_or_load(LanguageKey::Kn).await.unwrap();
        assert_eq!(entry.handle::<usize>(), Some(&1));
        assert_eq!(loader.attempts(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_abandoned_caller_does_not_cancel_load() {
        let loader = GatedLoader::new(0, false);
        let cache = ModelCache::new(loader.clone(), None);

        let impatient = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_load(LanguageKey::Te).await })
        };
        wait_for_attempts(&loader, 1).await;
        impatient.abort();
        let _ = impatient.await;

        loader.open();
        let entry = cache.get_or_load(LanguageKey::Te).await.unwrap();

        assert_eq!(entry.key(), LanguageKey::Te);
        assert_eq!(loader.attempts(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_distinct_keys_load_independently() {
        let slow = GatedLoader::new(0, false);
        let cache = ModelCache::new(slow.clone(), None);

        let blocked = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_load(LanguageKey::Hi).await })
        };
        wait_for_attempts(&slow, 1).await;

        // Hi is still parked on the gate; Ta starts its own load anyway.
        let second = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get_or_load(LanguageKey::Ta).await })
        };
        wait_for_attempts(&slow, 2).await;
        assert_eq!(cache.state(LanguageKey::Hi), LoadState::Loading);
        assert_eq!(cache.state(LanguageKey::Ta), LoadState::Loading);

        slow.open();
        assert!(blocked.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
        assert_eq!(cache.loaded_keys(), vec![LanguageKey::Hi, LanguageKey::Ta]);
    }

    #[tokio::test]
    async fn test_panicking_loader_resets_state() {
        struct PanickingLoader;

        #[async_trait]
        impl ModelLoader for PanickingLoader {
            async fn load(&self, _key: LanguageKey) -> anyhow::Result<ModelEntry> {
                panic!("weights corrupt");
            }
        }

        let cache = ModelCache::new(Arc::new(PanickingLoader), None);
        let err = cache.get_or_load(LanguageKey::Hi).await.unwrap_err();

        assert!(matches!(err, LoadError::LoadFailed { cause, .. } if cause.contains("panicked")));
        assert_eq!(cache.state(LanguageKey::Hi), LoadState::Unloaded);
    }

    #[tokio::test]
    async fn test_preload_reports_each_key() {
        let loader = GatedLoader::new(0, true);
        let cache = ModelCache::new(loader.clone(), None);

        let results = cache.preload(&[LanguageKey::Hi, LanguageKey::Te]).await;

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(cache.loaded_keys(), vec![LanguageKey::Hi, LanguageKey::Te]);
    }
}
