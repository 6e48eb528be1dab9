use super::model_config::RegistryConfig;
use super::model_handle::ModelHandle;
use super::trainer::ModelTrainer;
use crate::domain::errors::{AnalyticsError, AnalyticsResult};
use crate::domain::market::price_series::PriceSeries;
use crate::domain::ports::ModelStore;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::{Mutex, Semaphore, watch};
use tracing::{debug, error, info, warn};

type TrainingOutcome = Option<AnalyticsResult<Arc<ModelHandle>>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub training_runs: u64,
    pub failed_runs: u64,
    pub joined_waits: u64,
    pub cache_hits: u64,
}

#[derive(Default)]
struct Counters {
    training_runs: AtomicU64,
    failed_runs: AtomicU64,
    joined_waits: AtomicU64,
    cache_hits: AtomicU64,
}

#[derive(Default)]
struct SymbolSlot {
    committed: Option<Arc<ModelHandle>>,
    in_flight: Option<watch::Receiver<TrainingOutcome>>,
}

struct RegistryInner {
    config: RegistryConfig,
    store: Arc<dyn ModelStore>,
    trainer: Arc<dyn ModelTrainer>,
    slots: Mutex<HashMap<String, SymbolSlot>>,
    permits: Semaphore,
    counters: Counters,
    closed: AtomicBool,
}

/// Per-symbol model lifecycle: cache, versioning and retrain coordination.
///
/// At most one training runs per symbol; callers arriving while it runs wait
/// for the same outcome. Trainings run in spawned tasks, so a caller that
/// stops waiting does not cancel them. A failed retrain leaves the previous
/// handle in place.
#[derive(Clone)]
pub struct ModelRegistry {
    inner: Arc<RegistryInner>,
}

enum Plan {
    Cached(Arc<ModelHandle>),
    Join(watch::Receiver<TrainingOutcome>),
    Start(watch::Sender<TrainingOutcome>, watch::Receiver<TrainingOutcome>),
}

impl ModelRegistry {
    pub fn new(
        config: RegistryConfig,
        store: Arc<dyn ModelStore>,
        trainer: Arc<dyn ModelTrainer>,
    ) -> AnalyticsResult<Self> {
        config.validate()?;
        let permits = Semaphore::new(config.max_concurrent_trainings);
        Ok(Self {
            inner: Arc::new(RegistryInner {
                config,
                store,
                trainer,
                slots: Mutex::new(HashMap::new()),
                permits,
                counters: Counters::default(),
                closed: AtomicBool::new(false),
            }),
        })
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    /// Returns the cached handle unless it is missing, stale or `force_retrain`
    /// is set; otherwise trains (or joins the training already running).
    pub async fn get_or_train(
        &self,
        series: &PriceSeries,
        force_retrain: bool,
    ) -> AnalyticsResult<Arc<ModelHandle>> {
        if self.inner.closed.load(Ordering::SeqCst) {
            return Err(AnalyticsError::ModelUnavailable {
                reason: "model registry has been shut down".to_string(),
            });
        }
        let symbol = series.symbol().to_string();

        let plan = {
            let mut slots = self.inner.slots.lock().await;
            let slot = slots.entry(symbol.clone()).or_default();
            let now = Utc::now();

            let fresh = slot
                .committed
                .clone()
                .filter(|h| !force_retrain && !h.is_stale(self.inner.config.max_model_age, now));

            if let Some(rx) = slot.in_flight.clone() {
                Plan::Join(rx)
            } else if let Some(handle) = fresh {
                Plan::Cached(handle)
            } else {
                let (tx, rx) = watch::channel(None);
                slot.in_flight = Some(rx.clone());
                Plan::Start(tx, rx)
            }
        };

        match plan {
            Plan::Cached(handle) => {
                self.inner.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                debug!("ModelRegistry: cache hit for {} v{}", symbol, handle.version);
                Ok(handle)
            }
            Plan::Join(rx) => {
                self.inner.counters.joined_waits.fetch_add(1, Ordering::Relaxed);
                debug!("ModelRegistry: joining in-flight training for {}", symbol);
                self.wait(&symbol, rx).await
            }
            Plan::Start(tx, rx) => {
                let inner = self.inner.clone();
                let series = series.clone();
                let task_symbol = symbol.clone();
                tokio::spawn(async move {
                    let outcome = inner.run(series, force_retrain).await;
                    inner.finish(&task_symbol, &outcome).await;
                    // joiners may all have given up
                    let _ = tx.send(Some(outcome));
                });
                self.wait(&symbol, rx).await
            }
        }
    }

    async fn wait(
        &self,
        symbol: &str,
        mut rx: watch::Receiver<TrainingOutcome>,
    ) -> AnalyticsResult<Arc<ModelHandle>> {
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(value) => value.clone(),
            Err(_) => None,
        };
        match outcome {
            Some(result) => result,
            None => {
                // the training task ended without reporting; drop its slot entry
                let mut slots = self.inner.slots.lock().await;
                if let Some(slot) = slots.get_mut(symbol) {
                    if slot.in_flight.as_ref().is_some_and(|r| r.same_channel(&rx)) {
                        slot.in_flight = None;
                    }
                }
                Err(AnalyticsError::training_failed(
                    symbol,
                    "training task ended without a result",
                ))
            }
        }
    }

    /// Currently committed handle, without training.
    pub async fn cached(&self, symbol: &str) -> Option<Arc<ModelHandle>> {
        let slots = self.inner.slots.lock().await;
        slots
            .get(&symbol.to_uppercase())
            .and_then(|slot| slot.committed.clone())
    }

    /// Drops the committed handle for a symbol. Stored versions are kept.
    pub async fn evict(&self, symbol: &str) -> bool {
        let mut slots = self.inner.slots.lock().await;
        slots
            .get_mut(&symbol.to_uppercase())
            .and_then(|slot| slot.committed.take())
            .is_some()
    }

    pub fn stats(&self) -> RegistryStats {
        let c = &self.inner.counters;
        RegistryStats {
            training_runs: c.training_runs.load(Ordering::Relaxed),
            failed_runs: c.failed_runs.load(Ordering::Relaxed),
            joined_waits: c.joined_waits.load(Ordering::Relaxed),
            cache_hits: c.cache_hits.load(Ordering::Relaxed),
        }
    }

    /// Rejects new requests and drops committed handles. Trainings already
    /// running finish in the background.
    pub async fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.permits.close();
        let mut slots = self.inner.slots.lock().await;
        let dropped = slots.values_mut().filter_map(|s| s.committed.take()).count();
        info!("ModelRegistry: shut down, dropped {} committed models", dropped);
    }
}

impl RegistryInner {
    async fn run(&self, series: PriceSeries, force_retrain: bool) -> AnalyticsResult<Arc<ModelHandle>> {
        let symbol = series.symbol().to_string();

        if !force_retrain {
            if let Some(handle) = self.restore(&symbol).await {
                return Ok(handle);
            }
        }

        let _permit = self.permits.acquire().await.map_err(|_| AnalyticsError::ModelUnavailable {
            reason: "model registry has been shut down".to_string(),
        })?;
        let version = self.next_version(&symbol).await;
        info!("ModelRegistry: training {} v{}", symbol, version);

        let trainer = self.trainer.clone();
        let result = tokio::task::spawn_blocking(move || trainer.train(&series, version))
            .await
            .unwrap_or_else(|e| {
                Err(AnalyticsError::training_failed(
                    &symbol,
                    format!("training task panicked: {}", e),
                ))
            });

        match result {
            Ok(handle) => {
                self.counters.training_runs.fetch_add(1, Ordering::Relaxed);
                let handle = Arc::new(handle);
                self.persist(&handle).await;
                Ok(handle)
            }
            Err(e) => {
                self.counters.failed_runs.fetch_add(1, Ordering::Relaxed);
                error!("ModelRegistry: training {} v{} failed: {}", symbol, version, e);
                Err(e)
            }
        }
    }

    async fn finish(&self, symbol: &str, outcome: &AnalyticsResult<Arc<ModelHandle>>) {
        let mut slots = self.slots.lock().await;
        let slot = slots.entry(symbol.to_string()).or_default();
        if let Ok(handle) = outcome {
            if !self.closed.load(Ordering::SeqCst) {
                slot.committed = Some(handle.clone());
            }
        }
        slot.in_flight = None;
    }

    /// Latest stored model, if present and fresh.
    async fn restore(&self, symbol: &str) -> Option<Arc<ModelHandle>> {
        let record = match self.store.load_latest(symbol).await {
            Ok(Some(record)) => record,
            Ok(None) => return None,
            Err(e) => {
                warn!("ModelRegistry: could not load stored model for {}: {}", symbol, e);
                return None;
            }
        };
        let handle = match ModelHandle::from_record(record) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("ModelRegistry: ignoring stored model for {}: {}", symbol, e);
                return None;
            }
        };
        if handle.is_stale(self.config.max_model_age, Utc::now()) {
            debug!("ModelRegistry: stored {} v{} is stale", symbol, handle.version);
            return None;
        }
        info!("ModelRegistry: restored {} v{} from store", symbol, handle.version);
        Some(Arc::new(handle))
    }

    async fn next_version(&self, symbol: &str) -> u64 {
        let committed = {
            let slots = self.slots.lock().await;
            slots
                .get(symbol)
                .and_then(|s| s.committed.as_ref())
                .map_or(0, |h| h.version)
        };
        let stored = match self.store.versions(symbol).await {
            Ok(versions) => versions.last().copied().unwrap_or(0),
            Err(e) => {
                warn!("ModelRegistry: could not list versions for {}: {}", symbol, e);
                0
            }
        };
        committed.max(stored) + 1
    }

    async fn persist(&self, handle: &ModelHandle) {
        let record = match handle.to_record() {
            Ok(record) => record,
            Err(e) => {
                warn!("ModelRegistry: not persisting {} v{}: {}", handle.symbol, handle.version, e);
                return;
            }
        };
        if let Err(e) = self.store.save(&record).await {
            warn!("ModelRegistry: failed to save {} v{}: {}", handle.symbol, handle.version, e);
            return;
        }
        match self.store.prune(&handle.symbol, self.config.retention).await {
            Ok(0) => {}
            Ok(removed) => debug!(
                "ModelRegistry: pruned {} old versions of {}",
                removed, handle.symbol
            ),
            Err(e) => warn!("ModelRegistry: failed to prune {}: {}", handle.symbol, e),
        }
    }
}
