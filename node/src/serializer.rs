//! Keyed exclusive sections for balance-mutating work.
//!
//! At most one closure runs at a time per key. A section may hold several
//! keys at once (a voter and the owner of the voted content); keys are
//! always locked in sorted order. Sections with disjoint keys run in
//! parallel, bounded by a global semaphore. Admission is bounded too: a
//! request that cannot enter its key's section within the admission timeout,
//! or that finds too many requests already queued for the key, fails instead
//! of waiting indefinitely.
//!
//! The closure runs on the blocking pool and owns the lock guards, so a
//! caller that gives up after admission cannot release a lock before the
//! closure has finished.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};

use crate::metrics::VoteMetrics;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializerConfig {
    /// Longest time a request may wait to enter its key's section.
    #[serde(default = "default_admission_timeout_ms")]
    pub admission_timeout_ms: u64,

    /// Requests allowed in flight (queued or running) per key.
    #[serde(default = "default_max_pending_per_voter")]
    pub max_pending_per_voter: usize,

    /// Exclusive sections allowed to run at once across all keys.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_admission_timeout_ms() -> u64 {
    5_000
}

fn default_max_pending_per_voter() -> usize {
    64
}

fn default_max_concurrent() -> usize {
    256
}

impl SerializerConfig {
    pub fn admission_timeout(&self) -> Duration {
        Duration::from_millis(self.admission_timeout_ms)
    }
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            admission_timeout_ms: default_admission_timeout_ms(),
            max_pending_per_voter: default_max_pending_per_voter(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializerError {
    #[error("{pending} requests already in flight for {key}")]
    Saturated { key: String, pending: usize },

    #[error("not admitted for {key} within {waited:?}")]
    TimedOut { key: String, waited: Duration },

    #[error("serializer is shut down")]
    Closed,

    #[error("exclusive section failed: {0}")]
    TaskFailed(String),
}

/// Per-key lock plus a count of requests holding or waiting for it.
struct KeySlot {
    lock: Arc<Mutex<()>>,
    pending: AtomicUsize,
}

type SlotMap = Arc<StdMutex<HashMap<String, Arc<KeySlot>>>>;

fn lock_slots(slots: &SlotMap) -> MutexGuard<'_, HashMap<String, Arc<KeySlot>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts a request against its key until dropped, then removes the key's
/// slot if nobody else holds or waits for it.
///
/// Leases are dropped on every exit path (rejection, timeout, a cancelled
/// caller, or the end of the section), so idle slots never accumulate.
struct KeyLease {
    key: String,
    slot: Option<Arc<KeySlot>>,
    slots: SlotMap,
}

impl KeyLease {
    /// Register a request for `key` and return the number that were already
    /// in flight.
    fn acquire(slots: &SlotMap, key: &str) -> (Self, usize) {
        let slot = {
            let mut map = lock_slots(slots);
            map.entry(key.to_string())
                .or_insert_with(|| {
                    Arc::new(KeySlot {
                        lock: Arc::new(Mutex::new(())),
                        pending: AtomicUsize::new(0),
                    })
                })
                .clone()
        };
        let ahead = slot.pending.fetch_add(1, Ordering::SeqCst);
        let lease = Self {
            key: key.to_string(),
            slot: Some(slot),
            slots: Arc::clone(slots),
        };
        (lease, ahead)
    }

    fn lock(&self) -> Option<Arc<Mutex<()>>> {
        self.slot.as_ref().map(|slot| Arc::clone(&slot.lock))
    }
}

impl Drop for KeyLease {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.take() {
            slot.pending.fetch_sub(1, Ordering::SeqCst);
            drop(slot);
            let mut map = lock_slots(&self.slots);
            if map
                .get(&self.key)
                .is_some_and(|slot| Arc::strong_count(slot) == 1)
            {
                map.remove(&self.key);
            }
        }
    }
}

/// Marks one exclusive section as running until dropped.
struct ActiveGuard {
    active: Arc<AtomicUsize>,
    metrics: Option<Arc<VoteMetrics>>,
}

impl ActiveGuard {
    fn enter(active: &Arc<AtomicUsize>, metrics: Option<Arc<VoteMetrics>>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        if let Some(m) = &metrics {
            m.exclusive_sections_active.inc();
        }
        Self {
            active: Arc::clone(active),
            metrics,
        }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        if let Some(m) = &self.metrics {
            m.exclusive_sections_active.dec();
        }
    }
}

pub struct ConcurrencySerializer {
    slots: SlotMap,
    semaphore: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
    config: SerializerConfig,
    metrics: Option<Arc<VoteMetrics>>,
}

impl ConcurrencySerializer {
    pub fn new(config: SerializerConfig) -> Self {
        Self {
            slots: Arc::new(StdMutex::new(HashMap::new())),
            semaphore: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            active: Arc::new(AtomicUsize::new(0)),
            config,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<VoteMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &SerializerConfig {
        &self.config
    }

    /// Run `f` with exclusive access for `key`.
    ///
    /// Sections for the same key run one at a time in admission order.
    pub async fn run_exclusive<F, R>(&self, key: &str, f: F) -> Result<R, SerializerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        self.run_exclusive_all(&[key], f).await
    }

    /// Run `f` with exclusive access for every key in `keys` at once.
    ///
    /// Keys are locked in sorted order, so two sections sharing keys can never
    /// wait on each other. Duplicate keys are locked once.
    pub async fn run_exclusive_all<F, R>(&self, keys: &[&str], f: F) -> Result<R, SerializerError>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut keys = keys.to_vec();
        keys.sort_unstable();
        keys.dedup();
        let label = keys.join(",");

        let mut leases = Vec::with_capacity(keys.len());
        for key in &keys {
            let (lease, ahead) = KeyLease::acquire(&self.slots, key);
            leases.push(lease);
            if ahead >= self.config.max_pending_per_voter {
                tracing::warn!(key, pending = ahead, "exclusive section saturated");
                return Err(SerializerError::Saturated {
                    key: key.to_string(),
                    pending: ahead,
                });
            }
        }

        let started = Instant::now();
        let locks: Vec<_> = leases.iter().filter_map(KeyLease::lock).collect();
        let semaphore = Arc::clone(&self.semaphore);
        let admission = async move {
            let mut guards = Vec::with_capacity(locks.len());
            for lock in locks {
                guards.push(lock.lock_owned().await);
            }
            let permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| SerializerError::Closed)?;
            Ok::<_, SerializerError>((guards, permit))
        };
        let timeout = self.config.admission_timeout();
        let (guards, permit) = match tokio::time::timeout(timeout, admission).await {
            Ok(admitted) => admitted?,
            Err(_) => {
                tracing::warn!(
                    key = %label,
                    waited_ms = timeout.as_millis() as u64,
                    "exclusive section admission timed out"
                );
                return Err(SerializerError::TimedOut {
                    key: label,
                    waited: started.elapsed(),
                });
            }
        };

        let waited = started.elapsed();
        if let Some(m) = &self.metrics {
            m.serializer_wait_ms.observe(waited.as_secs_f64() * 1000.0);
        }
        tracing::trace!(
            key = %label,
            waited_us = waited.as_micros() as u64,
            "admitted to exclusive section"
        );

        let active = ActiveGuard::enter(&self.active, self.metrics.clone());
        let handle = tokio::task::spawn_blocking(move || {
            let result = f();
            drop(active);
            drop(permit);
            drop(guards);
            drop(leases);
            result
        });

        handle
            .await
            .map_err(|e| SerializerError::TaskFailed(e.to_string()))
    }

    /// Number of keys with a live slot.
    pub fn tracked_keys(&self) -> usize {
        lock_slots(&self.slots).len()
    }

    /// Number of exclusive sections currently running.
    pub fn active_sections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}
