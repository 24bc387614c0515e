//! Shared cache cell and the optimistic-mutation helper.
//!
//! Every store keeps its collection in a [`Cache`]: fetches install whole
//! snapshots through the dedicated setter (never partial field mutation
//! from multiple in-flight callbacks), and optimistic mutators go through
//! one of the two helpers so the apply/attempt/compensate shape is
//! uniform instead of re-spelled per operation.
//!
//! The epoch counter guards against stale completions: it is bumped on
//! every identity change, and a fetch started under an old epoch discards
//! its result instead of installing it into a now-irrelevant cache.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::sync::RwLock;
use tracing::warn;

use crate::error::DataError;

/// A store's local copy of one remote collection.
pub(crate) struct Cache<T> {
    items: RwLock<Vec<T>>,
    epoch: AtomicU64,
}

impl<T: Clone> Cache<T> {
    pub(crate) fn new() -> Self {
        Self {
            items: RwLock::new(Vec::new()),
            epoch: AtomicU64::new(0),
        }
    }

    /// Current contents, cloned.
    pub(crate) async fn snapshot(&self) -> Vec<T> {
        self.items.read().await.clone()
    }

    /// Replace the contents.
    pub(crate) async fn set(&self, items: Vec<T>) {
        *self.items.write().await = items;
    }

    /// Replace the contents only if the epoch is still current; returns
    /// whether the snapshot was installed.
    pub(crate) async fn set_if_epoch(&self, epoch: u64, items: Vec<T>) -> bool {
        let mut guard = self.items.write().await;
        if self.epoch.load(Ordering::SeqCst) != epoch {
            return false;
        }
        *guard = items;
        true
    }

    /// Drop all contents.
    pub(crate) async fn clear(&self) {
        self.items.write().await.clear();
    }

    /// Apply an in-place mutation under the write lock.
    pub(crate) async fn mutate<R>(&self, f: impl FnOnce(&mut Vec<T>) -> R) -> R {
        f(&mut *self.items.write().await)
    }

    /// The current epoch; capture before starting a fetch.
    pub(crate) fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Invalidate in-flight fetches (identity changed).
    pub(crate) fn bump_epoch(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
    }

    /// Optimistic mutation whose prior state is cheaply invertible:
    /// apply locally, attempt the remote write, undo locally on failure.
    pub(crate) async fn optimistic_undo<R, F>(
        &self,
        apply: impl FnOnce(&mut Vec<T>),
        undo: impl FnOnce(&mut Vec<T>),
        remote: F,
    ) -> Result<R, DataError>
    where
        F: Future<Output = Result<R, DataError>>,
    {
        self.mutate(apply).await;
        match remote.await {
            Ok(value) => Ok(value),
            Err(err) => {
                self.mutate(undo).await;
                Err(err)
            }
        }
    }

    /// Optimistic mutation whose prior state is not cheaply
    /// reconstructable: apply locally, attempt the remote write, and
    /// resynchronize with a full refetch on failure.
    pub(crate) async fn optimistic_refetch<R, F, RF, RFut>(
        &self,
        apply: impl FnOnce(&mut Vec<T>),
        remote: F,
        refetch: RF,
    ) -> Result<R, DataError>
    where
        F: Future<Output = Result<R, DataError>>,
        RF: FnOnce() -> RFut,
        RFut: Future<Output = Result<(), DataError>>,
    {
        self.mutate(apply).await;
        match remote.await {
            Ok(value) => Ok(value),
            Err(err) => {
                if let Err(refetch_err) = refetch().await {
                    warn!("resync after failed write also failed: {}", refetch_err);
                }
                Err(err)
            }
        }
    }
}

/// Loading flag and last-error slot exposed by each store.
pub(crate) struct Status {
    loading: AtomicBool,
    last_error: Mutex<Option<DataError>>,
}

impl Status {
    pub(crate) fn new() -> Self {
        Self {
            loading: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    pub(crate) fn set_loading(&self, loading: bool) {
        self.loading.store(loading, Ordering::SeqCst);
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Record the outcome of the latest read.
    pub(crate) fn record(&self, error: Option<DataError>) {
        *self
            .last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = error;
    }

    pub(crate) fn last_error(&self) -> Option<DataError> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
