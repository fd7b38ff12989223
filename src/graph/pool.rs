//! Fixed-size pool of read-only store connections.
//!
//! `rusqlite::Connection` is `Send` but not `Sync`, so each connection sits
//! behind its own `Mutex`. Requests take whichever connection is free and
//! otherwise block on one picked round-robin.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use crate::config::DatabaseConfig;
use crate::error::{CpgError, Result};
use crate::graph::store::GraphStore;

#[derive(Debug)]
pub struct StorePool {
    stores: Vec<Mutex<GraphStore>>,
    next: AtomicUsize,
}

impl StorePool {
    /// Open `config.pool_size()` read-only connections to `config.path`.
    pub fn open(config: &DatabaseConfig) -> Result<Self> {
        let stores = (0..config.pool_size())
            .map(|_| GraphStore::open(&config.path, config))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!(path = %config.path, connections = stores.len(), "store pool ready");
        Self::from_stores(stores)
    }

    /// Build a pool from already-open stores. Must not be empty.
    pub fn from_stores(stores: Vec<GraphStore>) -> Result<Self> {
        if stores.is_empty() {
            return Err(CpgError::Config("store pool needs at least one connection".into()));
        }
        Ok(Self {
            stores: stores.into_iter().map(Mutex::new).collect(),
            next: AtomicUsize::new(0),
        })
    }

    pub fn size(&self) -> usize {
        self.stores.len()
    }

    /// Borrow a store for the duration of one request.
    ///
    /// A panic while a store was held poisons its lock; the connection is
    /// still usable, so the poison is cleared rather than propagated.
    pub fn acquire(&self) -> MutexGuard<'_, GraphStore> {
        let start = self.next.fetch_add(1, Ordering::Relaxed);
        let len = self.stores.len();
        for i in 0..len {
            match self.stores[start.wrapping_add(i) % len].try_lock() {
                Ok(guard) => return guard,
                Err(TryLockError::Poisoned(e)) => return e.into_inner(),
                Err(TryLockError::WouldBlock) => {}
            }
        }
        self.stores[start % len]
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}
