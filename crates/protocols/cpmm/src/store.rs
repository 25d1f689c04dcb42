//! Pool State Store
//!
//! In-memory keyed storage of one pool (and its market status) per market.
//! Writers to the same key are serialized by a per-key lock held across the
//! whole read-compute-publish cycle; readers only take the snapshot lock,
//! which a writer holds just long enough to publish.

use std::collections::HashMap;
use std::sync::Arc;

use corner_core::MarketId;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::state::{CpmmError, MarketStatus, Pool};

/// Everything stored for one market
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEntry {
    pub pool: Pool,
    pub status: MarketStatus,
}

impl MarketEntry {
    pub fn open(pool: Pool) -> Self {
        Self {
            pool,
            status: MarketStatus::Open,
        }
    }
}

struct Slot {
    writer: Arc<Mutex<()>>,
    current: RwLock<MarketEntry>,
}

impl Slot {
    fn new(entry: MarketEntry) -> Arc<Self> {
        Arc::new(Self {
            writer: Arc::new(Mutex::new(())),
            current: RwLock::new(entry),
        })
    }
}

/// Exclusive write access to one market until committed or dropped.
/// Dropping without commit publishes nothing.
pub struct WriteGuard {
    _lock: OwnedMutexGuard<()>,
    slot: Arc<Slot>,
    entry: MarketEntry,
}

impl WriteGuard {
    /// State as of acquiring the lock; no other writer can change it
    pub fn entry(&self) -> &MarketEntry {
        &self.entry
    }

    /// Publish the new state and release the key
    pub async fn commit(self, entry: MarketEntry) {
        debug_assert_eq!(entry.pool.market_id(), self.entry.pool.market_id());
        *self.slot.current.write().await = entry;
    }
}

/// Keyed pool storage. Create one per context and share it by `Arc`.
#[derive(Default)]
pub struct PoolStore {
    slots: RwLock<HashMap<MarketId, Arc<Slot>>>,
}

impl PoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `entries`; later duplicates replace earlier ones
    pub fn with_entries(entries: impl IntoIterator<Item = MarketEntry>) -> Self {
        let slots = entries
            .into_iter()
            .map(|entry| (entry.pool.market_id().clone(), Slot::new(entry)))
            .collect();
        Self {
            slots: RwLock::new(slots),
        }
    }

    async fn slot(&self, market_id: &MarketId) -> Result<Arc<Slot>, CpmmError> {
        self.slots
            .read()
            .await
            .get(market_id)
            .cloned()
            .ok_or_else(|| CpmmError::PoolNotFound(market_id.clone()))
    }

    pub async fn contains(&self, market_id: &MarketId) -> bool {
        self.slots.read().await.contains_key(market_id)
    }

    /// Current pool of a market
    pub async fn get(&self, market_id: &MarketId) -> Result<Pool, CpmmError> {
        Ok(self.snapshot(market_id).await?.pool)
    }

    /// Current lifecycle status of a market
    pub async fn status(&self, market_id: &MarketId) -> Result<MarketStatus, CpmmError> {
        Ok(self.snapshot(market_id).await?.status)
    }

    /// Consistent copy of pool and status
    pub async fn snapshot(&self, market_id: &MarketId) -> Result<MarketEntry, CpmmError> {
        let slot = self.slot(market_id).await?;
        let entry = slot.current.read().await.clone();
        Ok(entry)
    }

    /// Register a new market. Fails if the key is taken.
    pub async fn insert(&self, entry: MarketEntry) -> Result<(), CpmmError> {
        let market_id = entry.pool.market_id().clone();
        let mut slots = self.slots.write().await;
        if slots.contains_key(&market_id) {
            return Err(CpmmError::PoolAlreadyExists(market_id));
        }
        slots.insert(market_id, Slot::new(entry));
        Ok(())
    }

    /// Replace the full pool tuple. Unknown markets are created open.
    pub async fn put(&self, pool: Pool) {
        let market_id = pool.market_id().clone();
        match self.lock(&market_id).await {
            Ok(guard) => {
                let status = guard.entry().status;
                guard.commit(MarketEntry { pool, status }).await;
            }
            Err(_) => {
                let mut slots = self.slots.write().await;
                let existing = slots.get(&market_id).cloned();
                match existing {
                    // Lost a race with another creator; fall back to its lock
                    Some(slot) => {
                        drop(slots);
                        let _lock = slot.writer.clone().lock_owned().await;
                        slot.current.write().await.pool = pool;
                    }
                    None => {
                        slots.insert(market_id, Slot::new(MarketEntry::open(pool)));
                    }
                }
            }
        }
    }

    /// Replace pool and status together. Unknown markets are created.
    pub async fn upsert(&self, entry: MarketEntry) {
        let market_id = entry.pool.market_id().clone();
        let slot = {
            let mut slots = self.slots.write().await;
            match slots.get(&market_id) {
                Some(slot) => slot.clone(),
                None => {
                    slots.insert(market_id, Slot::new(entry));
                    return;
                }
            }
        };
        let _lock = slot.writer.clone().lock_owned().await;
        *slot.current.write().await = entry;
    }

    /// Take the single-writer lock of a market
    pub async fn lock(&self, market_id: &MarketId) -> Result<WriteGuard, CpmmError> {
        let slot = self.slot(market_id).await?;
        let lock = slot.writer.clone().lock_owned().await;
        let entry = slot.current.read().await.clone();
        Ok(WriteGuard {
            _lock: lock,
            slot,
            entry,
        })
    }

    /// Read-compute-publish under the market's write lock. Nothing is
    /// published when `f` fails.
    pub async fn update<T, E, F>(&self, market_id: &MarketId, f: F) -> Result<T, E>
    where
        F: FnOnce(&MarketEntry) -> Result<(MarketEntry, T), E>,
        E: From<CpmmError>,
    {
        let guard = self.lock(market_id).await?;
        let (next, value) = f(guard.entry())?;
        guard.commit(next).await;
        Ok(value)
    }

    /// All known market IDs, sorted
    pub async fn market_ids(&self) -> Vec<MarketId> {
        let mut ids: Vec<MarketId> = self.slots.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
