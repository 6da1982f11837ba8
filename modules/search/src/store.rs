//! Replica persistence
//!
//! Writes are guarded by version so that interleaved deliveries for one
//! auction cannot move a record backwards: an upsert only lands when it is at
//! least as new as the stored record and newer than any tombstone, and a
//! removal only takes out records no newer than itself.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Item, SearchPage, SearchQuery, Tombstone};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ReplicaStore: Send + Sync {
    async fn get(&self, id: Uuid) -> Result<Option<Item>, StoreError>;

    async fn tombstone(&self, id: Uuid) -> Result<Option<Tombstone>, StoreError>;

    /// Insert or overwrite `item` unless a newer version or tombstone exists.
    /// Returns whether the write landed; a landed write clears older tombstones.
    async fn upsert(&self, item: &Item) -> Result<bool, StoreError>;

    /// Remove the record unless it is newer than the tombstone, and remember
    /// the deletion. Returns whether a record was removed.
    async fn remove(&self, tombstone: &Tombstone) -> Result<bool, StoreError>;

    /// Latest `updated_at` across all records, `None` when empty
    async fn max_updated_at(&self) -> Result<Option<DateTime<Utc>>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Matching records ordered by make
    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, StoreError>;
}

#[derive(Default)]
struct State {
    items: HashMap<Uuid, Item>,
    tombstones: HashMap<Uuid, Tombstone>,
}

/// Store kept in process memory
#[derive(Default)]
pub struct InMemoryReplicaStore {
    state: RwLock<State>,
    failing_writes: AtomicU32,
}

impl InMemoryReplicaStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` writes fail with [`StoreError::Unavailable`]
    pub fn fail_next_writes(&self, n: u32) {
        self.failing_writes.store(n, Ordering::SeqCst);
    }

    fn guard_write(&self) -> Result<(), StoreError> {
        let armed = self
            .failing_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if armed {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ReplicaStore for InMemoryReplicaStore {
    async fn get(&self, id: Uuid) -> Result<Option<Item>, StoreError> {
        Ok(self.state.read().await.items.get(&id).cloned())
    }

    async fn tombstone(&self, id: Uuid) -> Result<Option<Tombstone>, StoreError> {
        Ok(self.state.read().await.tombstones.get(&id).copied())
    }

    async fn upsert(&self, item: &Item) -> Result<bool, StoreError> {
        self.guard_write()?;
        let mut state = self.state.write().await;

        if let Some(t) = state.tombstones.get(&item.id) {
            if t.version >= item.version {
                return Ok(false);
            }
        }
        if let Some(current) = state.items.get(&item.id) {
            if current.version > item.version {
                return Ok(false);
            }
        }

        state.tombstones.remove(&item.id);
        state.items.insert(item.id, item.clone());
        Ok(true)
    }

    async fn remove(&self, tombstone: &Tombstone) -> Result<bool, StoreError> {
        self.guard_write()?;
        let mut state = self.state.write().await;

        let removed = match state.items.get(&tombstone.id).map(|i| i.version) {
            Some(current) if current > tombstone.version => return Ok(false),
            Some(_) => {
                state.items.remove(&tombstone.id);
                true
            }
            None => false,
        };

        let keep_existing = state
            .tombstones
            .get(&tombstone.id)
            .is_some_and(|t| t.version >= tombstone.version);
        if !keep_existing {
            state.tombstones.insert(tombstone.id, *tombstone);
        }
        Ok(removed)
    }

    async fn max_updated_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.state.read().await.items.values().map(|i| i.updated_at).max())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.state.read().await.items.len())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, StoreError> {
        let state = self.state.read().await;
        let mut matches: Vec<&Item> = state.items.values().filter(|i| query.matches(i)).collect();
        matches.sort_by(|a, b| a.make.cmp(&b.make).then(a.id.cmp(&b.id)));

        let total = matches.len();
        let results = matches
            .into_iter()
            .skip(query.offset())
            .take(query.limit())
            .cloned()
            .collect();
        Ok(SearchPage::new(results, total, query.limit()))
    }
}
