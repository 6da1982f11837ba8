//! Auction persistence
//!
//! Every state change is written together with its outbox entry: a store
//! either commits both or neither. [`InMemoryAuctionStore`] backs tests and
//! runs without a database; `repos::PgAuctionStore` is the Postgres store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::events::outbox::{OutboxEntry, OutboxStatus};
use crate::models::Auction;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("auction {0} not found")]
    NotFound(Uuid),

    #[error("auction {id} changed concurrently: expected version {expected}, found {actual}")]
    Conflict { id: Uuid, expected: i64, actual: i64 },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid row: {0}")]
    InvalidRow(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait AuctionStore: Send + Sync {
    /// Persist a new auction and its outbox entry atomically
    async fn insert(&self, auction: &Auction, outbox: &OutboxEntry) -> Result<(), StoreError>;

    /// Replace an auction whose stored version is `expected_version`
    async fn update(
        &self,
        auction: &Auction,
        expected_version: i64,
        outbox: &OutboxEntry,
    ) -> Result<(), StoreError>;

    /// Remove an auction whose stored version is `expected_version`
    async fn delete(
        &self,
        id: Uuid,
        expected_version: i64,
        outbox: &OutboxEntry,
    ) -> Result<(), StoreError>;

    async fn get(&self, id: Uuid) -> Result<Option<Auction>, StoreError>;

    /// Auctions ordered by make, optionally only those updated strictly after
    /// `updated_after`
    async fn list(&self, updated_after: Option<DateTime<Utc>>) -> Result<Vec<Auction>, StoreError>;

    /// Pending outbox entries, oldest first
    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxEntry>, StoreError>;

    async fn mark_published(&self, outbox_id: i64) -> Result<(), StoreError>;

    /// Count a failed publish; the entry becomes `Failed` once `max_retries`
    /// attempts have failed. Returns the resulting status.
    async fn record_publish_failure(
        &self,
        outbox_id: i64,
        error: &str,
        max_retries: i32,
    ) -> Result<OutboxStatus, StoreError>;
}

#[derive(Default)]
struct State {
    auctions: HashMap<Uuid, Auction>,
    outbox: Vec<OutboxEntry>,
    next_outbox_id: i64,
}

impl State {
    fn enqueue(&mut self, entry: &OutboxEntry) {
        self.next_outbox_id += 1;
        let mut entry = entry.clone();
        entry.id = self.next_outbox_id;
        self.outbox.push(entry);
    }

    fn check_version(&self, id: Uuid, expected: i64) -> Result<(), StoreError> {
        match self.auctions.get(&id) {
            None => Err(StoreError::NotFound(id)),
            Some(current) if current.version != expected => Err(StoreError::Conflict {
                id,
                expected,
                actual: current.version,
            }),
            Some(_) => Ok(()),
        }
    }
}

/// Store kept in process memory
#[derive(Default)]
pub struct InMemoryAuctionStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
}

impl InMemoryAuctionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with [`StoreError::Unavailable`]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every outbox entry, in insertion order
    pub async fn outbox_entries(&self) -> Vec<OutboxEntry> {
        self.state.lock().await.outbox.clone()
    }

    fn guard_write(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuctionStore for InMemoryAuctionStore {
    async fn insert(&self, auction: &Auction, outbox: &OutboxEntry) -> Result<(), StoreError> {
        self.guard_write()?;
        let mut state = self.state.lock().await;
        state.auctions.insert(auction.id, auction.clone());
        state.enqueue(outbox);
        Ok(())
    }

    async fn update(
        &self,
        auction: &Auction,
        expected_version: i64,
        outbox: &OutboxEntry,
    ) -> Result<(), StoreError> {
        self.guard_write()?;
        let mut state = self.state.lock().await;
        state.check_version(auction.id, expected_version)?;
        state.auctions.insert(auction.id, auction.clone());
        state.enqueue(outbox);
        Ok(())
    }

    async fn delete(
        &self,
        id: Uuid,
        expected_version: i64,
        outbox: &OutboxEntry,
    ) -> Result<(), StoreError> {
        self.guard_write()?;
        let mut state = self.state.lock().await;
        state.check_version(id, expected_version)?;
        state.auctions.remove(&id);
        state.enqueue(outbox);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Auction>, StoreError> {
        Ok(self.state.lock().await.auctions.get(&id).cloned())
    }

    async fn list(&self, updated_after: Option<DateTime<Utc>>) -> Result<Vec<Auction>, StoreError> {
        let state = self.state.lock().await;
        let mut auctions: Vec<Auction> = state
            .auctions
            .values()
            .filter(|a| updated_after.map_or(true, |after| a.updated_at > after))
            .cloned()
            .collect();
        auctions.sort_by(|a, b| a.item.make.cmp(&b.item.make).then(a.id.cmp(&b.id)));
        Ok(auctions)
    }

    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxEntry>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .outbox
            .iter()
            .filter(|e| e.status == OutboxStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_published(&self, outbox_id: i64) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.outbox.iter_mut().find(|e| e.id == outbox_id) {
            entry.status = OutboxStatus::Published;
            entry.published_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn record_publish_failure(
        &self,
        outbox_id: i64,
        error: &str,
        max_retries: i32,
    ) -> Result<OutboxStatus, StoreError> {
        let mut state = self.state.lock().await;
        let entry = state
            .outbox
            .iter_mut()
            .find(|e| e.id == outbox_id)
            .ok_or_else(|| StoreError::InvalidRow(format!("outbox entry {} not found", outbox_id)))?;

        entry.retry_count += 1;
        entry.error_message = Some(error.to_string());
        if entry.retry_count >= max_retries {
            entry.status = OutboxStatus::Failed;
        }
        Ok(entry.status)
    }
}
