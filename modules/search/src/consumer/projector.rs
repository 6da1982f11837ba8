//! Applies auction events to the replica
//!
//! Every handler is idempotent: applying the same event again leaves the
//! replica as it was after the first application. Versions decide between
//! competing deliveries for one auction, and a deletion absorbs every update
//! that is not a newer Created.

use auction_contracts::{AuctionCreated, AuctionDeleted, AuctionUpdated};
use event_consumer::ConsumerError;
use std::sync::Arc;

use crate::models::{validate_update, Item, Tombstone};
use crate::store::{ReplicaStore, StoreError};

/// What applying one event did to the replica
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The record was written or removed
    Applied,
    /// A newer version is already stored
    Stale,
    /// The auction was deleted; the event is ignored
    Absorbed,
    /// Nothing to delete
    AlreadyAbsent,
}

impl ApplyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyOutcome::Applied => "applied",
            ApplyOutcome::Stale => "stale",
            ApplyOutcome::Absorbed => "absorbed",
            ApplyOutcome::AlreadyAbsent => "already_absent",
        }
    }
}

fn store_failure(e: StoreError) -> ConsumerError {
    ConsumerError::transient("StoreError", e.to_string())
}

fn invalid(reason: String) -> ConsumerError {
    ConsumerError::validation("InvalidAuction", reason)
}

pub struct ReplicaProjector {
    store: Arc<dyn ReplicaStore>,
}

impl ReplicaProjector {
    pub fn new(store: Arc<dyn ReplicaStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn ReplicaStore> {
        &self.store
    }

    /// Upsert the full snapshot, unless stale or deleted at a newer version
    pub async fn on_created(&self, event: &AuctionCreated) -> Result<ApplyOutcome, ConsumerError> {
        let item = Item::from(event);
        item.validate().map_err(invalid)?;

        if let Some(t) = self.store.tombstone(item.id).await.map_err(store_failure)? {
            if t.version >= item.version {
                return Ok(ApplyOutcome::Absorbed);
            }
        }

        let written = self.store.upsert(&item).await.map_err(store_failure)?;
        Ok(if written { ApplyOutcome::Applied } else { ApplyOutcome::Stale })
    }

    /// Overwrite the attributes carried by the update, creating the record
    /// when its Created never arrived
    pub async fn on_updated(&self, event: &AuctionUpdated) -> Result<ApplyOutcome, ConsumerError> {
        validate_update(event).map_err(invalid)?;

        if self.store.tombstone(event.id).await.map_err(store_failure)?.is_some() {
            return Ok(ApplyOutcome::Absorbed);
        }

        let item = match self.store.get(event.id).await.map_err(store_failure)? {
            Some(current) if event.version < current.version => return Ok(ApplyOutcome::Stale),
            Some(mut current) => {
                current.apply_update(event);
                current
            }
            None => Item::from_update(event),
        };

        let written = self.store.upsert(&item).await.map_err(store_failure)?;
        Ok(if written { ApplyOutcome::Applied } else { ApplyOutcome::Stale })
    }

    /// Remove the record and remember the deletion; absence is not an error
    pub async fn on_deleted(&self, event: &AuctionDeleted) -> Result<ApplyOutcome, ConsumerError> {
        if event.id.is_nil() {
            return Err(invalid("id cannot be nil".to_string()));
        }

        if let Some(current) = self.store.get(event.id).await.map_err(store_failure)? {
            if current.version > event.version {
                return Ok(ApplyOutcome::Stale);
            }
        }

        let tombstone = Tombstone {
            id: event.id,
            version: event.version,
            deleted_at: event.deleted_at,
        };
        let removed = self.store.remove(&tombstone).await.map_err(store_failure)?;
        Ok(if removed { ApplyOutcome::Applied } else { ApplyOutcome::AlreadyAbsent })
    }
}
