use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{auction_repo, outbox_repo};
use crate::events::outbox::{OutboxEntry, OutboxStatus};
use crate::models::Auction;
use crate::store::{AuctionStore, StoreError};

/// Postgres-backed auction store
///
/// Domain rows and outbox rows share one transaction per change.
#[derive(Clone)]
pub struct PgAuctionStore {
    pool: PgPool,
}

impl PgAuctionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Explain why a versioned write matched no row
async fn version_mismatch(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    expected: i64,
) -> StoreError {
    match auction_repo::current_version(tx, id).await {
        Ok(Some(actual)) => StoreError::Conflict { id, expected, actual },
        Ok(None) => StoreError::NotFound(id),
        Err(e) => StoreError::Database(e),
    }
}

#[async_trait]
impl AuctionStore for PgAuctionStore {
    async fn insert(&self, auction: &Auction, outbox: &OutboxEntry) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        auction_repo::insert(&mut tx, auction).await?;
        outbox_repo::insert_outbox_event(&mut tx, outbox).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn update(
        &self,
        auction: &Auction,
        expected_version: i64,
        outbox: &OutboxEntry,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        if !auction_repo::update_if_version(&mut tx, auction, expected_version).await? {
            return Err(version_mismatch(&mut tx, auction.id, expected_version).await);
        }
        outbox_repo::insert_outbox_event(&mut tx, outbox).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(
        &self,
        id: Uuid,
        expected_version: i64,
        outbox: &OutboxEntry,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        if !auction_repo::delete_if_version(&mut tx, id, expected_version).await? {
            return Err(version_mismatch(&mut tx, id, expected_version).await);
        }
        outbox_repo::insert_outbox_event(&mut tx, outbox).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Auction>, StoreError> {
        auction_repo::find_by_id(&self.pool, id).await
    }

    async fn list(&self, updated_after: Option<DateTime<Utc>>) -> Result<Vec<Auction>, StoreError> {
        auction_repo::list(&self.pool, updated_after).await
    }

    async fn fetch_pending(&self, limit: usize) -> Result<Vec<OutboxEntry>, StoreError> {
        outbox_repo::fetch_pending(&self.pool, limit as i64).await
    }

    async fn mark_published(&self, outbox_id: i64) -> Result<(), StoreError> {
        Ok(outbox_repo::mark_as_published(&self.pool, outbox_id).await?)
    }

    async fn record_publish_failure(
        &self,
        outbox_id: i64,
        error: &str,
        max_retries: i32,
    ) -> Result<OutboxStatus, StoreError> {
        outbox_repo::record_failure(&self.pool, outbox_id, error, max_retries).await
    }
}
