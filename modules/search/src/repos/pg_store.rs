use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::item_repo;
use crate::models::{Item, SearchPage, SearchQuery, Tombstone};
use crate::store::{ReplicaStore, StoreError};

/// Postgres-backed replica store
#[derive(Clone)]
pub struct PgReplicaStore {
    pool: PgPool,
}

impl PgReplicaStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReplicaStore for PgReplicaStore {
    async fn get(&self, id: Uuid) -> Result<Option<Item>, StoreError> {
        item_repo::find_by_id(&self.pool, id).await
    }

    async fn tombstone(&self, id: Uuid) -> Result<Option<Tombstone>, StoreError> {
        Ok(item_repo::find_tombstone(&self.pool, id).await?)
    }

    async fn upsert(&self, item: &Item) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let written = item_repo::upsert_if_newer(&mut tx, item).await?;
        if written {
            item_repo::delete_older_tombstone(&mut tx, item.id, item.version).await?;
        }
        tx.commit().await?;
        Ok(written)
    }

    async fn remove(&self, tombstone: &Tombstone) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;
        let removed = match item_repo::delete_if_not_newer(&mut tx, tombstone.id, tombstone.version).await? {
            None => return Ok(false),
            Some(removed) => removed,
        };
        item_repo::upsert_tombstone(&mut tx, tombstone).await?;
        tx.commit().await?;
        Ok(removed)
    }

    async fn max_updated_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(item_repo::max_updated_at(&self.pool).await?)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(item_repo::count(&self.pool).await? as usize)
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, StoreError> {
        let (items, total) = item_repo::search(&self.pool, query).await?;
        Ok(SearchPage::new(items, total as usize, query.limit()))
    }
}
