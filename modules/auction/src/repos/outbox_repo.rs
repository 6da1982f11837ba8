//! Outbox repository for reliable event publishing
//!
//! Entries are inserted in the same transaction as the auction change they
//! describe and drained by the relay in id order.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::events::outbox::{OutboxEntry, OutboxStatus};
use crate::store::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct OutboxRow {
    id: i64,
    event_id: Uuid,
    event_type: String,
    aggregate_id: Uuid,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    retry_count: i32,
    status: String,
    error_message: Option<String>,
}

impl TryFrom<OutboxRow> for OutboxEntry {
    type Error = StoreError;

    fn try_from(row: OutboxRow) -> Result<Self, Self::Error> {
        let status = OutboxStatus::from_str(&row.status).ok_or_else(|| {
            StoreError::InvalidRow(format!("outbox entry {} has unknown status '{}'", row.id, row.status))
        })?;

        Ok(OutboxEntry {
            id: row.id,
            event_id: row.event_id,
            event_type: row.event_type,
            aggregate_id: row.aggregate_id,
            payload: row.payload,
            created_at: row.created_at,
            published_at: row.published_at,
            retry_count: row.retry_count,
            status,
            error_message: row.error_message,
        })
    }
}

/// Insert an event into the outbox for later publishing
pub async fn insert_outbox_event(
    tx: &mut Transaction<'_, Postgres>,
    entry: &OutboxEntry,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO events_outbox
            (event_id, event_type, aggregate_id, payload, created_at, status)
        VALUES ($1, $2, $3, $4, $5, 'pending')
        "#,
    )
    .bind(entry.event_id)
    .bind(&entry.event_type)
    .bind(entry.aggregate_id)
    .bind(&entry.payload)
    .bind(entry.created_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn fetch_pending(pool: &PgPool, limit: i64) -> Result<Vec<OutboxEntry>, StoreError> {
    let rows: Vec<OutboxRow> = sqlx::query_as(
        r#"
        SELECT id, event_id, event_type, aggregate_id, payload, created_at,
               published_at, retry_count, status, error_message
        FROM events_outbox
        WHERE status = 'pending'
        ORDER BY id ASC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(OutboxEntry::try_from).collect()
}

pub async fn mark_as_published(pool: &PgPool, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE events_outbox
        SET status = 'published', published_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Count a failed publish, flipping the entry to 'failed' at `max_retries`
pub async fn record_failure(
    pool: &PgPool,
    id: i64,
    error: &str,
    max_retries: i32,
) -> Result<OutboxStatus, StoreError> {
    let status: String = sqlx::query_scalar(
        r#"
        UPDATE events_outbox
        SET retry_count = retry_count + 1,
            error_message = $2,
            status = CASE WHEN retry_count + 1 >= $3 THEN 'failed' ELSE 'pending' END
        WHERE id = $1
        RETURNING status
        "#,
    )
    .bind(id)
    .bind(error)
    .bind(max_retries)
    .fetch_one(pool)
    .await?;

    OutboxStatus::from_str(&status)
        .ok_or_else(|| StoreError::InvalidRow(format!("outbox entry {} has unknown status '{}'", id, status)))
}
