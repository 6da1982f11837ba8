use auction_contracts::AuctionStatus;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{Item, SearchQuery, Tombstone};
use crate::store::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: Uuid,
    reserve_price: i32,
    seller: String,
    winner: Option<String>,
    sold_amount: Option<i32>,
    current_high_bid: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    auction_end: DateTime<Utc>,
    status: String,
    make: String,
    model: String,
    year: i32,
    color: String,
    mileage: i32,
    image_url: String,
    version: i64,
}

impl TryFrom<ItemRow> for Item {
    type Error = StoreError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let status = AuctionStatus::from_str(&row.status).ok_or_else(|| {
            StoreError::InvalidRow(format!("item {} has unknown status '{}'", row.id, row.status))
        })?;

        Ok(Item {
            id: row.id,
            reserve_price: row.reserve_price,
            seller: row.seller,
            winner: row.winner,
            sold_amount: row.sold_amount,
            current_high_bid: row.current_high_bid,
            created_at: row.created_at,
            updated_at: row.updated_at,
            auction_end: row.auction_end,
            status,
            make: row.make,
            model: row.model,
            year: row.year,
            color: row.color,
            mileage: row.mileage,
            image_url: row.image_url,
            version: row.version,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, reserve_price, seller, winner, sold_amount, current_high_bid,
           created_at, updated_at, auction_end, status,
           make, model, year, color, mileage, image_url, version
    FROM items
"#;

/// Matches make, model or color case-insensitively, and seller exactly
const SEARCH_FILTER: &str = r#"
    WHERE ($1::text IS NULL OR make ILIKE '%' || $1 || '%'
                            OR model ILIKE '%' || $1 || '%'
                            OR color ILIKE '%' || $1 || '%')
      AND ($2::text IS NULL OR seller = $2)
"#;

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Item>, StoreError> {
    let row: Option<ItemRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Item::try_from).transpose()
}

pub async fn find_tombstone(pool: &PgPool, id: Uuid) -> Result<Option<Tombstone>, sqlx::Error> {
    let row: Option<(Uuid, i64, DateTime<Utc>)> =
        sqlx::query_as("SELECT id, version, deleted_at FROM tombstones WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    Ok(row.map(|(id, version, deleted_at)| Tombstone { id, version, deleted_at }))
}

/// Insert or overwrite the item unless a newer row or an equal-or-newer
/// tombstone exists; returns whether a row was written
pub async fn upsert_if_newer(
    tx: &mut Transaction<'_, Postgres>,
    item: &Item,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO items (
            id, reserve_price, seller, winner, sold_amount, current_high_bid,
            created_at, updated_at, auction_end, status,
            make, model, year, color, mileage, image_url, version
        )
        SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17
        WHERE NOT EXISTS (SELECT 1 FROM tombstones WHERE id = $1 AND version >= $17)
        ON CONFLICT (id) DO UPDATE
        SET reserve_price = EXCLUDED.reserve_price,
            seller = EXCLUDED.seller,
            winner = EXCLUDED.winner,
            sold_amount = EXCLUDED.sold_amount,
            current_high_bid = EXCLUDED.current_high_bid,
            created_at = EXCLUDED.created_at,
            updated_at = EXCLUDED.updated_at,
            auction_end = EXCLUDED.auction_end,
            status = EXCLUDED.status,
            make = EXCLUDED.make,
            model = EXCLUDED.model,
            year = EXCLUDED.year,
            color = EXCLUDED.color,
            mileage = EXCLUDED.mileage,
            image_url = EXCLUDED.image_url,
            version = EXCLUDED.version
        WHERE items.version <= EXCLUDED.version
        "#,
    )
    .bind(item.id)
    .bind(item.reserve_price)
    .bind(&item.seller)
    .bind(&item.winner)
    .bind(item.sold_amount)
    .bind(item.current_high_bid)
    .bind(item.created_at)
    .bind(item.updated_at)
    .bind(item.auction_end)
    .bind(item.status.as_str())
    .bind(&item.make)
    .bind(&item.model)
    .bind(item.year)
    .bind(&item.color)
    .bind(item.mileage)
    .bind(&item.image_url)
    .bind(item.version)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn delete_older_tombstone(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    version: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM tombstones WHERE id = $1 AND version < $2")
        .bind(id)
        .bind(version)
        .execute(&mut **tx)
        .await?;

    Ok(())
}

/// Delete the item unless it is newer than `version`.
/// Returns `None` when a newer item blocked the delete, otherwise whether a
/// row was removed.
pub async fn delete_if_not_newer(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    version: i64,
) -> Result<Option<bool>, sqlx::Error> {
    let current: Option<i64> = sqlx::query_scalar("SELECT version FROM items WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

    match current {
        Some(v) if v > version => Ok(None),
        Some(_) => {
            sqlx::query("DELETE FROM items WHERE id = $1")
                .bind(id)
                .execute(&mut **tx)
                .await?;
            Ok(Some(true))
        }
        None => Ok(Some(false)),
    }
}

/// Record a deletion, never lowering an existing tombstone's version
pub async fn upsert_tombstone(
    tx: &mut Transaction<'_, Postgres>,
    tombstone: &Tombstone,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO tombstones (id, version, deleted_at)
        VALUES ($1, $2, $3)
        ON CONFLICT (id) DO UPDATE
        SET version = EXCLUDED.version,
            deleted_at = EXCLUDED.deleted_at
        WHERE tombstones.version < EXCLUDED.version
        "#,
    )
    .bind(tombstone.id)
    .bind(tombstone.version)
    .bind(tombstone.deleted_at)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

pub async fn max_updated_at(pool: &PgPool) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar("SELECT MAX(updated_at) FROM items")
        .fetch_one(pool)
        .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM items")
        .fetch_one(pool)
        .await
}

pub async fn search(pool: &PgPool, query: &SearchQuery) -> Result<(Vec<Item>, i64), StoreError> {
    let term = query
        .search_term
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let seller = query.seller.as_deref().filter(|s| !s.is_empty());

    let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM items {}", SEARCH_FILTER))
        .bind(term)
        .bind(seller)
        .fetch_one(pool)
        .await?;

    let rows: Vec<ItemRow> = sqlx::query_as(&format!(
        "{} {} ORDER BY make, id LIMIT $3 OFFSET $4",
        SELECT_COLUMNS, SEARCH_FILTER
    ))
    .bind(term)
    .bind(seller)
    .bind(query.limit() as i64)
    .bind(query.offset() as i64)
    .fetch_all(pool)
    .await?;

    let items = rows.into_iter().map(Item::try_from).collect::<Result<Vec<_>, _>>()?;
    Ok((items, total))
}
