use auction_contracts::AuctionStatus;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::models::{Auction, Item};
use crate::store::StoreError;

#[derive(Debug, sqlx::FromRow)]
struct AuctionRow {
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

impl TryFrom<AuctionRow> for Auction {
    type Error = StoreError;

    fn try_from(row: AuctionRow) -> Result<Self, Self::Error> {
        let status = AuctionStatus::from_str(&row.status).ok_or_else(|| {
            StoreError::InvalidRow(format!("auction {} has unknown status '{}'", row.id, row.status))
        })?;

        Ok(Auction {
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
            item: Item {
                make: row.make,
                model: row.model,
                year: row.year,
                color: row.color,
                mileage: row.mileage,
                image_url: row.image_url,
            },
            version: row.version,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT id, reserve_price, seller, winner, sold_amount, current_high_bid,
           created_at, updated_at, auction_end, status,
           make, model, year, color, mileage, image_url, version
    FROM auctions
"#;

pub async fn insert(tx: &mut Transaction<'_, Postgres>, auction: &Auction) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO auctions (
            id, reserve_price, seller, winner, sold_amount, current_high_bid,
            created_at, updated_at, auction_end, status,
            make, model, year, color, mileage, image_url, version
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(auction.id)
    .bind(auction.reserve_price)
    .bind(&auction.seller)
    .bind(&auction.winner)
    .bind(auction.sold_amount)
    .bind(auction.current_high_bid)
    .bind(auction.created_at)
    .bind(auction.updated_at)
    .bind(auction.auction_end)
    .bind(auction.status.as_str())
    .bind(&auction.item.make)
    .bind(&auction.item.model)
    .bind(auction.item.year)
    .bind(&auction.item.color)
    .bind(auction.item.mileage)
    .bind(&auction.item.image_url)
    .bind(auction.version)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// Overwrite the auction if its stored version is `expected_version`;
/// returns false when no row matched
pub async fn update_if_version(
    tx: &mut Transaction<'_, Postgres>,
    auction: &Auction,
    expected_version: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE auctions
        SET reserve_price = $3, seller = $4, winner = $5, sold_amount = $6,
            current_high_bid = $7, updated_at = $8, auction_end = $9, status = $10,
            make = $11, model = $12, year = $13, color = $14, mileage = $15,
            image_url = $16, version = $17
        WHERE id = $1 AND version = $2
        "#,
    )
    .bind(auction.id)
    .bind(expected_version)
    .bind(auction.reserve_price)
    .bind(&auction.seller)
    .bind(&auction.winner)
    .bind(auction.sold_amount)
    .bind(auction.current_high_bid)
    .bind(auction.updated_at)
    .bind(auction.auction_end)
    .bind(auction.status.as_str())
    .bind(&auction.item.make)
    .bind(&auction.item.model)
    .bind(auction.item.year)
    .bind(&auction.item.color)
    .bind(auction.item.mileage)
    .bind(&auction.item.image_url)
    .bind(auction.version)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Delete the auction if its stored version is `expected_version`;
/// returns false when no row matched
pub async fn delete_if_version(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
    expected_version: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM auctions WHERE id = $1 AND version = $2")
        .bind(id)
        .bind(expected_version)
        .execute(&mut **tx)
        .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn current_version(
    tx: &mut Transaction<'_, Postgres>,
    id: Uuid,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT version FROM auctions WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Auction>, StoreError> {
    let row: Option<AuctionRow> = sqlx::query_as(&format!("{} WHERE id = $1", SELECT_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Auction::try_from).transpose()
}

pub async fn list(
    pool: &PgPool,
    updated_after: Option<DateTime<Utc>>,
) -> Result<Vec<Auction>, StoreError> {
    let rows: Vec<AuctionRow> = sqlx::query_as(&format!(
        "{} WHERE ($1::timestamptz IS NULL OR updated_at > $1) ORDER BY make, id",
        SELECT_COLUMNS
    ))
    .bind(updated_after)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(Auction::try_from).collect()
}
