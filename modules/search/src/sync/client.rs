use async_trait::async_trait;
use auction_contracts::AuctionStatus;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use super::SyncError;
use crate::models::Item;

/// An auction as returned by the auction service's query endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuctionSnapshot {
    pub id: Uuid,
    pub reserve_price: i32,
    pub seller: String,
    pub winner: Option<String>,
    pub sold_amount: Option<i32>,
    pub current_high_bid: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub auction_end: DateTime<Utc>,
    pub status: AuctionStatus,
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub mileage: i32,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub version: i64,
}

impl From<AuctionSnapshot> for Item {
    fn from(s: AuctionSnapshot) -> Self {
        Item {
            id: s.id,
            reserve_price: s.reserve_price,
            seller: s.seller,
            winner: s.winner,
            sold_amount: s.sold_amount,
            current_high_bid: s.current_high_bid,
            created_at: s.created_at,
            updated_at: s.updated_at,
            auction_end: s.auction_end,
            status: s.status,
            make: s.make,
            model: s.model,
            year: s.year,
            color: s.color,
            mileage: s.mileage,
            image_url: s.image_url,
            version: s.version,
        }
    }
}

/// Where catch-up pulls auctions from
#[async_trait]
pub trait AuctionSource: Send + Sync {
    /// Auctions updated strictly after `since`, or all of them when `None`
    async fn fetch_updated_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AuctionSnapshot>, SyncError>;
}

/// HTTP client for `GET {base_url}/api/auctions?date=`
#[derive(Debug, Clone)]
pub struct AuctionServiceClient {
    client: reqwest::Client,
    base_url: String,
}

impl AuctionServiceClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AuctionSource for AuctionServiceClient {
    async fn fetch_updated_since(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<AuctionSnapshot>, SyncError> {
        let url = format!("{}/api/auctions", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(since) = since {
            request = request.query(&[("date", since.to_rfc3339_opts(SecondsFormat::AutoSi, true))]);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                url,
                status: status.as_u16(),
            });
        }

        Ok(response.json::<Vec<AuctionSnapshot>>().await?)
    }
}
