use auction_contracts::{AuctionCreated, AuctionDeleted, AuctionStatus, AuctionUpdated};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// DOMAIN
// ============================================================================

/// The authoritative auction record
#[derive(Debug, Clone, PartialEq)]
pub struct Auction {
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
    pub item: Item,
    /// Starts at 1, incremented by every committed change
    pub version: i64,
}

/// The vehicle being auctioned
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub mileage: i32,
    pub image_url: String,
}

impl Auction {
    pub fn to_created_event(&self) -> AuctionCreated {
        AuctionCreated {
            id: self.id,
            reserve_price: self.reserve_price,
            seller: self.seller.clone(),
            winner: self.winner.clone(),
            sold_amount: self.sold_amount,
            current_high_bid: self.current_high_bid,
            created_at: self.created_at,
            updated_at: self.updated_at,
            auction_end: self.auction_end,
            status: self.status,
            make: self.item.make.clone(),
            model: self.item.model.clone(),
            year: self.item.year,
            color: self.item.color.clone(),
            mileage: self.item.mileage,
            image_url: self.item.image_url.clone(),
            version: self.version,
        }
    }

    /// Updated event carrying every replicated attribute
    pub fn to_updated_event(&self) -> AuctionUpdated {
        AuctionUpdated {
            id: self.id,
            version: self.version,
            updated_at: self.updated_at,
            reserve_price: Some(self.reserve_price),
            seller: Some(self.seller.clone()),
            winner: self.winner.clone(),
            sold_amount: self.sold_amount,
            current_high_bid: self.current_high_bid,
            created_at: Some(self.created_at),
            auction_end: Some(self.auction_end),
            status: Some(self.status),
            make: Some(self.item.make.clone()),
            model: Some(self.item.model.clone()),
            year: Some(self.item.year),
            color: Some(self.item.color.clone()),
            mileage: Some(self.item.mileage),
            image_url: Some(self.item.image_url.clone()),
        }
    }

    pub fn to_deleted_event(&self, deleted_at: DateTime<Utc>) -> AuctionDeleted {
        AuctionDeleted {
            id: self.id,
            version: self.version + 1,
            deleted_at,
        }
    }
}

// ============================================================================
// HTTP CONTRACTS
// ============================================================================

/// Snapshot returned by the query endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionDto {
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
    pub image_url: String,
    pub version: i64,
}

impl From<&Auction> for AuctionDto {
    fn from(a: &Auction) -> Self {
        Self {
            id: a.id,
            reserve_price: a.reserve_price,
            seller: a.seller.clone(),
            winner: a.winner.clone(),
            sold_amount: a.sold_amount,
            current_high_bid: a.current_high_bid,
            created_at: a.created_at,
            updated_at: a.updated_at,
            auction_end: a.auction_end,
            status: a.status,
            make: a.item.make.clone(),
            model: a.item.model.clone(),
            year: a.item.year,
            color: a.item.color.clone(),
            mileage: a.item.mileage,
            image_url: a.item.image_url.clone(),
            version: a.version,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAuctionRequest {
    pub make: String,
    pub model: String,
    pub year: i32,
    pub color: String,
    pub mileage: i32,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub reserve_price: i32,
    pub auction_end: DateTime<Utc>,
}

/// Item attributes to change; absent fields keep their current value
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAuctionRequest {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub mileage: Option<i32>,
}

impl UpdateAuctionRequest {
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(make) = &self.make {
            item.make = make.clone();
        }
        if let Some(model) = &self.model {
            item.model = model.clone();
        }
        if let Some(year) = self.year {
            item.year = year;
        }
        if let Some(color) = &self.color {
            item.color = color.clone();
        }
        if let Some(mileage) = self.mileage {
            item.mileage = mileage;
        }
    }
}
