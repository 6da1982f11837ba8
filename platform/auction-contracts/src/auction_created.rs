use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuctionStatus, DomainEvent, AUCTION_CREATED};

/// Full snapshot of a newly committed auction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionCreated {
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
    #[serde(default)]
    pub version: i64,
}

impl AuctionCreated {
    /// The same attributes under a fresh identity, as a first version
    pub fn with_new_identity(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            version: 1,
            ..self.clone()
        }
    }
}

impl DomainEvent for AuctionCreated {
    const EVENT_TYPE: &'static str = AUCTION_CREATED;

    fn auction_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}
