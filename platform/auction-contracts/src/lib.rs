//! Auction event contracts
//!
//! The message shapes the auction service publishes and the search service
//! consumes. Every event is carried in an [`event_bus::EventEnvelope`] whose
//! `event_type` is the event's [`DomainEvent::EVENT_TYPE`].
//!
//! `id` is the auction's identity: stable across Created, Updated and Deleted
//! for one auction, and the key consumers converge on. `version` increases
//! by one with every committed change of the auction, so consumers can tell
//! a stale delivery from a fresh one.

mod auction_created;
mod auction_deleted;
mod auction_updated;

pub use auction_created::AuctionCreated;
pub use auction_deleted::AuctionDeleted;
pub use auction_updated::AuctionUpdated;

pub use event_bus::{fault_subject, fault_type, subject_for};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const AUCTION_CREATED: &str = "auction.created";
pub const AUCTION_UPDATED: &str = "auction.updated";
pub const AUCTION_DELETED: &str = "auction.deleted";

/// Module name stamped into envelopes published by the auction service
pub const SOURCE_MODULE: &str = "auction";

/// An event about one auction
pub trait DomainEvent: Serialize {
    const EVENT_TYPE: &'static str;

    fn auction_id(&self) -> Uuid;

    fn version(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuctionStatus {
    #[default]
    Live,
    Finished,
    ReserveNotMet,
}

impl AuctionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuctionStatus::Live => "Live",
            AuctionStatus::Finished => "Finished",
            AuctionStatus::ReserveNotMet => "ReserveNotMet",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Live" => Some(AuctionStatus::Live),
            "Finished" => Some(AuctionStatus::Finished),
            "ReserveNotMet" => Some(AuctionStatus::ReserveNotMet),
            _ => None,
        }
    }
}
