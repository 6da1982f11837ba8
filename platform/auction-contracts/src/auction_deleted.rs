use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DomainEvent, AUCTION_DELETED};

/// An auction was removed; `version` is one past its last committed version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuctionDeleted {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub deleted_at: DateTime<Utc>,
}

impl DomainEvent for AuctionDeleted {
    const EVENT_TYPE: &'static str = AUCTION_DELETED;

    fn auction_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}
