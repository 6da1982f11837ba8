use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuctionStatus, DomainEvent, AUCTION_UPDATED};

/// A committed change to an auction
///
/// Attributes are optional: consumers overwrite only the ones present. The
/// auction service publishes every replicated attribute, so an Updated alone
/// is enough to rebuild a record whose Created was missed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuctionUpdated {
    pub id: Uuid,
    #[serde(default)]
    pub version: i64,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserve_price: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seller: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sold_amount: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_high_bid: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_end: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AuctionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub make: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl DomainEvent for AuctionUpdated {
    const EVENT_TYPE: &'static str = AUCTION_UPDATED;

    fn auction_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_attributes_are_not_serialized() {
        let event = AuctionUpdated {
            id: Uuid::new_v4(),
            version: 2,
            updated_at: Utc::now(),
            make: Some("Ferrari".to_string()),
            ..Default::default()
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["make"], "Ferrari");
        assert!(value.get("model").is_none());
        assert!(value.get("winner").is_none());
    }

    #[test]
    fn test_partial_payload_decodes() {
        let event: AuctionUpdated = serde_json::from_value(json!({
            "id": "550e8400-e29b-41d4-a716-446655440000",
            "updated_at": "2024-01-02T00:00:00Z",
            "mileage": 60000
        }))
        .unwrap();

        assert_eq!(event.mileage, Some(60000));
        assert_eq!(event.make, None);
        assert_eq!(event.version, 0);
    }
}
