use chrono::{DateTime, Utc};
use event_bus::EventEnvelope;
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Published,
    /// Gave up after too many publish attempts
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Published => "published",
            OutboxStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(OutboxStatus::Pending),
            "published" => Some(OutboxStatus::Published),
            "failed" => Some(OutboxStatus::Failed),
            _ => None,
        }
    }
}

/// An event waiting in the outbox
///
/// `payload` is the whole serialized envelope, so the relay publishes exactly
/// the bytes that were committed with the domain change.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxEntry {
    /// Sequence assigned by the store on insert; 0 until then
    pub id: i64,
    pub event_id: Uuid,
    pub event_type: String,
    pub aggregate_id: Uuid,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub published_at: Option<DateTime<Utc>>,
    pub retry_count: i32,
    pub status: OutboxStatus,
    pub error_message: Option<String>,
}

impl OutboxEntry {
    pub fn from_envelope<T: Serialize>(
        envelope: &EventEnvelope<T>,
        aggregate_id: Uuid,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            id: 0,
            event_id: envelope.event_id,
            event_type: envelope.event_type.clone(),
            aggregate_id,
            payload: serde_json::to_value(envelope)?,
            created_at: envelope.occurred_at,
            published_at: None,
            retry_count: 0,
            status: OutboxStatus::Pending,
            error_message: None,
        })
    }
}
