//! # Event Envelope
//!
//! The envelope every event travels in between the auction and search services.
//!
//! ## Envelope Fields
//!
//! - `event_id`: Unique message identifier (one per publish, including republishes)
//! - `event_type`: Type discriminator consumers route on (e.g. `auction.created`)
//! - `occurred_at`: Timestamp assigned when the envelope is built
//! - `source_module`: Module that produced the event
//! - `source_version`: Semantic version of the source module
//! - `correlation_id`: Links related events in a business transaction
//! - `causation_id`: Links this event to the event that caused it
//! - `payload`: Event-specific data (generic type parameter)
//!
//! The entity identity consumers use for idempotency lives in the payload, not
//! in `event_id`: redelivering a message and republishing a corrected one both
//! target the same entity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Standard event envelope
///
/// # Examples
///
/// ```rust
/// use event_bus::EventEnvelope;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Serialize, Deserialize)]
/// struct AuctionDeleted {
///     id: String,
/// }
///
/// let envelope = EventEnvelope::new(
///     "auction.deleted".to_string(),
///     "auction".to_string(),
///     AuctionDeleted { id: "a-1".to_string() },
/// )
/// .with_correlation_id(Some("correlation-456".to_string()));
/// assert_eq!(envelope.event_type, "auction.deleted");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope<T> {
    /// Unique message identifier
    pub event_id: Uuid,

    /// Event type discriminator
    pub event_type: String,

    /// ISO 8601 timestamp when the envelope was built
    pub occurred_at: DateTime<Utc>,

    /// Module that generated the event (e.g., "auction")
    pub source_module: String,

    /// Semantic version of the source module
    pub source_version: String,

    /// Links related events in a business transaction
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    /// Links this event to the event that caused it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub causation_id: Option<String>,

    /// Event-specific payload
    pub payload: T,
}

impl<T> EventEnvelope<T> {
    /// Create a new event envelope with a generated event_id and occurred_at
    ///
    /// The source_version defaults to "1.0.0"; modules override it with their
    /// CARGO_PKG_VERSION via [`with_source_version`](Self::with_source_version).
    pub fn new(event_type: String, source_module: String, payload: T) -> Self {
        Self::with_event_id(Uuid::new_v4(), event_type, source_module, payload)
    }

    /// Create an envelope with explicit event_id (outbox rows, tests)
    pub fn with_event_id(
        event_id: Uuid,
        event_type: String,
        source_module: String,
        payload: T,
    ) -> Self {
        Self {
            event_id,
            event_type,
            occurred_at: Utc::now(),
            source_module,
            source_version: "1.0.0".to_string(),
            correlation_id: None,
            causation_id: None,
            payload,
        }
    }

    /// Set the source version
    pub fn with_source_version(mut self, version: String) -> Self {
        self.source_version = version;
        self
    }

    /// Set the correlation ID
    pub fn with_correlation_id(mut self, correlation_id: Option<String>) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    /// Set the causation ID
    pub fn with_causation_id(mut self, causation_id: Option<String>) -> Self {
        self.causation_id = causation_id;
        self
    }

    /// Replace the payload, keeping every envelope field
    pub fn map_payload<U>(self, f: impl FnOnce(T) -> U) -> EventEnvelope<U> {
        EventEnvelope {
            event_id: self.event_id,
            event_type: self.event_type,
            occurred_at: self.occurred_at,
            source_module: self.source_module,
            source_version: self.source_version,
            correlation_id: self.correlation_id,
            causation_id: self.causation_id,
            payload: f(self.payload),
        }
    }
}

/// Validate the envelope fields of an untyped event
///
/// # Validation Rules
///
/// - `event_id`: Must be a valid UUID
/// - `event_type`: Must be non-empty
/// - `occurred_at`: Must be present
/// - `source_module`: Must be non-empty
/// - `source_version`: Must be non-empty
/// - `payload`: Must be present
pub fn validate_envelope_fields(envelope: &serde_json::Value) -> Result<(), String> {
    let event_id = envelope
        .get("event_id")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid event_id")?;
    Uuid::parse_str(event_id).map_err(|e| format!("event_id is not a UUID: {}", e))?;

    envelope
        .get("occurred_at")
        .and_then(|v| v.as_str())
        .ok_or("Missing or invalid occurred_at")?;

    for field in ["event_type", "source_module", "source_version"] {
        let value = envelope
            .get(field)
            .and_then(|v| v.as_str())
            .ok_or_else(|| format!("Missing or invalid {}", field))?;

        if value.is_empty() {
            return Err(format!("{} cannot be empty", field));
        }
    }

    if envelope.get("payload").is_none() {
        return Err("Missing payload".to_string());
    }

    // correlation_id and causation_id are optional
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_creation() {
        let envelope = EventEnvelope::new(
            "auction.created".to_string(),
            "auction".to_string(),
            json!({"make": "Ford"}),
        );

        assert_eq!(envelope.event_type, "auction.created");
        assert_eq!(envelope.source_module, "auction");
        assert!(envelope.correlation_id.is_none());
        assert!(envelope.causation_id.is_none());
    }

    #[test]
    fn test_envelope_with_builder() {
        let envelope = EventEnvelope::new(
            "auction.updated".to_string(),
            "auction".to_string(),
            json!({}),
        )
        .with_source_version("1.2.3".to_string())
        .with_correlation_id(Some("corr-456".to_string()))
        .with_causation_id(Some("cause-789".to_string()));

        assert_eq!(envelope.source_version, "1.2.3");
        assert_eq!(envelope.correlation_id, Some("corr-456".to_string()));
        assert_eq!(envelope.causation_id, Some("cause-789".to_string()));
    }

    #[test]
    fn test_map_payload_keeps_metadata() {
        let envelope = EventEnvelope::new(
            "auction.deleted".to_string(),
            "auction".to_string(),
            json!({"id": "a"}),
        )
        .with_correlation_id(Some("corr".to_string()));
        let event_id = envelope.event_id;

        let mapped = envelope.map_payload(|v| v["id"].as_str().unwrap_or_default().to_string());

        assert_eq!(mapped.event_id, event_id);
        assert_eq!(mapped.correlation_id.as_deref(), Some("corr"));
        assert_eq!(mapped.payload, "a");
    }

    #[test]
    fn test_validate_envelope_fields_valid() {
        let envelope = json!({
            "event_id": "550e8400-e29b-41d4-a716-446655440000",
            "event_type": "auction.created",
            "occurred_at": "2024-01-01T00:00:00Z",
            "source_module": "auction",
            "source_version": "1.0.0",
            "payload": {}
        });

        assert!(validate_envelope_fields(&envelope).is_ok());
    }

    #[test]
    fn test_validate_envelope_fields_missing_event_type() {
        let envelope = json!({
            "event_id": "550e8400-e29b-41d4-a716-446655440000",
            "occurred_at": "2024-01-01T00:00:00Z",
            "source_module": "auction",
            "source_version": "1.0.0",
            "payload": {}
        });

        assert!(validate_envelope_fields(&envelope).is_err());
    }

    #[test]
    fn test_validate_envelope_fields_empty_source_version() {
        let envelope = json!({
            "event_id": "550e8400-e29b-41d4-a716-446655440000",
            "event_type": "auction.created",
            "occurred_at": "2024-01-01T00:00:00Z",
            "source_module": "auction",
            "source_version": "",
            "payload": {}
        });

        assert!(validate_envelope_fields(&envelope).is_err());
    }

    #[test]
    fn test_validate_envelope_fields_bad_event_id() {
        let envelope = json!({
            "event_id": "not-a-uuid",
            "event_type": "auction.created",
            "occurred_at": "2024-01-01T00:00:00Z",
            "source_module": "auction",
            "source_version": "1.0.0",
            "payload": {}
        });

        assert!(validate_envelope_fields(&envelope).is_err());
    }
}
