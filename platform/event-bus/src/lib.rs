//! # EventBus Abstraction
//!
//! The transport layer shared by the auction and search services.
//!
//! ## Routing
//!
//! Subjects are exact. A consumer declares the event type it accepts and is
//! subscribed to exactly that subject; there is no wildcard matching. Event
//! types map to subjects through [`subject_for`], and the fault envelope for an
//! event type travels on [`fault_subject`].
//!
//! ## Implementations
//!
//! - **NatsBus**: Production implementation using NATS
//! - **InMemoryBus**: Test/dev implementation using in-memory channels
//!
//! ## Usage
//!
//! ```rust,no_run
//! use event_bus::{EventBus, InMemoryBus, NatsBus};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! // Production: NATS
//! let nats_client = async_nats::connect("nats://localhost:4222").await?;
//! let bus: Arc<dyn EventBus> = Arc::new(NatsBus::new(nats_client));
//!
//! // Dev/Test: In-Memory
//! let bus: Arc<dyn EventBus> = Arc::new(InMemoryBus::new());
//!
//! let subject = event_bus::subject_for("auction.created");
//! let mut stream = bus.subscribe(&subject).await?;
//! bus.publish(&subject, b"{}".to_vec()).await?;
//! while let Some(msg) = futures::StreamExt::next(&mut stream).await {
//!     println!("Received: {} bytes on {}", msg.payload.len(), msg.subject);
//! }
//! # Ok(())
//! # }
//! ```

pub mod consumer_retry;
mod envelope;
mod fault;
mod inmemory_bus;
mod nats_bus;

pub use envelope::{validate_envelope_fields, EventEnvelope};
pub use fault::{ExceptionInfo, FailureKind, Fault};
pub use inmemory_bus::InMemoryBus;
pub use nats_bus::NatsBus;

use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;

/// Prefix for subjects carrying fault envelopes
pub const FAULT_PREFIX: &str = "fault";

/// A message received from the event bus
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The subject this message was published to
    pub subject: String,
    /// The message payload (raw bytes)
    pub payload: Vec<u8>,
    /// Optional headers
    pub headers: Option<std::collections::HashMap<String, String>>,
}

impl BusMessage {
    /// Create a new bus message
    pub fn new(subject: String, payload: Vec<u8>) -> Self {
        Self {
            subject,
            payload,
            headers: None,
        }
    }

    /// Add headers to the message
    pub fn with_headers(mut self, headers: std::collections::HashMap<String, String>) -> Self {
        self.headers = Some(headers);
        self
    }
}

/// Errors that can occur when using the event bus
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("failed to publish message: {0}")]
    PublishError(String),

    #[error("failed to subscribe to subject: {0}")]
    SubscribeError(String),

    #[error("connection error: {0}")]
    ConnectionError(String),

    #[error("serialization error: {0}")]
    SerializationError(String),

    #[error("invalid subject: {0}")]
    InvalidSubject(String),
}

/// Result type for event bus operations
pub type BusResult<T> = Result<T, BusError>;

/// Core event bus abstraction for publish-subscribe messaging
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish a message to a subject
    ///
    /// Returns `Err(BusError)` when the broker is unavailable.
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> BusResult<()>;

    /// Subscribe to messages published on exactly `subject`
    ///
    /// Wildcard tokens (`*`, `>`) are rejected with [`BusError::InvalidSubject`].
    async fn subscribe(&self, subject: &str) -> BusResult<BoxStream<'static, BusMessage>>;
}

impl fmt::Debug for dyn EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventBus")
    }
}

/// Subject an event type is published on.
///
/// `auction.created` → `auction.events.created`. Event types without a module
/// prefix land under `events.`.
pub fn subject_for(event_type: &str) -> String {
    match event_type.split_once('.') {
        Some((module, name)) => format!("{}.events.{}", module, name),
        None => format!("events.{}", event_type),
    }
}

/// Subject the fault envelope for `event_type` is published on.
pub fn fault_subject(event_type: &str) -> String {
    format!("{}.{}", FAULT_PREFIX, subject_for(event_type))
}

/// Event type a fault consumer declares to receive faults of `event_type`.
pub fn fault_type(event_type: &str) -> String {
    format!("{}.{}", FAULT_PREFIX, event_type)
}

/// Subject for a declared type, resolving fault types to fault subjects.
pub fn subject_for_declared(declared_type: &str) -> String {
    match declared_type.strip_prefix("fault.") {
        Some(original) => fault_subject(original),
        None => subject_for(declared_type),
    }
}

/// Reject subjects that are empty or contain wildcard tokens
pub fn validate_subject(subject: &str) -> BusResult<()> {
    if subject.is_empty() {
        return Err(BusError::InvalidSubject("subject cannot be empty".to_string()));
    }
    if subject
        .split('.')
        .any(|token| token.is_empty() || token == "*" || token == ">")
    {
        return Err(BusError::InvalidSubject(format!(
            "'{}' must be an exact subject",
            subject
        )));
    }
    Ok(())
}
