use async_trait::async_trait;
use event_bus::{subject_for_declared, validate_subject, EventEnvelope};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use crate::{ConsumeContext, ConsumerError, RegistryError};

/// A typed event handler
///
/// A consumer declares exactly one event type and receives only messages
/// published for it. Handlers must be re-entrant: the dispatcher may run
/// several deliveries of the same consumer at once, and may deliver the same
/// message more than once.
#[async_trait]
pub trait Consumer: Send + Sync + 'static {
    type Message: DeserializeOwned + Send + Sync + 'static;

    /// Stable name used in logs and fault envelopes (e.g. `search-auction-created`)
    fn name(&self) -> &str;

    /// The single event type this consumer accepts
    fn event_type(&self) -> String;

    async fn consume(&self, ctx: ConsumeContext<Self::Message>) -> Result<(), ConsumerError>;
}

/// Payload-agnostic view of a consumer the dispatcher can drive
#[async_trait]
pub(crate) trait ErasedConsumer: Send + Sync {
    async fn handle(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
        subject: &str,
        attempt: u32,
    ) -> Result<(), ConsumerError>;
}

struct Typed<C>(C);

#[async_trait]
impl<C: Consumer> ErasedConsumer for Typed<C> {
    async fn handle(
        &self,
        envelope: &EventEnvelope<serde_json::Value>,
        subject: &str,
        attempt: u32,
    ) -> Result<(), ConsumerError> {
        let payload = serde_json::from_value::<C::Message>(envelope.payload.clone()).map_err(|e| {
            ConsumerError::validation(
                "PayloadDecodeError",
                format!("payload does not match {}: {}", self.0.event_type(), e),
            )
        })?;
        let envelope = envelope.clone().map_payload(|_| payload);

        self.0
            .consume(ConsumeContext {
                envelope,
                subject: subject.to_string(),
                attempt,
            })
            .await
    }
}

/// One consumer bound to its declared event type
#[derive(Clone)]
pub struct Registration {
    pub name: String,
    pub event_type: String,
    pub subject: String,
    pub(crate) handler: Arc<dyn ErasedConsumer>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("event_type", &self.event_type)
            .field("subject", &self.subject)
            .finish()
    }
}

/// The consumers one service runs
#[derive(Debug, Clone)]
pub struct ConsumerRegistry {
    service: String,
    registrations: Vec<Registration>,
}

impl ConsumerRegistry {
    /// `service` becomes the `source_module` of the fault envelopes this
    /// service publishes
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            registrations: Vec::new(),
        }
    }

    pub fn register<C: Consumer>(&mut self, consumer: C) -> Result<&mut Self, RegistryError> {
        let name = consumer.name().to_string();
        let event_type = consumer.event_type();

        if event_type.is_empty() {
            return Err(RegistryError::InvalidEventType {
                event_type,
                reason: "event type cannot be empty".to_string(),
            });
        }

        let subject = subject_for_declared(&event_type);
        validate_subject(&subject).map_err(|e| RegistryError::InvalidEventType {
            event_type: event_type.clone(),
            reason: e.to_string(),
        })?;

        if self
            .registrations
            .iter()
            .any(|r| r.name == name && r.event_type == event_type)
        {
            return Err(RegistryError::DuplicateConsumer { name, event_type });
        }

        tracing::debug!(
            service = %self.service,
            consumer = %name,
            event_type = %event_type,
            subject = %subject,
            "Consumer registered"
        );

        self.registrations.push(Registration {
            name,
            event_type,
            subject,
            handler: Arc::new(Typed(consumer)),
        });

        Ok(self)
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}
