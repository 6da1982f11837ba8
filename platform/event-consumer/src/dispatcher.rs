//! Delivery loop
//!
//! One task per registration. Each task drains its subscription with bounded
//! concurrency; every message is decoded once and handed to the consumer
//! under a bounded retry loop. When the loop gives up, the message and every
//! failure observed are wrapped in a [`Fault`] and published on the fault
//! subject of the consumer's declared type.

use event_bus::consumer_retry::{retry_with_backoff_if, RetryConfig};
use event_bus::{
    fault_type, subject_for_declared, validate_envelope_fields, BusError, BusMessage, EventBus,
    EventEnvelope, Fault,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::{ConsumerError, ConsumerRegistry, Registration};

/// Delivery settings shared by every registration of a dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub retry: RetryConfig,
    /// Messages one registration may process at the same time
    pub max_in_flight: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            max_in_flight: 16,
        }
    }
}

impl DispatcherConfig {
    /// Settings read from `CONSUMER_MAX_ATTEMPTS`, `CONSUMER_INITIAL_BACKOFF_MS`
    /// and `CONSUMER_MAX_IN_FLIGHT`, falling back to the defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let max_attempts = std::env::var("CONSUMER_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults.retry.max_attempts);

        let initial_backoff = std::env::var("CONSUMER_INITIAL_BACKOFF_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.retry.initial_backoff);

        let max_in_flight = std::env::var("CONSUMER_MAX_IN_FLIGHT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_in_flight);

        Self {
            retry: RetryConfig {
                max_attempts,
                initial_backoff,
                max_backoff: defaults.retry.max_backoff,
            },
            max_in_flight,
        }
    }
}

/// Running delivery tasks
#[derive(Debug)]
pub struct DispatcherHandle {
    tasks: Vec<JoinHandle<()>>,
    subjects: Vec<String>,
}

impl DispatcherHandle {
    /// Subjects the dispatcher is subscribed to, in registration order
    pub fn subjects(&self) -> &[String] {
        &self.subjects
    }

    /// Stop delivering; in-flight messages are abandoned and left to the
    /// broker's redelivery
    pub fn shutdown(self) {
        for task in self.tasks {
            task.abort();
        }
    }
}

pub struct Dispatcher;

impl Dispatcher {
    /// Subscribe every registration and start delivering
    ///
    /// All subscriptions are live when this returns, so messages published
    /// afterwards are not missed.
    pub async fn start(
        bus: Arc<dyn EventBus>,
        registry: ConsumerRegistry,
        config: DispatcherConfig,
    ) -> Result<DispatcherHandle, BusError> {
        let service: Arc<str> = Arc::from(registry.service());
        let config = Arc::new(config);
        let mut tasks = Vec::new();
        let mut subjects = Vec::new();

        for registration in registry.registrations().iter().cloned() {
            let stream = bus.subscribe(&registration.subject).await?;

            tracing::info!(
                service = %service,
                consumer = %registration.name,
                subject = %registration.subject,
                "Subscribed consumer"
            );
            subjects.push(registration.subject.clone());

            let bus = bus.clone();
            let service = service.clone();
            let config = config.clone();
            let registration = Arc::new(registration);

            tasks.push(tokio::spawn(async move {
                let max_in_flight = config.max_in_flight.max(1);

                stream
                    .for_each_concurrent(max_in_flight, |msg| {
                        let bus = bus.clone();
                        let service = service.clone();
                        let config = config.clone();
                        let registration = registration.clone();
                        async move {
                            deliver(&*bus, &service, &registration, &config, msg).await;
                        }
                    })
                    .await;

                tracing::warn!(
                    consumer = %registration.name,
                    subject = %registration.subject,
                    "Consumer stopped"
                );
            }));
        }

        Ok(DispatcherHandle { tasks, subjects })
    }
}

/// Parse a bus message into an untyped envelope, checking its fields first
fn decode_envelope(bytes: &[u8]) -> Result<EventEnvelope<serde_json::Value>, String> {
    let raw: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| format!("not JSON: {}", e))?;
    validate_envelope_fields(&raw)?;
    serde_json::from_value(raw).map_err(|e| format!("malformed envelope: {}", e))
}

async fn deliver(
    bus: &dyn EventBus,
    service: &str,
    registration: &Registration,
    config: &DispatcherConfig,
    msg: BusMessage,
) {
    let envelope = match decode_envelope(&msg.payload) {
        Ok(envelope) => envelope,
        Err(reason) => {
            tracing::error!(
                subject = %msg.subject,
                consumer = %registration.name,
                reason = %reason,
                "Dropping message that is not a valid event envelope"
            );
            return;
        }
    };

    if envelope.event_type != registration.event_type {
        tracing::warn!(
            event_id = %envelope.event_id,
            event_type = %envelope.event_type,
            expected = %registration.event_type,
            subject = %msg.subject,
            "Event type does not match the subject it arrived on, skipping"
        );
        return;
    }

    let span = tracing::info_span!(
        "consume",
        event_id = %envelope.event_id,
        event_type = %envelope.event_type,
        subject = %msg.subject,
        consumer = %registration.name,
        correlation_id = %envelope.correlation_id.as_deref().unwrap_or("none"),
    );

    async {
        let attempt = AtomicU32::new(0);

        let result = retry_with_backoff_if(
            || {
                let n = attempt.fetch_add(1, Ordering::SeqCst) + 1;
                registration.handler.handle(&envelope, &msg.subject, n)
            },
            &config.retry,
            &registration.name,
            |e: &ConsumerError| e.is_retryable(),
        )
        .await;

        match result {
            Ok(()) => {
                tracing::debug!("Event consumed");
            }
            Err(exhausted) => {
                let exceptions = exhausted
                    .errors
                    .iter()
                    .map(|e| e.to_exception_info())
                    .collect();

                tracing::error!(
                    attempts = exhausted.attempts,
                    "Event processing failed, publishing fault"
                );

                publish_fault(
                    bus,
                    service,
                    registration,
                    exhausted.attempts,
                    exceptions,
                    envelope.clone(),
                )
                .await;
            }
        }
    }
    .instrument(span)
    .await;
}

async fn publish_fault(
    bus: &dyn EventBus,
    service: &str,
    registration: &Registration,
    attempts: u32,
    exceptions: Vec<event_bus::ExceptionInfo>,
    original: EventEnvelope<serde_json::Value>,
) {
    let event_id = original.event_id;
    let correlation_id = original.correlation_id.clone();

    let Some(fault) = Fault::new(registration.name.clone(), attempts, exceptions, original) else {
        tracing::error!(event_id = %event_id, "Fault without exceptions, nothing to publish");
        return;
    };

    let declared = fault_type(&registration.event_type);
    let subject = subject_for_declared(&declared);
    let envelope = EventEnvelope::new(declared, service.to_string(), fault)
        .with_source_version(env!("CARGO_PKG_VERSION").to_string())
        .with_correlation_id(correlation_id)
        .with_causation_id(Some(event_id.to_string()));

    let payload = match serde_json::to_vec(&envelope) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(
                event_id = %event_id,
                error = %e,
                "Failed to serialize fault - event may be lost!"
            );
            return;
        }
    };

    match bus.publish(&subject, payload).await {
        Ok(()) => {
            tracing::warn!(
                event_id = %event_id,
                fault_id = %envelope.payload.fault_id,
                subject = %subject,
                "Fault published"
            );
        }
        Err(e) => {
            tracing::error!(
                event_id = %event_id,
                subject = %subject,
                error = %e,
                "Failed to publish fault - event may be lost!"
            );
        }
    }
}
