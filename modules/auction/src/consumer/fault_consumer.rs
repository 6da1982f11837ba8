//! Compensation for auction-created events the replicas failed to apply
//!
//! A fault caused by input validation is compensated by republishing the
//! auction as a brand-new Created event under a fresh identity. Every other
//! fault is escalated to the alert sink and left for an operator.

use async_trait::async_trait;
use auction_contracts::{fault_type, AuctionCreated, AUCTION_CREATED};
use event_bus::{ExceptionInfo, FailureKind, Fault};
use event_consumer::{ConsumeContext, Consumer, ConsumerError};
use std::sync::Arc;

use crate::alert::{AlertSink, FaultAlert};
use crate::events::{new_envelope, EventPublisher};

pub const CONSUMER_NAME: &str = "auction-created-fault";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    /// Publish the payload again as a new auction
    Republish,
    /// Hand the fault to a human
    Escalate,
}

/// Decide how to recover from a fault given every failure it recorded
///
/// The most specific kind found anywhere in the list wins. Only validation
/// failures are republished; an empty list escalates.
pub fn compensation_policy(exceptions: &[ExceptionInfo]) -> Compensation {
    let kind = exceptions
        .iter()
        .map(|e| e.kind)
        .max_by_key(|k| k.specificity());

    match kind {
        Some(FailureKind::Validation) => Compensation::Republish,
        _ => Compensation::Escalate,
    }
}

pub struct AuctionCreatedFaultConsumer {
    publisher: EventPublisher,
    alerts: Arc<dyn AlertSink>,
}

impl AuctionCreatedFaultConsumer {
    pub fn new(publisher: EventPublisher, alerts: Arc<dyn AlertSink>) -> Self {
        Self { publisher, alerts }
    }

    /// Apply the compensation policy to one fault and return the decision taken
    ///
    /// An auction that was itself republished (it carries a causation id) is
    /// escalated instead of republished again, so a payload the replica will
    /// never accept cannot cycle between the two services. A payload that does
    /// not decode as an auction cannot be republished either and is escalated.
    pub async fn handle(&self, fault: &Fault<serde_json::Value>) -> Result<Compensation, ConsumerError> {
        let mut decision = compensation_policy(&fault.exceptions);
        if decision == Compensation::Republish && fault.message.causation_id.is_some() {
            tracing::warn!(
                fault_id = %fault.fault_id,
                event_id = %fault.message.event_id,
                causation_id = ?fault.message.causation_id,
                "Republished auction faulted again, escalating"
            );
            decision = Compensation::Escalate;
        }

        let mut original = None;
        if decision == Compensation::Republish {
            match serde_json::from_value::<AuctionCreated>(fault.message.payload.clone()) {
                Ok(payload) => original = Some(payload),
                Err(e) => {
                    tracing::warn!(
                        fault_id = %fault.fault_id,
                        event_id = %fault.message.event_id,
                        error = %e,
                        "Faulted payload is not an auction, escalating"
                    );
                    decision = Compensation::Escalate;
                }
            }
        }

        match original {
            Some(payload) => {
                let envelope = new_envelope(payload.with_new_identity())
                    .with_causation_id(Some(fault.message.event_id.to_string()));

                self.publisher.publish(&envelope).await.map_err(|e| {
                    ConsumerError::transient("BusError", format!("republish failed: {}", e))
                })?;

                tracing::warn!(
                    fault_id = %fault.fault_id,
                    original_event_id = %fault.message.event_id,
                    original_auction_id = %payload.id,
                    new_auction_id = %envelope.payload.id,
                    new_event_id = %envelope.event_id,
                    "Republished auction after validation fault"
                );
            }
            None => {
                let alert = FaultAlert::from_fault(fault).map_err(|e| {
                    ConsumerError::unclassified("SerializationError", e.to_string())
                })?;

                self.alerts.escalate(&alert).await.map_err(|e| {
                    ConsumerError::transient("AlertError", e.to_string())
                })?;
            }
        }

        Ok(decision)
    }
}

#[async_trait]
impl Consumer for AuctionCreatedFaultConsumer {
    type Message = Fault<serde_json::Value>;

    fn name(&self) -> &str {
        CONSUMER_NAME
    }

    fn event_type(&self) -> String {
        fault_type(AUCTION_CREATED)
    }

    async fn consume(&self, ctx: ConsumeContext<Self::Message>) -> Result<(), ConsumerError> {
        self.handle(ctx.message()).await.map(|_| ())
    }
}
