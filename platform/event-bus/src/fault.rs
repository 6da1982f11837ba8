//! Fault envelopes
//!
//! When a consumer exhausts its delivery attempts for a message, the
//! dispatcher wraps the message and every failure it observed into a
//! [`Fault`] and publishes it on the fault subject for the original event
//! type. Fault consumers decide whether to compensate or escalate.
//!
//! Failures carry a [`FailureKind`] declared by the consumer that raised them,
//! so the deciding side never has to match on implementation-specific error
//! names.

use crate::EventEnvelope;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Recovery classification a consumer attaches to its own failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed or out-of-range input; retrying the same payload cannot help
    Validation,
    /// Infrastructure hiccup (store unavailable, timeout); worth retrying
    Transient,
    /// Anything the consumer could not classify
    #[serde(other)]
    Unclassified,
}

impl FailureKind {
    /// Whether the dispatcher should spend another delivery attempt on it
    pub fn is_retryable(self) -> bool {
        !matches!(self, FailureKind::Validation)
    }

    /// Ranking used when several kinds are present; higher is more specific
    pub fn specificity(self) -> u8 {
        match self {
            FailureKind::Validation => 2,
            FailureKind::Transient => 1,
            FailureKind::Unclassified => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::Validation => "validation",
            FailureKind::Transient => "transient",
            FailureKind::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionInfo {
    pub kind: FailureKind,
    /// Free-form name of the concrete error, for humans only
    pub exception_type: String,
    pub message: String,
}

impl ExceptionInfo {
    pub fn new(kind: FailureKind, exception_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            exception_type: exception_type.into(),
            message: message.into(),
        }
    }
}

/// A message a consumer failed to process
///
/// `exceptions` is never empty: [`Fault::new`] refuses an empty list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fault<T> {
    pub fault_id: Uuid,
    pub faulted_at: DateTime<Utc>,
    /// Name of the consumer that gave up on the message
    pub consumer: String,
    /// Delivery attempts made before faulting
    pub attempts: u32,
    pub exceptions: Vec<ExceptionInfo>,
    pub message: EventEnvelope<T>,
}

impl<T> Fault<T> {
    pub fn new(
        consumer: impl Into<String>,
        attempts: u32,
        exceptions: Vec<ExceptionInfo>,
        message: EventEnvelope<T>,
    ) -> Option<Self> {
        if exceptions.is_empty() {
            return None;
        }
        Some(Self {
            fault_id: Uuid::new_v4(),
            faulted_at: Utc::now(),
            consumer: consumer.into(),
            attempts,
            exceptions,
            message,
        })
    }

    /// The most specific failure kind recorded anywhere in the fault
    pub fn most_specific_kind(&self) -> FailureKind {
        self.exceptions
            .iter()
            .map(|e| e.kind)
            .max_by_key(|k| k.specificity())
            .unwrap_or(FailureKind::Unclassified)
    }
}
