//! Escalation of faults that cannot be compensated automatically

use async_trait::async_trait;
use event_bus::{ExceptionInfo, FailureKind, Fault};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::repos::failed_repo;

/// What an operator needs to act on a fault
#[derive(Debug, Clone)]
pub struct FaultAlert {
    pub fault_id: Uuid,
    pub event_id: Uuid,
    pub event_type: String,
    pub consumer: String,
    pub attempts: u32,
    pub kind: FailureKind,
    pub exceptions: Vec<ExceptionInfo>,
    /// The complete fault, for replay
    pub fault_json: serde_json::Value,
}

impl FaultAlert {
    pub fn from_fault<T: Serialize>(fault: &Fault<T>) -> Result<Self, serde_json::Error> {
        Ok(Self {
            fault_id: fault.fault_id,
            event_id: fault.message.event_id,
            event_type: fault.message.event_type.clone(),
            consumer: fault.consumer.clone(),
            attempts: fault.attempts,
            kind: fault.most_specific_kind(),
            exceptions: fault.exceptions.clone(),
            fault_json: serde_json::to_value(fault)?,
        })
    }

    /// One line per recorded exception
    pub fn summary(&self) -> String {
        self.exceptions
            .iter()
            .map(|e| format!("[{}] {}: {}", e.kind, e.exception_type, e.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlertError {
    #[error("failed to store alert: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn escalate(&self, alert: &FaultAlert) -> Result<(), AlertError>;
}

/// Emits the alert as a structured error log
#[derive(Debug, Default, Clone)]
pub struct LogAlertSink;

#[async_trait]
impl AlertSink for LogAlertSink {
    async fn escalate(&self, alert: &FaultAlert) -> Result<(), AlertError> {
        log_alert(alert);
        Ok(())
    }
}

/// Logs the alert and keeps it in `failed_events`
#[derive(Clone)]
pub struct PgAlertSink {
    pool: PgPool,
}

impl PgAlertSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AlertSink for PgAlertSink {
    async fn escalate(&self, alert: &FaultAlert) -> Result<(), AlertError> {
        log_alert(alert);
        failed_repo::insert_failed_event(&self.pool, alert).await?;
        Ok(())
    }
}

fn log_alert(alert: &FaultAlert) {
    tracing::error!(
        fault_id = %alert.fault_id,
        event_id = %alert.event_id,
        event_type = %alert.event_type,
        consumer = %alert.consumer,
        attempts = alert.attempts,
        kind = %alert.kind,
        exceptions = %alert.summary(),
        "Fault escalated for manual handling"
    );
}
