use event_bus::{ExceptionInfo, FailureKind};

/// Failure raised by a consumer, classified by the consumer itself
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{kind} failure ({exception_type}): {message}")]
pub struct ConsumerError {
    pub kind: FailureKind,
    pub exception_type: String,
    pub message: String,
}

impl ConsumerError {
    pub fn new(kind: FailureKind, exception_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            exception_type: exception_type.into(),
            message: message.into(),
        }
    }

    /// Input the consumer can never accept as-is
    pub fn validation(exception_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Validation, exception_type, message)
    }

    /// Infrastructure failure worth another attempt
    pub fn transient(exception_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transient, exception_type, message)
    }

    pub fn unclassified(exception_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(FailureKind::Unclassified, exception_type, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }

    pub fn to_exception_info(&self) -> ExceptionInfo {
        ExceptionInfo::new(self.kind, self.exception_type.clone(), self.message.clone())
    }
}

/// Errors raised while building a [`crate::ConsumerRegistry`]
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("consumer '{name}' is already registered for '{event_type}'")]
    DuplicateConsumer { name: String, event_type: String },

    #[error("invalid event type '{event_type}': {reason}")]
    InvalidEventType { event_type: String, reason: String },
}
