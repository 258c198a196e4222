//! Logging port used to report operation outcomes.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::state::OperationResult;

/// A log record describing the outcome of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    /// Human-readable detail (server diagnostic on failure).
    pub text: String,
    /// Outcome kind the record refers to.
    pub result: OperationResult,
    /// Time the record was built.
    pub timestamp: DateTime<Utc>,
}

impl LogMessage {
    /// Builds a record stamped with the current time.
    #[must_use]
    pub fn new(text: impl Into<String>, result: OperationResult) -> Self {
        Self {
            text: text.into(),
            result,
            timestamp: Utc::now(),
        }
    }
}

/// Sink for operation outcome records.
#[cfg_attr(test, mockall::automock)]
pub trait OperationLogger: Send + Sync {
    /// Builds a record from free text and an outcome kind.
    fn build_log_message(&self, text: &str, result: OperationResult) -> LogMessage {
        LogMessage::new(text, result)
    }

    /// Emits a previously built record.
    fn write(&self, message: LogMessage);
}

/// [`OperationLogger`] backed by `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl OperationLogger for TracingLogger {
    fn write(&self, message: LogMessage) {
        if message.result.is_success() {
            info!(
                result = %message.result,
                timestamp = %message.timestamp,
                "{}",
                message.text
            );
        } else {
            warn!(
                result = %message.result,
                timestamp = %message.timestamp,
                "{}",
                message.text
            );
        }
    }
}
