//! Durable event log trait
//!
//! The [`EventLog`] trait is the seam to whatever makes transition events
//! durable - a SQL table, an append-only file, a message queue. The pipeline
//! only needs `append`; everything about dialects, schemas, and aggregation
//! queries lives behind the implementation.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::event::TransitionEvent;

/// Identifier assigned by the log to an appended event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogId(pub u64);

impl std::fmt::Display for LogId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable append-only sink for transition events
///
/// # Implementation Requirements
///
/// - Implementations must be `Send + Sync`; the writer task calls them
///   from a background task.
/// - `append` should be atomic per event: either the event is durable and
///   a [`LogId`] comes back, or an error does.
/// - Callers treat errors as non-fatal. An implementation that wants
///   automatic retry wraps itself (see `RetryLog` in the gateway crate)
///   rather than looping internally, so the timeout budget stays honest.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Short name for logging ("memory", "postgres", ...)
    fn name(&self) -> &'static str;

    /// Append one transition event durably
    ///
    /// # Errors
    /// [`AdapterError::Write`] if the event could not be made durable.
    async fn append(&self, event: &TransitionEvent) -> Result<LogId, AdapterError>;

    /// Graceful shutdown: flush and release resources
    ///
    /// Default is a no-op for logs with nothing to flush.
    async fn shutdown(&self) -> Result<(), AdapterError> {
        Ok(())
    }
}
