//! Retrying event-log decorator
//!
//! Wraps any [`EventLog`] to retry failed appends with capped exponential
//! backoff. Callers are untouched: the engine and writer speak to the same
//! trait whether retries are configured or not.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use parkhub_core::{AdapterError, EventLog, LogId, TransitionEvent};

use crate::config::Backoff;

/// Event log wrapper that retries failed appends
pub struct RetryLog {
    inner: Arc<dyn EventLog>,
    backoff: Backoff,
    max_attempts: u32,
    /// Total retry attempts made
    retry_count: AtomicU64,
    /// Appends that succeeded after at least one failure
    recovered_count: AtomicU64,
}

impl RetryLog {
    /// Wrap `inner`, allowing up to `max_attempts` retries per append
    pub fn new(inner: Arc<dyn EventLog>, backoff: Backoff, max_attempts: u32) -> Self {
        Self {
            inner,
            backoff,
            max_attempts,
            retry_count: AtomicU64::new(0),
            recovered_count: AtomicU64::new(0),
        }
    }

    /// Wrap with the default backoff and 3 retries
    pub fn with_defaults(inner: Arc<dyn EventLog>) -> Self {
        Self::new(inner, Backoff::default(), 3)
    }

    /// Total retry attempts made
    pub fn retry_count(&self) -> u64 {
        self.retry_count.load(Ordering::Relaxed)
    }

    /// Appends that recovered after failure
    pub fn recovered_count(&self) -> u64 {
        self.recovered_count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl EventLog for RetryLog {
    fn name(&self) -> &'static str {
        "retry"
    }

    async fn append(&self, event: &TransitionEvent) -> Result<LogId, AdapterError> {
        let mut last_error = None;

        for attempt in 0..=self.max_attempts {
            if attempt > 0 {
                let delay = self.backoff.delay(attempt - 1);
                self.retry_count.fetch_add(1, Ordering::Relaxed);
                debug!(
                    log = self.inner.name(),
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "retrying append"
                );
                tokio::time::sleep(delay).await;
            }

            match self.inner.append(event).await {
                Ok(id) => {
                    if attempt > 0 {
                        self.recovered_count.fetch_add(1, Ordering::Relaxed);
                        info!(log = self.inner.name(), attempt, "append recovered after retry");
                    }
                    return Ok(id);
                }
                Err(err) => {
                    warn!(
                        log = self.inner.name(),
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "append failed"
                    );
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AdapterError::Write("all retries exhausted".into())))
    }

    async fn shutdown(&self) -> Result<(), AdapterError> {
        self.inner.shutdown().await
    }
}
