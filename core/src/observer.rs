//! Observer trait - the live-update delivery seam
//!
//! An [`Observer`] is any external consumer of broadcast updates: a
//! websocket session, a metrics shipper, a test capture. The hub gives each
//! observer its own bounded queue and worker task, so a slow or broken
//! observer only ever hurts itself.

use async_trait::async_trait;

use crate::error::AdapterError;
use crate::event::Update;

/// Default per-observer queue depth when an implementation doesn't care
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// A subscribed consumer of broadcast updates
///
/// # Delivery semantics
///
/// - At-most-once per publish: if the observer's queue is full or its
///   worker is gone, the update is dropped for this observer with a
///   warning.
/// - Per-observer FIFO; no ordering across observers.
/// - `deliver` errors and panics are logged and swallowed - they never
///   reach other observers or the ingest path.
#[async_trait]
pub trait Observer: Send + Sync {
    /// Short name for logging ("dashboard", "capture", ...)
    fn name(&self) -> &'static str;

    /// Depth of this observer's delivery queue
    ///
    /// Slow consumers can raise this to absorb bursts; the queue stays
    /// bounded regardless.
    fn queue_capacity(&self) -> usize {
        DEFAULT_QUEUE_CAPACITY
    }

    /// Deliver one update
    ///
    /// # Errors
    /// [`AdapterError::Delivery`] if this observer's channel is broken.
    /// The failure is isolated to this observer.
    async fn deliver(&self, update: &Update) -> Result<(), AdapterError>;
}
