//! Broadcast hub - non-blocking fan-out to live observers
//!
//! Every attached [`Observer`] gets its own bounded queue and worker task.
//! `publish` clones nothing per observer (updates travel as `Arc`) and
//! never waits: a full or closed queue means the update is dropped for that
//! observer with a warning, and nobody else notices.
//!
//! ```text
//!    publish(&Update)
//!        │                         (Arc per observer)
//!        ├─────────────► [queue O1] ─► worker O1 ─► deliver()
//!        ├─────────────► [queue O2] ─► worker O2 ─► deliver()
//!        └─────────────► [queue ON] ─► worker ON ─► deliver()
//! ```
//!
//! # Snapshot on attach
//!
//! [`BroadcastHub::attach`] reads a store snapshot and enqueues it as the
//! observer's first update while holding the channel-list lock, so every
//! live update published afterwards lands behind the snapshot - observers
//! rehydrate from the state at the moment of attach, never a stale copy.

mod log;

pub use log::LogObserver;

use std::sync::Arc;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::warn;

use parkhub_core::{Observer, Update};

use crate::store::StateStore;

struct ObserverChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Update>>,
}

struct HubInner {
    channels: Mutex<Vec<ObserverChannel>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    store: Arc<StateStore>,
}

/// Fan-out of state updates to all attached observers
///
/// Cheap to clone; all clones share the observer set.
#[derive(Clone)]
pub struct BroadcastHub {
    inner: Arc<HubInner>,
}

impl BroadcastHub {
    /// New hub with no observers, rehydrating from `store`
    pub fn new(store: Arc<StateStore>) -> Self {
        Self {
            inner: Arc::new(HubInner {
                channels: Mutex::new(Vec::new()),
                workers: Mutex::new(Vec::new()),
                store,
            }),
        }
    }

    /// Attach an observer and start its worker
    ///
    /// The observer's first delivery is a [`Update::Snapshot`] reflecting
    /// the store at the moment of this call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach(&self, observer: Arc<dyn Observer>) {
        let name = observer.name();
        let capacity = observer.queue_capacity().max(1);
        let (tx, mut rx) = mpsc::channel::<Arc<Update>>(capacity);

        let worker = tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                let fut = observer.deliver(update.as_ref());
                match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        warn!(observer = observer.name(), error = %err, "observer delivery failed");
                    }
                    Err(_) => {
                        warn!(observer = observer.name(), "observer panicked during delivery");
                    }
                }
            }
        });

        // Snapshot and registration happen under the channel-list lock so
        // no publish can slip between the snapshot read and the enqueue.
        let mut channels = self.inner.channels.lock();
        let snapshot = self.inner.store.snapshot();
        if tx.try_send(Arc::new(Update::Snapshot(snapshot))).is_err() {
            warn!(observer = name, "failed to enqueue initial snapshot");
        }
        channels.push(ObserverChannel { name, sender: tx });
        self.inner.workers.lock().push(worker);
    }

    /// Fan one update out to every observer, without blocking
    pub fn publish(&self, update: &Update) {
        let shared = Arc::new(update.clone());
        let mut channels = self.inner.channels.lock();
        channels.retain(|channel| {
            match channel.sender.try_send(Arc::clone(&shared)) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        observer = channel.name,
                        topic = update.topic(),
                        "observer queue full, update dropped"
                    );
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(observer = channel.name, "observer worker gone, detaching");
                    false
                }
            }
        });
    }

    /// Number of attached observers
    pub fn observer_count(&self) -> usize {
        self.inner.channels.lock().len()
    }

    /// Close all queues and wait for workers to drain
    pub async fn shutdown(&self) {
        let channels = std::mem::take(&mut *self.inner.channels.lock());
        drop(channels);
        let workers = std::mem::take(&mut *self.inner.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }
    }
}
