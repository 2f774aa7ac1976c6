//! Ingestion engine - validate, reconcile, diff, hand off
//!
//! The engine is the only component that mutates the [`StateStore`]. Each
//! payload is validated, its identity resolved to a block, applied to the
//! store under that identity's lock, and the results handed off without
//! blocking: transitions go to the log writer's channel, updates go to the
//! broadcast hub.
//!
//! # Per-identity serialization
//!
//! Payloads for the *same* identity apply strictly one at a time; payloads
//! for different identities proceed fully concurrently. [`KeyLocks`] keeps
//! one mutex per identity rather than one global lock, so the discipline
//! holds at many-sensor scale, not just at today's handful of spots.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use parkhub_core::{PayloadError, SensorPayload, TransitionEvent, Update};

use crate::blockmap::BlockMap;
use crate::hub::BroadcastHub;
use crate::store::StateStore;

/// Per-key mutex table
///
/// Entries are created on first use and never removed - spots are never
/// deleted, so the table is bounded by the spot population.
pub(crate) struct KeyLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The mutex serializing mutations for `key`
    pub(crate) fn for_key(&self, key: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock();
        if let Some(lock) = locks.get(key) {
            return Arc::clone(lock);
        }
        let lock = Arc::new(Mutex::new(()));
        locks.insert(key.to_string(), Arc::clone(&lock));
        lock
    }
}

/// Outcome of one `ingest` call
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// Payload failed boundary validation; logged and dropped, no state change
    Dropped(PayloadError),
    /// Payload was applied to the store
    Applied {
        /// True if this payload registered a previously unseen spot
        registered: bool,
        /// The transition this payload caused, if occupancy flipped
        transition: Option<TransitionEvent>,
    },
}

impl IngestOutcome {
    /// True if the payload reached the store
    pub fn is_applied(&self) -> bool {
        matches!(self, IngestOutcome::Applied { .. })
    }

    /// The transition, if this ingest caused one
    pub fn transition(&self) -> Option<&TransitionEvent> {
        match self {
            IngestOutcome::Applied { transition, .. } => transition.as_ref(),
            IngestOutcome::Dropped(_) => None,
        }
    }
}

/// The ingestion engine
///
/// Cheap to share (`Arc`); `ingest` is synchronous - the only I/O in the
/// pipeline happens on the writer and observer tasks downstream of the
/// channels this hands off to.
pub struct IngestionEngine {
    store: Arc<StateStore>,
    blocks: BlockMap,
    keys: KeyLocks,
    writer: mpsc::Sender<TransitionEvent>,
    hub: BroadcastHub,
}

impl IngestionEngine {
    pub(crate) fn new(
        store: Arc<StateStore>,
        blocks: BlockMap,
        writer: mpsc::Sender<TransitionEvent>,
        hub: BroadcastHub,
    ) -> Self {
        Self {
            store,
            blocks,
            keys: KeyLocks::new(),
            writer,
            hub,
        }
    }

    /// Ingest one payload
    ///
    /// Malformed payloads are dropped with a diagnostic and reported in the
    /// outcome - nothing propagates as a failure to the submitter. Accepted
    /// payloads mutate the store, then (still under the identity's lock, so
    /// per-spot order is preserved end to end) the transition is enqueued
    /// for the durable log and the updates are published. Neither handoff
    /// blocks, and neither can fail ingestion.
    pub fn ingest(&self, payload: SensorPayload) -> IngestOutcome {
        if let Err(err) = payload.validate() {
            warn!(identity = %payload.identity, error = %err, "dropping malformed payload");
            return IngestOutcome::Dropped(err);
        }

        let lock = self.keys.for_key(&payload.identity);
        let _serial = lock.lock();

        let block = self.blocks.resolve(&payload.identity).to_string();
        let applied = self.store.apply(&payload, &block);

        if let Some(ev) = &applied.transition {
            debug!(
                spot = %ev.spot_id,
                block = %ev.block,
                direction = %ev.direction,
                "occupancy transition detected"
            );
            // Durability is decoupled from liveness: a full or stopped
            // writer loses the durable copy, never the state or broadcast.
            match self.writer.try_send(ev.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(spot = %ev.spot_id, "log writer queue full, durable write dropped");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    warn!(spot = %ev.spot_id, "log writer stopped, durable write dropped");
                }
            }
        }

        self.hub.publish(&Update::Spot(applied.spot.clone()));
        self.hub.publish(&Update::Block(applied.block.clone()));
        if let Some(ev) = &applied.transition {
            self.hub.publish(&Update::Transition(ev.clone()));
        }

        IngestOutcome::Applied {
            registered: applied.registered,
            transition: applied.transition,
        }
    }

    /// The store this engine mutates (read access for query surfaces)
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::BlockRule;
    use parkhub_core::Direction;

    fn test_engine() -> (Arc<IngestionEngine>, mpsc::Receiver<TransitionEvent>) {
        let store = Arc::new(StateStore::new(50));
        let blocks = BlockMap::new(
            vec![BlockRule::new("L3", "L3-L4"), BlockRule::new("L4", "L3-L4")],
            "L1-L2",
        );
        let (tx, rx) = mpsc::channel(64);
        let hub = BroadcastHub::new(Arc::clone(&store));
        (Arc::new(IngestionEngine::new(store, blocks, tx, hub)), rx)
    }

    #[tokio::test]
    async fn malformed_identity_is_dropped() {
        let (engine, _rx) = test_engine();
        let outcome = engine.ingest(SensorPayload::new("undefined"));
        assert!(matches!(
            outcome,
            IngestOutcome::Dropped(PayloadError::PlaceholderIdentity(_))
        ));
        assert_eq!(engine.store().spot_count(), 0);
    }

    #[tokio::test]
    async fn unknown_identity_registers_by_convention() {
        let (engine, _rx) = test_engine();
        engine.ingest(SensorPayload::new("spot2L3"));
        engine.ingest(SensorPayload::new("spot4L2"));
        assert_eq!(engine.store().spot("spot2L3").unwrap().block, "L3-L4");
        assert_eq!(engine.store().spot("spot4L2").unwrap().block, "L1-L2");
    }

    #[tokio::test]
    async fn transition_reaches_writer_channel() {
        let (engine, mut rx) = test_engine();
        engine.ingest(SensorPayload::new("spot4L2").with_occupied(false));
        engine.ingest(SensorPayload::new("spot4L2").with_occupied(true));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.spot_id, "spot4L2");
        assert_eq!(ev.direction, Direction::Occupied);
        // Exactly one transition enqueued
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn replayed_payload_is_idempotent() {
        let (engine, mut rx) = test_engine();
        let payload = SensorPayload::new("a").with_occupied(true);
        let first = engine.ingest(payload.clone());
        let second = engine.ingest(payload);

        assert!(first.transition().is_some());
        assert!(second.transition().is_none());
        assert!(rx.recv().await.is_some());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_writer_queue_does_not_fail_ingest() {
        let store = Arc::new(StateStore::new(50));
        let blocks = BlockMap::new(vec![], "L1-L2");
        let (tx, _rx) = mpsc::channel(1);
        let hub = BroadcastHub::new(Arc::clone(&store));
        let engine = IngestionEngine::new(Arc::clone(&store), blocks, tx, hub);

        // Two transitions into a queue of one: second durable write drops,
        // ingestion and state stay correct.
        engine.ingest(SensorPayload::new("a").with_occupied(true));
        let outcome = engine.ingest(SensorPayload::new("b").with_occupied(true));
        assert!(outcome.is_applied());
        assert!(store.spot("b").unwrap().occupied);
    }

    #[tokio::test]
    async fn distinct_identities_ingest_concurrently() {
        let (engine, _rx) = test_engine();
        let mut handles = Vec::new();
        for i in 0..8 {
            let engine = Arc::clone(&engine);
            handles.push(tokio::task::spawn_blocking(move || {
                for flip in 0..10 {
                    engine.ingest(
                        SensorPayload::new(format!("s{i}")).with_occupied(flip % 2 == 0),
                    );
                }
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let snap = engine.store().snapshot();
        assert_eq!(snap.spots.len(), 8);
        for block in &snap.blocks {
            assert!(block.is_consistent());
        }
    }
}
