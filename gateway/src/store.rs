//! State store - the authoritative in-memory state
//!
//! One [`StateStore`] owns every [`SpotState`], every [`BlockAggregate`],
//! and the bounded recent-transitions ring. It is constructed once at
//! startup and injected into the engine and the hub; nothing reaches the
//! maps except through its API.
//!
//! # Consistency
//!
//! [`StateStore::apply`] runs the whole spot mutation - registration, field
//! merge, transition detection, aggregate recomputation, ring push - inside
//! a single write-lock critical section. No reader ever observes a spot and
//! its block aggregate in disagreement; snapshots are point-in-time copies
//! taken under the read lock.

use std::collections::{HashMap, VecDeque};

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{debug, info};

use parkhub_core::{
    BlockAggregate, Direction, SensorPayload, Snapshot, SpotState, TransitionEvent,
};

/// Result of applying one accepted payload
#[derive(Debug, Clone)]
pub struct Applied {
    /// True if this payload registered a previously unseen spot
    pub registered: bool,
    /// The transition this payload caused, if occupancy flipped
    pub transition: Option<TransitionEvent>,
    /// Post-mutation spot state
    pub spot: SpotState,
    /// Post-mutation aggregate for the spot's block
    pub block: BlockAggregate,
}

struct Inner {
    spots: HashMap<String, SpotState>,
    blocks: HashMap<String, BlockAggregate>,
    /// Newest-first ring of recent transitions
    recent: VecDeque<TransitionEvent>,
}

/// Authoritative in-memory state: spots, block aggregates, recent transitions
pub struct StateStore {
    inner: RwLock<Inner>,
    recent_capacity: usize,
}

impl StateStore {
    /// New empty store keeping at most `recent_capacity` recent transitions
    pub fn new(recent_capacity: usize) -> Self {
        Self {
            inner: RwLock::new(Inner {
                spots: HashMap::new(),
                blocks: HashMap::new(),
                recent: VecDeque::with_capacity(recent_capacity),
            }),
            recent_capacity: recent_capacity.max(1),
        }
    }

    /// Apply one validated payload to the spot it addresses
    ///
    /// Caller contract: the payload already passed validation, `block` is
    /// the resolved block for this identity, and calls for the same
    /// identity are serialized (the engine holds the per-identity lock).
    ///
    /// Registration, field merge, edge detection, aggregate recomputation,
    /// and the ring push all commit atomically under the write lock.
    pub(crate) fn apply(&self, payload: &SensorPayload, block: &str) -> Applied {
        let ts = payload.timestamp.unwrap_or_else(Utc::now);
        let raw = payload.readings();

        let mut inner = self.inner.write();

        let registered = !inner.spots.contains_key(&payload.identity);
        if registered {
            info!(spot = %payload.identity, block, "new parking spot registered");
        }
        let spot = inner
            .spots
            .entry(payload.identity.clone())
            .or_insert_with(|| SpotState::register(&payload.identity, block, ts));

        if ts < spot.last_update {
            // Accepted last-write-wins; logged so a future ordering policy
            // has a signal to hang off.
            debug!(
                spot = %spot.spot_id,
                payload_ts = %ts,
                last_update = %spot.last_update,
                "payload older than current state, applying last-write-wins"
            );
        }

        let previous = spot.occupied;
        spot.readings.apply(&raw);
        if let Some(occupied) = payload.occupied {
            spot.occupied = occupied;
        }
        spot.last_update = ts;

        // Edge-triggered: a transition exists iff the flag changed value
        let transition = (previous != spot.occupied).then(|| TransitionEvent {
            spot_id: spot.spot_id.clone(),
            block: spot.block.clone(),
            direction: Direction::from_new_occupancy(spot.occupied),
            timestamp: ts,
            readings: spot.readings.clone(),
        });

        let spot_block = spot.block.clone();
        let spot_copy = spot.clone();

        let aggregate = BlockAggregate::derive(&spot_block, inner.spots.values(), ts);
        inner.blocks.insert(spot_block, aggregate.clone());

        if let Some(ev) = &transition {
            inner.recent.push_front(ev.clone());
            inner.recent.truncate(self.recent_capacity);
        }

        Applied {
            registered,
            transition,
            spot: spot_copy,
            block: aggregate,
        }
    }

    /// Consistent point-in-time copy of all aggregates and spots
    ///
    /// Entries come out sorted by key so snapshots are deterministic.
    pub fn snapshot(&self) -> Snapshot {
        let inner = self.inner.read();
        let mut blocks: Vec<_> = inner.blocks.values().cloned().collect();
        let mut spots: Vec<_> = inner.spots.values().cloned().collect();
        blocks.sort_by(|a, b| a.block.cmp(&b.block));
        spots.sort_by(|a, b| a.spot_id.cmp(&b.spot_id));
        Snapshot { blocks, spots }
    }

    /// Up to `limit` most recent transitions, newest first
    pub fn recent_events(&self, limit: usize) -> Vec<TransitionEvent> {
        let inner = self.inner.read();
        inner.recent.iter().take(limit).cloned().collect()
    }

    /// Current state of one spot
    pub fn spot(&self, spot_id: &str) -> Option<SpotState> {
        self.inner.read().spots.get(spot_id).cloned()
    }

    /// Current aggregate of one block
    pub fn block(&self, block: &str) -> Option<BlockAggregate> {
        self.inner.read().blocks.get(block).cloned()
    }

    /// Number of registered spots
    pub fn spot_count(&self) -> usize {
        self.inner.read().spots.len()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration as ChronoDuration};
    use parkhub_core::RawReadings;

    fn t0() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn first_payload_registers_with_defaults() {
        let store = StateStore::new(50);
        let applied = store.apply(&SensorPayload::new("spot4L2"), "L1-L2");
        assert!(applied.registered);
        assert!(applied.transition.is_none());
        assert!(!applied.spot.occupied);
        assert_eq!(applied.block.total_spots, 1);
        assert_eq!(applied.block.available_spots, 1);
    }

    #[test]
    fn occupancy_edge_produces_transition() {
        let store = StateStore::new(50);
        store.apply(&SensorPayload::new("spot4L2").with_occupied(false), "L1-L2");
        let applied = store.apply(&SensorPayload::new("spot4L2").with_occupied(true), "L1-L2");

        let ev = applied.transition.unwrap();
        assert_eq!(ev.direction, Direction::Occupied);
        assert_eq!(ev.spot_id, "spot4L2");
        assert_eq!(applied.block.occupied_spots, 1);
        assert_eq!(applied.block.available_spots, 0);
        assert!(!applied.block.available);
    }

    #[test]
    fn repeated_occupancy_is_edge_triggered() {
        let store = StateStore::new(50);
        let mut transitions = 0;
        for _ in 0..3 {
            let applied = store.apply(&SensorPayload::new("a").with_occupied(true), "L1-L2");
            transitions += usize::from(applied.transition.is_some());
        }
        assert_eq!(transitions, 1);
    }

    #[test]
    fn readings_only_payload_preserves_occupancy() {
        let store = StateStore::new(50);
        store.apply(&SensorPayload::new("a").with_occupied(true), "L1-L2");

        let raw_only = SensorPayload::new("a").with_readings(RawReadings {
            detector: None,
            left_distance: Some(12.0),
            right_distance: None,
        });
        let applied = store.apply(&raw_only, "L1-L2");

        assert!(applied.spot.occupied, "occupancy must survive a readings-only payload");
        assert!(applied.transition.is_none());
        assert_eq!(applied.spot.readings.left_distance, 12.0);
    }

    #[test]
    fn aggregate_invariant_holds_across_sequences() {
        let store = StateStore::new(50);
        let payloads = [
            ("a", Some(true)),
            ("b", Some(true)),
            ("a", Some(false)),
            ("c", None),
            ("b", Some(true)),
            ("c", Some(true)),
        ];
        for (id, occupied) in payloads {
            let mut p = SensorPayload::new(id);
            if let Some(o) = occupied {
                p = p.with_occupied(o);
            }
            let applied = store.apply(&p, "L1-L2");
            assert!(applied.block.is_consistent());
            assert_eq!(
                applied.block.occupied_spots + applied.block.available_spots,
                applied.block.total_spots
            );
        }
    }

    #[test]
    fn two_occupied_spots_fill_a_block() {
        let store = StateStore::new(50);
        store.apply(&SensorPayload::new("a").with_occupied(true), "L1-L2");
        let applied = store.apply(&SensorPayload::new("b").with_occupied(true), "L1-L2");
        assert_eq!(applied.block.occupied_spots, 2);
        assert_eq!(applied.block.total_spots, 2);
        assert!(!applied.block.available);
    }

    #[test]
    fn ring_keeps_newest_fifty() {
        let store = StateStore::new(50);
        for i in 0..30 {
            // Each flip is one transition; 60 transitions total
            store.apply(&SensorPayload::new(format!("s{i}")).with_occupied(true), "L1-L2");
            store.apply(&SensorPayload::new(format!("s{i}")).with_occupied(false), "L1-L2");
        }
        let recent = store.recent_events(usize::MAX);
        assert_eq!(recent.len(), 50);
        // Newest first: the last transition was s29 freed
        assert_eq!(recent[0].spot_id, "s29");
        assert_eq!(recent[0].direction, Direction::Freed);
    }

    #[test]
    fn recent_events_respects_limit() {
        let store = StateStore::new(50);
        for i in 0..5 {
            store.apply(&SensorPayload::new(format!("s{i}")).with_occupied(true), "L1-L2");
        }
        assert_eq!(store.recent_events(2).len(), 2);
    }

    #[test]
    fn out_of_order_timestamp_applies_last_write_wins() {
        let store = StateStore::new(50);
        let now = t0();
        store.apply(
            &SensorPayload::new("a").with_occupied(true).with_timestamp(now),
            "L1-L2",
        );
        let stale = SensorPayload::new("a")
            .with_occupied(false)
            .with_timestamp(now - ChronoDuration::seconds(60));
        let applied = store.apply(&stale, "L1-L2");

        assert!(!applied.spot.occupied, "stale payload still applies");
        assert_eq!(applied.transition.unwrap().direction, Direction::Freed);
    }

    #[test]
    fn snapshot_is_sorted_and_complete() {
        let store = StateStore::new(50);
        store.apply(&SensorPayload::new("b"), "L1-L2");
        store.apply(&SensorPayload::new("a"), "L3-L4");
        let snap = store.snapshot();
        assert_eq!(snap.spots.len(), 2);
        assert_eq!(snap.spots[0].spot_id, "a");
        assert_eq!(snap.blocks.len(), 2);
        assert_eq!(snap.blocks[0].block, "L1-L2");
    }

    #[test]
    fn block_assignment_is_immutable_after_registration() {
        let store = StateStore::new(50);
        store.apply(&SensorPayload::new("a"), "L1-L2");
        // Same identity, different resolved block: registration wins
        let applied = store.apply(&SensorPayload::new("a").with_occupied(true), "L9");
        assert_eq!(applied.spot.block, "L1-L2");
    }
}
