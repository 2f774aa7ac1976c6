//! Transition events and the broadcast update envelope

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::state::{BlockAggregate, Readings, SpotState};

/// Direction of an occupancy transition
///
/// Wire encoding matches the durable log's vocabulary: `"occupied"` when a
/// car arrives, `"freed"` when it leaves.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// free -> occupied
    Occupied,
    /// occupied -> free
    Freed,
}

impl Direction {
    /// Direction implied by the new occupancy value after an edge
    pub fn from_new_occupancy(occupied: bool) -> Self {
        if occupied {
            Direction::Occupied
        } else {
            Direction::Freed
        }
    }

    /// Wire string form
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Occupied => "occupied",
            Direction::Freed => "freed",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one detected occupancy change
///
/// Constructed exactly once per edge, then appended to the durable log and
/// to the in-memory recent-events ring. The readings snapshot captures the
/// spot's raw sensor values at transition time.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TransitionEvent {
    /// Spot that changed
    pub spot_id: String,
    /// Block the spot belongs to
    pub block: String,
    /// Which way the occupancy flipped
    pub direction: Direction,
    /// When the triggering payload says it happened
    pub timestamp: DateTime<Utc>,
    /// Raw sensor values at transition time
    pub readings: Readings,
}

/// Consistent point-in-time copy of all state
///
/// Served to a newly attached observer so it can rehydrate before live
/// updates start flowing.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Snapshot {
    /// Every known block aggregate
    pub blocks: Vec<BlockAggregate>,
    /// Every known spot
    pub spots: Vec<SpotState>,
}

/// One broadcast message
///
/// The three live topics plus the rehydration snapshot, as a single tagged
/// envelope so observers receive everything through one channel.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Update {
    /// A block aggregate changed
    Block(BlockAggregate),
    /// A spot's detail changed
    Spot(SpotState),
    /// An occupancy transition was detected
    Transition(TransitionEvent),
    /// Full state for a newly attached observer
    Snapshot(Snapshot),
}

impl Update {
    /// Topic name, for logging and observer-side routing
    pub fn topic(&self) -> &'static str {
        match self {
            Update::Block(_) => "block_update",
            Update::Spot(_) => "spot_update",
            Update::Transition(_) => "transition",
            Update::Snapshot(_) => "snapshot",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn direction_wire_encoding() {
        assert_eq!(serde_json::to_string(&Direction::Occupied).unwrap(), "\"occupied\"");
        assert_eq!(serde_json::to_string(&Direction::Freed).unwrap(), "\"freed\"");
    }

    #[test]
    fn direction_from_new_occupancy() {
        assert_eq!(Direction::from_new_occupancy(true), Direction::Occupied);
        assert_eq!(Direction::from_new_occupancy(false), Direction::Freed);
    }

    #[test]
    fn update_envelope_is_tagged() {
        let spot = SpotState::register("spot4L2", "L1-L2", Utc::now());
        let update = Update::Spot(spot);
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["kind"], "spot");
        assert_eq!(json["data"]["spotId"], "spot4L2");
        assert_eq!(update.topic(), "spot_update");
    }

    #[test]
    fn transition_serializes_snapshot_fields() {
        let ev = TransitionEvent {
            spot_id: "spot4L2".into(),
            block: "L1-L2".into(),
            direction: Direction::Occupied,
            timestamp: Utc::now(),
            readings: Readings {
                detector: true,
                left_distance: 41.0,
                right_distance: 39.5,
            },
        };
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["direction"], "occupied");
        assert_eq!(json["readings"]["leftDistance"], 41.0);
    }
}
