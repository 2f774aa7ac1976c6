//! Authoritative state entities: per-spot detail and per-block aggregates

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::payload::RawReadings;

/// Distance a ranging sensor reports with nothing in front of it.
/// New spots start here so an empty spot reads as empty before the first
/// measurement arrives.
pub const DEFAULT_DISTANCE_CM: f64 = 304.0;

/// Concrete last-known sensor measurements for a spot
///
/// Unlike [`RawReadings`] these are never optional: a spot always has a
/// last-known value for every field, seeded at registration and overlaid
/// by whatever each accepted payload carries.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Readings {
    /// Binary detector flag
    pub detector: bool,
    /// Left-side distance, centimeters
    pub left_distance: f64,
    /// Right-side distance, centimeters
    pub right_distance: f64,
}

impl Default for Readings {
    fn default() -> Self {
        Self {
            detector: false,
            left_distance: DEFAULT_DISTANCE_CM,
            right_distance: DEFAULT_DISTANCE_CM,
        }
    }
}

impl Readings {
    /// Overlay the fields a payload actually carried; absent fields keep
    /// their previous value.
    pub fn apply(&mut self, raw: &RawReadings) {
        if let Some(d) = raw.detector {
            self.detector = d;
        }
        if let Some(l) = raw.left_distance {
            self.left_distance = l;
        }
        if let Some(r) = raw.right_distance {
            self.right_distance = r;
        }
    }
}

/// One sensor-equipped parking spot
///
/// Created on the first payload referencing an unseen identity; mutated in
/// place by every accepted payload after that; never deleted.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SpotState {
    /// Stable identity, never reused across spots
    pub spot_id: String,
    /// Logical block, assigned at registration and immutable after
    pub block: String,
    /// Authoritative "car present" flag
    pub occupied: bool,
    /// Last-known raw measurements
    #[serde(flatten)]
    pub readings: Readings,
    /// Timestamp of the last accepted payload
    pub last_update: DateTime<Utc>,
}

impl SpotState {
    /// Registration state for a newly observed identity
    pub fn register(spot_id: impl Into<String>, block: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            spot_id: spot_id.into(),
            block: block.into(),
            occupied: false,
            readings: Readings::default(),
            last_update: now,
        }
    }
}

/// Derived per-block occupancy summary
///
/// Never independently authoritative: always recomputed from the set of
/// [`SpotState`] entries whose `block` matches, inside the same store
/// transaction that mutated a spot.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockAggregate {
    /// Block key
    pub block: String,
    /// Spots registered in this block
    pub total_spots: usize,
    /// Spots currently occupied
    pub occupied_spots: usize,
    /// Spots currently free (`occupied + available == total`, always)
    pub available_spots: usize,
    /// True iff at least one spot is free
    pub available: bool,
    /// Timestamp of the most recent contributing spot mutation
    pub last_update: DateTime<Utc>,
}

impl BlockAggregate {
    /// Derive the aggregate for `block` from spot states
    ///
    /// `spots` may be the full spot set; entries for other blocks are
    /// skipped here so callers don't pre-filter.
    pub fn derive<'a, I>(block: &str, spots: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a SpotState>,
    {
        let mut total = 0usize;
        let mut occupied = 0usize;
        for spot in spots.into_iter().filter(|s| s.block == block) {
            total += 1;
            if spot.occupied {
                occupied += 1;
            }
        }
        let available_spots = total - occupied;
        Self {
            block: block.to_string(),
            total_spots: total,
            occupied_spots: occupied,
            available_spots,
            available: available_spots > 0,
            last_update: now,
        }
    }

    /// The derivation invariant, in checkable form
    pub fn is_consistent(&self) -> bool {
        self.occupied_spots + self.available_spots == self.total_spots
            && self.available == (self.available_spots > 0)
    }
}
