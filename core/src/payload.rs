//! The validated sensor payload - parkhub's ingestion-boundary schema
//!
//! Sensors report through a managed event hub (or a direct submission path)
//! as loosely-shaped JSON. [`SensorPayload`] pins that shape down: the
//! identity is required, everything else is optional, unknown fields are
//! ignored, and the original firmware's field spellings are accepted as
//! aliases so deployed devices keep working.
//!
//! # JSON Schema
//!
//! ```json
//! {
//!   "identity": "spot4L2",           // alias: "deviceId" (required)
//!   "timestamp": "2026-08-26T09:00:00Z",
//!   "occupied": true,                // alias: "isCarParked"
//!   "rawFields": {                   // or the same keys at top level
//!     "metalDetected": true,
//!     "leftDistance": 42.5,
//!     "rightDistance": 40.0
//!   }
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Identity strings that upstream firmware is known to emit when its own
/// device-id lookup fails. Treated the same as a missing identity.
const PLACEHOLDER_IDENTITIES: &[&str] = &["undefined", "null"];

/// Validation failure for an inbound payload
///
/// A malformed payload is dropped with a diagnostic; it never reaches the
/// state store and never propagates as a failure to the submitter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// No identity field, or an empty one
    #[error("payload has no identity")]
    MissingIdentity,

    /// Identity is a known placeholder emitted by broken firmware
    #[error("identity is a placeholder: {0:?}")]
    PlaceholderIdentity(String),
}

/// Optional raw sensor measurements carried by a payload
///
/// Every field is independently optional: a field absent from the payload
/// means "keep the spot's previous value", never "reset".
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct RawReadings {
    /// Binary detector flag (the original hardware's metal/IR detector)
    #[serde(default, alias = "metalDetected", alias = "irDetected")]
    pub detector: Option<bool>,

    /// Left-side distance reading, centimeters
    #[serde(default, alias = "leftDistance")]
    pub left_distance: Option<f64>,

    /// Right-side distance reading, centimeters
    #[serde(default, alias = "rightDistance")]
    pub right_distance: Option<f64>,
}

impl RawReadings {
    /// True if no measurement is present at all
    pub fn is_empty(&self) -> bool {
        self.detector.is_none() && self.left_distance.is_none() && self.right_distance.is_none()
    }

    /// Field-wise overlay: values in `self` win, gaps fall back to `other`
    pub fn or(&self, other: &RawReadings) -> RawReadings {
        RawReadings {
            detector: self.detector.or(other.detector),
            left_distance: self.left_distance.or(other.left_distance),
            right_distance: self.right_distance.or(other.right_distance),
        }
    }
}

/// One decoded sensor reading, not yet applied to any state
///
/// Construction via deserialization (sources) or the builder-style setters
/// (direct submission, tests). Validation is a separate step so the
/// ingestion engine owns the accept/drop decision.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct SensorPayload {
    /// Stable spot identity. Required; never reused across spots.
    #[serde(default, alias = "deviceId")]
    pub identity: String,

    /// Reading timestamp as reported by the sensor (ISO-8601).
    /// Absent means "now" at application time.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,

    /// Authoritative "car present" flag, if this payload carries one
    #[serde(default, alias = "isCarParked")]
    pub occupied: Option<bool>,

    /// Nested raw-measurement bag (the `rawFields` shape)
    #[serde(default, rename = "rawFields")]
    raw_nested: RawReadings,

    /// The original firmware reports measurements at the top level;
    /// flatten catches those spellings.
    #[serde(flatten)]
    raw_flat: RawReadings,
}

impl SensorPayload {
    /// New payload carrying only an identity
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            ..Self::default()
        }
    }

    /// Set the occupancy flag
    #[must_use]
    pub fn with_occupied(mut self, occupied: bool) -> Self {
        self.occupied = Some(occupied);
        self
    }

    /// Set the reported timestamp
    #[must_use]
    pub fn with_timestamp(mut self, ts: DateTime<Utc>) -> Self {
        self.timestamp = Some(ts);
        self
    }

    /// Set raw measurements
    #[must_use]
    pub fn with_readings(mut self, raw: RawReadings) -> Self {
        self.raw_flat = raw;
        self
    }

    /// The raw measurements this payload carries, whichever spelling was used
    ///
    /// Top-level fields win over the nested `rawFields` bag if a sender
    /// somehow supplies both.
    pub fn readings(&self) -> RawReadings {
        self.raw_flat.or(&self.raw_nested)
    }

    /// Check the payload against the boundary rules
    ///
    /// # Errors
    /// - [`PayloadError::MissingIdentity`] if the identity is absent or empty
    /// - [`PayloadError::PlaceholderIdentity`] for the literal placeholder
    ///   values broken firmware emits
    pub fn validate(&self) -> Result<(), PayloadError> {
        if self.identity.is_empty() {
            return Err(PayloadError::MissingIdentity);
        }
        if PLACEHOLDER_IDENTITIES.contains(&self.identity.as_str()) {
            return Err(PayloadError::PlaceholderIdentity(self.identity.clone()));
        }
        Ok(())
    }
}
