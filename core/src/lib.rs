//! parkhub-core - Core types for the parkhub occupancy pipeline
//!
//! This crate provides the types shared between the parkhub gateway and
//! external adapters (durable logs, observers, sensor sources):
//!
//! - [`SensorPayload`] - the validated ingestion-boundary schema
//! - [`SpotState`] / [`BlockAggregate`] - authoritative state entities
//! - [`TransitionEvent`] / [`Update`] - detected edges and the broadcast envelope
//! - [`EventLog`] trait - async interface to the durable event log
//! - [`Observer`] trait - async interface for live-update consumers
//! - [`AdapterError`] - error type for adapter operations
//!
//! # Why this crate exists
//!
//! External adapters (a Postgres event log, a websocket bridge) need the
//! entity types and the traits, but nothing from the gateway's internals.
//! Extracting them here keeps adapter crates off the gateway's dependency
//! tree and lets the gateway optionally depend on adapters without cycles.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(missing_docs)]

mod error;
/// Transition events and the broadcast update envelope
pub mod event;
mod log;
mod observer;
/// The validated sensor payload schema
pub mod payload;
/// Authoritative state entities
pub mod state;

pub use error::AdapterError;
pub use event::{Direction, Snapshot, TransitionEvent, Update};
pub use log::{EventLog, LogId};
pub use observer::{Observer, DEFAULT_QUEUE_CAPACITY};
pub use payload::{PayloadError, RawReadings, SensorPayload};
pub use state::{BlockAggregate, Readings, SpotState, DEFAULT_DISTANCE_CM};
