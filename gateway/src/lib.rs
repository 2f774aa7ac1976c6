//! # parkhub-gateway
//!
//! Ingestion, reconciliation, and broadcast pipeline for parking sensor
//! events.
//!
//! ```text
//!  sensor frames            payloads              state + diffs
//!  ────────────►  source  ───────────►  engine  ───────────────┐
//!               (decode +             (validate,               │
//!                reconnect)            reconcile)              │
//!                                          │                   ▼
//!                                          │ transitions   broadcast hub
//!                                          ▼               ──► observers
//!                                     log writer
//!                                     ──► event log
//! ```
//!
//! Build a [`Pipeline`] with the [`Gateway`] builder, then feed it either
//! through [`Pipeline::ingest`] directly or by spawning a source with
//! [`Pipeline::spawn_source`]. Observers attached to the pipeline receive a
//! snapshot first, then live updates, each on its own bounded queue.
//!
//! Domain types (payloads, spot and block state, transition events, the
//! `EventLog` and `Observer` traits) live in [`parkhub_core`] and are
//! re-exported here.

#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]

mod blockmap;
mod config;
mod engine;
mod error;
mod gateway;
mod hub;
mod log;
mod source;
mod store;

pub use blockmap::BlockMap;
pub use config::{Backoff, BlockRule, GatewayConfig};
pub use engine::{IngestOutcome, IngestionEngine};
pub use error::{AdapterError, GatewayError, Result};
pub use gateway::{Gateway, Pipeline};
pub use hub::{BroadcastHub, LogObserver};
pub use log::{MemoryEventLog, RetryLog};
pub use source::{
    Base64JsonDecoder, ChannelSource, FrameSender, JsonDecoder, SensorDecoder, SensorSource,
    SourceRunner,
};
pub use store::StateStore;

// Domain types, re-exported so most callers need a single crate
pub use parkhub_core::{
    BlockAggregate, Direction, EventLog, LogId, Observer, PayloadError, RawReadings, Readings,
    SensorPayload, Snapshot, SpotState, TransitionEvent, Update,
};
