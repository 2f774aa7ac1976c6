//! Tracing-backed observer, useful as an always-on audit trail

use async_trait::async_trait;
use tracing::info;

use parkhub_core::{AdapterError, Observer, Update};

/// Observer that logs every update through `tracing`
///
/// The zero-dependency way to watch a pipeline: attach it and read the
/// structured log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl LogObserver {
    /// Create a new log observer
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Observer for LogObserver {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, update: &Update) -> Result<(), AdapterError> {
        match update {
            Update::Block(block) => info!(
                topic = update.topic(),
                block = %block.block,
                occupied = block.occupied_spots,
                available = block.available_spots,
                "block updated"
            ),
            Update::Spot(spot) => info!(
                topic = update.topic(),
                spot = %spot.spot_id,
                occupied = spot.occupied,
                "spot updated"
            ),
            Update::Transition(ev) => info!(
                topic = update.topic(),
                spot = %ev.spot_id,
                direction = %ev.direction,
                "transition"
            ),
            Update::Snapshot(snap) => info!(
                topic = update.topic(),
                blocks = snap.blocks.len(),
                spots = snap.spots.len(),
                "snapshot delivered"
            ),
        }
        Ok(())
    }
}
