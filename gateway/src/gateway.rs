//! Gateway builder - wires the pipeline together
//!
//! [`Gateway`] is the builder: configure, pick an event log, pre-attach
//! observers, then [`Gateway::build`] to get a running [`Pipeline`]. The
//! pipeline handle is the whole public surface at runtime: submit payloads,
//! read snapshots, attach observers, spawn sources, shut down.
//!
//! # Example
//!
//! ```ignore
//! use parkhub_gateway::{Gateway, GatewayConfig, JsonDecoder, LogObserver};
//! use std::sync::Arc;
//!
//! let pipeline = Gateway::new()
//!     .config(GatewayConfig::from_env()?)
//!     .observer(LogObserver::new())
//!     .build()?;
//!
//! let (sender, source) = parkhub_gateway::ChannelSource::new(256);
//! pipeline.spawn_source(source, JsonDecoder::new());
//! ```

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use parkhub_core::{EventLog, Observer, SensorPayload, Snapshot, TransitionEvent};

use crate::blockmap::BlockMap;
use crate::config::GatewayConfig;
use crate::engine::{IngestOutcome, IngestionEngine};
use crate::error::GatewayError;
use crate::hub::BroadcastHub;
use crate::log::{spawn_writer, MemoryEventLog};
use crate::source::{SensorDecoder, SensorSource, SourceRunner};
use crate::store::StateStore;

/// Builder for a parkhub pipeline
pub struct Gateway {
    config: GatewayConfig,
    event_log: Option<Arc<dyn EventLog>>,
    observers: Vec<Arc<dyn Observer>>,
}

impl Gateway {
    /// New builder with default configuration
    pub fn new() -> Self {
        Self {
            config: GatewayConfig::default(),
            event_log: None,
            observers: Vec::new(),
        }
    }

    /// Replace the configuration
    pub fn config(mut self, config: GatewayConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the durable event log
    ///
    /// Defaults to [`MemoryEventLog`] when not set.
    pub fn event_log<L: EventLog + 'static>(self, log: L) -> Self {
        self.event_log_arc(Arc::new(log))
    }

    /// Set the durable event log (Arc version)
    pub fn event_log_arc(mut self, log: Arc<dyn EventLog>) -> Self {
        self.event_log = Some(log);
        self
    }

    /// Attach an observer at startup
    pub fn observer<O: Observer + 'static>(self, observer: O) -> Self {
        self.observer_arc(Arc::new(observer))
    }

    /// Attach an observer at startup (Arc version)
    pub fn observer_arc(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Validate configuration and start the pipeline
    ///
    /// Spawns the log-writer task and one worker per pre-attached observer.
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// [`GatewayError::Config`] if the configuration is unusable.
    pub fn build(self) -> Result<Pipeline, GatewayError> {
        self.config.validate()?;

        let store = Arc::new(StateStore::new(self.config.recent_events_capacity));
        let blocks = BlockMap::new(
            self.config.block_rules.clone(),
            self.config.fallback_block.clone(),
        );
        let log = self
            .event_log
            .unwrap_or_else(|| Arc::new(MemoryEventLog::new()));

        let (writer_tx, writer) = spawn_writer(
            Arc::clone(&log),
            self.config.writer_queue_capacity,
            self.config.append_timeout,
        );

        let hub = BroadcastHub::new(Arc::clone(&store));
        for observer in self.observers {
            hub.attach(observer);
        }

        let engine = Arc::new(IngestionEngine::new(
            Arc::clone(&store),
            blocks,
            writer_tx,
            hub.clone(),
        ));

        info!(
            log = log.name(),
            observers = hub.observer_count(),
            fallback_block = %self.config.fallback_block,
            "pipeline started"
        );

        Ok(Pipeline {
            engine,
            store,
            hub,
            writer,
            cancel: CancellationToken::new(),
            reconnect: self.config.reconnect,
        })
    }
}

impl Default for Gateway {
    fn default() -> Self {
        Self::new()
    }
}

/// A running pipeline
pub struct Pipeline {
    engine: Arc<IngestionEngine>,
    store: Arc<StateStore>,
    hub: BroadcastHub,
    writer: JoinHandle<()>,
    cancel: CancellationToken,
    reconnect: crate::config::Backoff,
}

impl Pipeline {
    /// Submit one payload synchronously (the direct-submission path)
    pub fn ingest(&self, payload: SensorPayload) -> IngestOutcome {
        self.engine.ingest(payload)
    }

    /// Consistent point-in-time copy of all state
    pub fn snapshot(&self) -> Snapshot {
        self.store.snapshot()
    }

    /// Up to `limit` most recent transitions, newest first
    pub fn recent_events(&self, limit: usize) -> Vec<TransitionEvent> {
        self.store.recent_events(limit)
    }

    /// Attach a live observer; it receives a snapshot first
    pub fn attach(&self, observer: Arc<dyn Observer>) {
        self.hub.attach(observer);
    }

    /// Spawn a source runner feeding this pipeline
    ///
    /// The runner reconnects with the configured backoff and stops when
    /// the pipeline shuts down.
    pub fn spawn_source<S>(&self, source: S, decoder: impl SensorDecoder + 'static) -> JoinHandle<()>
    where
        S: SensorSource + 'static,
    {
        let runner = SourceRunner::new(
            Arc::clone(&self.engine),
            decoder,
            self.reconnect,
            self.cancel.child_token(),
        );
        tokio::spawn(runner.run(source))
    }

    /// The engine handle, for callers that embed their own source loop
    pub fn engine(&self) -> Arc<IngestionEngine> {
        Arc::clone(&self.engine)
    }

    /// Stop sources, drain the log writer, and close observer queues
    ///
    /// In-memory state stays readable through snapshots taken before the
    /// handle is dropped.
    pub async fn shutdown(self) {
        info!("pipeline shutting down");
        self.cancel.cancel();

        // The writer exits once every engine handle (and with it the
        // writer sender) is gone; sources drop theirs on cancellation.
        drop(self.engine);
        let _ = self.writer.await;

        self.hub.shutdown().await;
        info!("pipeline shutdown complete");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn build_rejects_bad_config() {
        let result = Gateway::new()
            .config(GatewayConfig {
                fallback_block: String::new(),
                ..GatewayConfig::default()
            })
            .build();
        assert!(matches!(result, Err(GatewayError::Config(_))));
    }

    #[tokio::test]
    async fn build_and_shutdown_round_trip() {
        let pipeline = Gateway::new().build().unwrap();
        pipeline.ingest(SensorPayload::new("spot4L2").with_occupied(true));
        assert_eq!(pipeline.snapshot().spots.len(), 1);
        pipeline.shutdown().await;
    }
}
