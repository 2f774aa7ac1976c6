//! Error types for parkhub adapters

use thiserror::Error;

/// Error type for adapter operations
///
/// The standard error type for everything that plugs into the pipeline:
/// sensor sources, payload decoders, durable event logs, and observers.
/// Variants map to the failure classes the pipeline distinguishes when
/// deciding whether to retry, drop, or isolate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdapterError {
    /// Raw sensor bytes could not be decoded into payloads
    ///
    /// Examples: invalid JSON, broken base64 framing, schema mismatch.
    /// The frame is dropped; the source keeps reading.
    #[error("decode failed: {0}")]
    Decode(String),

    /// The upstream transport is unreachable or the stream broke
    ///
    /// Examples: connection refused, consumer session lost. The source
    /// runner reconnects with backoff; held state is unaffected.
    #[error("transport error: {0}")]
    Transport(String),

    /// A durable log append failed
    ///
    /// Examples: database down, insert rejected. Surfaced as a warning;
    /// in-memory state and broadcast proceed regardless.
    #[error("write failed: {0}")]
    Write(String),

    /// An observer could not be delivered to
    ///
    /// Isolated to that observer; other observers and the ingest path
    /// never see it.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// An operation exceeded its bounded timeout
    #[error("timed out after {0}ms")]
    Timeout(u64),

    /// Graceful shutdown failed
    #[error("shutdown error: {0}")]
    Shutdown(String),
}
