//! Error types for the parkhub gateway

use thiserror::Error;

// Re-export the adapter error so gateway users need one import
pub use parkhub_core::AdapterError;

/// Result type alias for gateway operations
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Service-level error type for the gateway
///
/// Adapter failures inside the running pipeline are handled where they
/// occur (logged, retried, or isolated); this type covers the failures a
/// caller of the gateway API can actually observe.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// An adapter failed during startup or shutdown
    #[error("adapter error: {0}")]
    Adapter(#[from] AdapterError),

    /// A pipeline channel closed while the gateway was still running
    ///
    /// Seen only when submitting work during shutdown.
    #[error("pipeline channel closed")]
    ChannelClosed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_error_converts() {
        let err: GatewayError = AdapterError::Write("insert failed".to_string()).into();
        assert!(matches!(err, GatewayError::Adapter(_)));
        assert_eq!(err.to_string(), "adapter error: write failed: insert failed");
    }

    #[test]
    fn config_error_display() {
        let err = GatewayError::Config("fallback block is empty".to_string());
        assert_eq!(err.to_string(), "configuration error: fallback block is empty");
    }
}
