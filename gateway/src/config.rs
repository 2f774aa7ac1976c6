//! Gateway configuration
//!
//! [`GatewayConfig`] centralizes the pipeline's tunables: the identity->block
//! rule table, ring-buffer and channel capacities, the durable-append timeout,
//! and the source reconnect backoff. Defaults match the original deployment;
//! every field has a `PARKHUB_*` environment override for operators.

use std::time::Duration;

use crate::error::GatewayError;

/// One identity->block naming rule
///
/// An identity containing `needle` as a substring belongs to `block`.
/// Rules are checked in order; the first match wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockRule {
    /// Substring to look for in the spot identity
    pub needle: String,
    /// Block assigned on match
    pub block: String,
}

impl BlockRule {
    /// Convenience constructor
    pub fn new(needle: impl Into<String>, block: impl Into<String>) -> Self {
        Self {
            needle: needle.into(),
            block: block.into(),
        }
    }
}

/// Reconnect/retry backoff policy
///
/// The delay for attempt `n` (0-indexed) is `first * factor^n`, clamped to
/// `max`. The base is derived purely from the attempt number, so delays
/// never feed back into later calculations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    /// Delay before the first retry
    pub first: Duration,
    /// Cap on the delay
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0`)
    pub factor: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            first: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 2.0,
        }
    }
}

impl Backoff {
    /// Delay for the given attempt number (0-indexed)
    pub fn delay(&self, attempt: u32) -> Duration {
        let base_ms = self.first.as_millis() as f64 * self.factor.powi(attempt as i32);
        let capped = base_ms.min(self.max.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayConfig {
    /// Identity->block naming rules, first match wins
    pub block_rules: Vec<BlockRule>,
    /// Block for identities matching no rule
    pub fallback_block: String,
    /// Capacity of the in-memory recent-transitions ring
    pub recent_events_capacity: usize,
    /// Depth of the channel feeding the durable log writer
    pub writer_queue_capacity: usize,
    /// Bound on a single durable append before it counts as failed
    pub append_timeout: Duration,
    /// Source reconnect policy
    pub reconnect: Backoff,
}

impl Default for GatewayConfig {
    /// Defaults reproducing the original deployment's conventions:
    /// identities mentioning `L3` or `L4` map to block `L3-L4`, everything
    /// else falls back to `L1-L2`; the ring keeps the 50 newest transitions.
    fn default() -> Self {
        Self {
            block_rules: vec![
                BlockRule::new("L3", "L3-L4"),
                BlockRule::new("L4", "L3-L4"),
            ],
            fallback_block: "L1-L2".to_string(),
            recent_events_capacity: 50,
            writer_queue_capacity: 256,
            append_timeout: Duration::from_secs(5),
            reconnect: Backoff::default(),
        }
    }
}

impl GatewayConfig {
    /// Load defaults, then apply `PARKHUB_*` environment overrides
    ///
    /// - `PARKHUB_BLOCK_RULES` - comma-separated `needle=block` pairs
    /// - `PARKHUB_FALLBACK_BLOCK`
    /// - `PARKHUB_RECENT_EVENTS` - ring capacity
    /// - `PARKHUB_APPEND_TIMEOUT_MS`
    ///
    /// # Errors
    /// [`GatewayError::Config`] on unparseable values.
    pub fn from_env() -> Result<Self, GatewayError> {
        let mut cfg = Self::default();

        if let Ok(rules) = std::env::var("PARKHUB_BLOCK_RULES") {
            cfg.block_rules = parse_block_rules(&rules)?;
        }
        if let Ok(block) = std::env::var("PARKHUB_FALLBACK_BLOCK") {
            cfg.fallback_block = block;
        }
        if let Ok(cap) = std::env::var("PARKHUB_RECENT_EVENTS") {
            cfg.recent_events_capacity = cap
                .parse()
                .map_err(|_| GatewayError::Config(format!("bad PARKHUB_RECENT_EVENTS: {cap:?}")))?;
        }
        if let Ok(ms) = std::env::var("PARKHUB_APPEND_TIMEOUT_MS") {
            let ms: u64 = ms
                .parse()
                .map_err(|_| GatewayError::Config(format!("bad PARKHUB_APPEND_TIMEOUT_MS: {ms:?}")))?;
            cfg.append_timeout = Duration::from_millis(ms);
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject configurations the pipeline cannot start with
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.fallback_block.is_empty() {
            return Err(GatewayError::Config("fallback block is empty".into()));
        }
        if self.recent_events_capacity == 0 {
            return Err(GatewayError::Config("recent-events capacity must be > 0".into()));
        }
        Ok(())
    }
}

fn parse_block_rules(raw: &str) -> Result<Vec<BlockRule>, GatewayError> {
    raw.split(',')
        .filter(|pair| !pair.trim().is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(needle, block)| BlockRule::new(needle.trim(), block.trim()))
                .ok_or_else(|| {
                    GatewayError::Config(format!("bad block rule {pair:?}, expected needle=block"))
                })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_original_deployment() {
        let cfg = GatewayConfig::default();
        assert_eq!(cfg.fallback_block, "L1-L2");
        assert_eq!(cfg.recent_events_capacity, 50);
        assert_eq!(cfg.block_rules.len(), 2);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn backoff_grows_and_caps() {
        let b = Backoff {
            first: Duration::from_millis(500),
            max: Duration::from_secs(4),
            factor: 2.0,
        };
        assert_eq!(b.delay(0), Duration::from_millis(500));
        assert_eq!(b.delay(1), Duration::from_secs(1));
        assert_eq!(b.delay(2), Duration::from_secs(2));
        assert_eq!(b.delay(3), Duration::from_secs(4));
        assert_eq!(b.delay(10), Duration::from_secs(4));
    }

    #[test]
    fn block_rules_parse() {
        let rules = parse_block_rules("L3=L3-L4, L4=L3-L4, P=garage").unwrap();
        assert_eq!(rules.len(), 3);
        assert_eq!(rules[2], BlockRule::new("P", "garage"));
    }

    #[test]
    fn bad_block_rule_is_config_error() {
        assert!(parse_block_rules("L3:L3-L4").is_err());
    }

    #[test]
    fn empty_fallback_rejected() {
        let cfg = GatewayConfig {
            fallback_block: String::new(),
            ..GatewayConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
