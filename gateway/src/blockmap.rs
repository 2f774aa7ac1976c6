//! Identity->block resolution
//!
//! Spots are grouped into logical blocks by naming convention. The mapping
//! is a data-driven rule table from configuration, not inline conditionals:
//! adding a third block is a config change, never a code change.

use crate::config::BlockRule;

/// Substring-rule table mapping spot identities to block names
#[derive(Debug, Clone)]
pub struct BlockMap {
    rules: Vec<BlockRule>,
    fallback: String,
}

impl BlockMap {
    /// Build from an ordered rule list and a fallback block
    pub fn new(rules: Vec<BlockRule>, fallback: impl Into<String>) -> Self {
        Self {
            rules,
            fallback: fallback.into(),
        }
    }

    /// Resolve the block for an identity; first matching rule wins,
    /// otherwise the fallback block
    pub fn resolve(&self, identity: &str) -> &str {
        self.rules
            .iter()
            .find(|rule| identity.contains(rule.needle.as_str()))
            .map(|rule| rule.block.as_str())
            .unwrap_or(self.fallback.as_str())
    }

    /// The fallback block name
    pub fn fallback(&self) -> &str {
        &self.fallback
    }
}
