//! Helpers for common checks for the validity of data.
use std::collections::BTreeMap;

use thiserror::Error;

use crate::policy::InvalidKeyError;

/// A request was rejected locally, before any broker was contacted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(transparent)]
    ConfigKey(#[from] InvalidKeyError),

    #[error("Topic name must not be empty")]
    EmptyTopicName,

    #[error("Partition count must be positive but is {0}")]
    NonPositivePartitions(i32),

    #[error("Replication factor must be positive but is {0}")]
    NonPositiveReplicationFactor(i16),
}

/// How a keyed response failed to contain exactly the requested entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    /// The requested key is absent; `found` other entries came back.
    Missing { found: usize },

    /// The requested key is present alongside `extra` other entries.
    Surplus { extra: usize },
}

/// Validates a keyed response holds exactly the one entry that was asked for.
pub trait ExactlyOne<V> {
    fn exactly_one(self, key: &str) -> Result<V, Mismatch>;
}

impl<V> ExactlyOne<V> for BTreeMap<String, V> {
    /// Returns the entry for `key` if it is the only entry in the map.
    fn exactly_one(mut self, key: &str) -> Result<V, Mismatch> {
        let v = self
            .remove(key)
            .ok_or(Mismatch::Missing { found: self.len() })?;
        if self.is_empty() {
            Ok(v)
        } else {
            Err(Mismatch::Surplus { extra: self.len() })
        }
    }
}
