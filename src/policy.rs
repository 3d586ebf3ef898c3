//! Which topic configuration keys callers may change.

use std::collections::BTreeSet;

use thiserror::Error;

/// Topic configuration keys that may be altered.
///
/// Matching is exact and case-sensitive. Growing this list is a code change on purpose.
pub const ALLOWED_CONFIG_KEYS: [&str; 3] = ["retention.ms", "cleanup.policy", "min.insync.replicas"];

/// A mutation named at least one key outside [`ALLOWED_CONFIG_KEYS`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("config keys are not allowed to be altered: {}", .keys.join(", "))]
pub struct InvalidKeyError {
    /// Every offending key, sorted and deduplicated.
    pub keys: Vec<String>,
}

/// Allow-list check for configuration mutations. Pure and stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigKeyPolicy;

impl ConfigKeyPolicy {
    pub fn is_allowed(key: &str) -> bool {
        ALLOWED_CONFIG_KEYS.contains(&key)
    }

    /// Succeeds only if every key is allowed.
    ///
    /// The error lists all rejected keys, not just the first one.
    pub fn validate_all<I, S>(keys: I) -> Result<(), InvalidKeyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rejected: BTreeSet<String> = keys
            .into_iter()
            .filter(|k| !Self::is_allowed(k.as_ref()))
            .map(|k| k.as_ref().to_owned())
            .collect();

        if rejected.is_empty() {
            Ok(())
        } else {
            Err(InvalidKeyError {
                keys: rejected.into_iter().collect(),
            })
        }
    }
}
