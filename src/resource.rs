//! Addressing of cluster resources and configuration mutations.

use std::fmt;

/// A resource an admin request is about.
///
/// Used both to address configuration requests and to give errors context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceRef {
    /// The cluster as a whole, e.g. when listing topics or groups.
    Cluster,
    Topic(String),
    Group(String),
}

impl ResourceRef {
    pub fn topic(name: impl Into<String>) -> Self {
        Self::Topic(name.into())
    }

    pub fn group(group_id: impl Into<String>) -> Self {
        Self::Group(group_id.into())
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster => write!(f, "cluster"),
            Self::Topic(name) => write!(f, "topic '{name}'"),
            Self::Group(group_id) => write!(f, "consumer group '{group_id}'"),
        }
    }
}

/// One incremental configuration change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterConfigOp {
    /// Set `key` to `value`, replacing any current value.
    Set { key: String, value: String },

    /// Revert `key` to its default.
    Delete { key: String },
}

impl AlterConfigOp {
    pub fn key(&self) -> &str {
        match self {
            Self::Set { key, .. } | Self::Delete { key } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(ResourceRef::Cluster.to_string(), "cluster");
        assert_eq!(ResourceRef::topic("orders").to_string(), "topic 'orders'");
        assert_eq!(
            ResourceRef::group("billing").to_string(),
            "consumer group 'billing'"
        );
    }

    #[test]
    fn test_op_key() {
        let set = AlterConfigOp::Set {
            key: "retention.ms".to_owned(),
            value: "1000".to_owned(),
        };
        let delete = AlterConfigOp::Delete {
            key: "cleanup.policy".to_owned(),
        };
        assert_eq!(set.key(), "retention.ms");
        assert_eq!(delete.key(), "cleanup.policy");
    }
}
