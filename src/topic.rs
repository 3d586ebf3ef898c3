use crate::validation::ValidationError;

/// Topic to be created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTopic {
    pub name: String,
    pub num_partitions: i32,
    pub replication_factor: i16,
}

impl NewTopic {
    pub fn new(name: impl Into<String>, num_partitions: i32, replication_factor: i16) -> Self {
        Self {
            name: name.into(),
            num_partitions,
            replication_factor,
        }
    }

    /// Structural checks only.
    ///
    /// Whether the cluster has enough brokers or the name is already taken is for the broker to decide.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyTopicName);
        }
        if self.num_partitions <= 0 {
            return Err(ValidationError::NonPositivePartitions(self.num_partitions));
        }
        if self.replication_factor <= 0 {
            return Err(ValidationError::NonPositiveReplicationFactor(
                self.replication_factor,
            ));
        }
        Ok(())
    }
}

/// Entry of a topic listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicListing {
    pub name: String,
    pub is_internal: bool,
}

/// Snapshot of a topic and its partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicDescription {
    pub name: String,
    pub is_internal: bool,
    pub partitions: Vec<PartitionInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionInfo {
    pub partition: i32,

    /// `None` while the partition has no leader.
    pub leader: Option<i32>,

    /// Replica node IDs, preferred leader first.
    pub replicas: Vec<i32>,

    /// In-sync replica node IDs; always a subset of `replicas`.
    pub isr: Vec<i32>,
}
