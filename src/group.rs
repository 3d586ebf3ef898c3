//! Consumer groups and their committed offsets.
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// State of a consumer group as reported by the broker.
///
/// The broker owns this vocabulary and may grow it, so unknown values are carried as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupState(String);

impl GroupState {
    pub const STABLE: &'static str = "Stable";
    pub const EMPTY: &'static str = "Empty";
    pub const DEAD: &'static str = "Dead";
    pub const PREPARING_REBALANCE: &'static str = "PreparingRebalance";
    pub const COMPLETING_REBALANCE: &'static str = "CompletingRebalance";

    pub fn new(state: impl Into<String>) -> Self {
        Self(state.into())
    }

    pub fn stable() -> Self {
        Self::new(Self::STABLE)
    }

    pub fn empty() -> Self {
        Self::new(Self::EMPTY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is one of the states named above.
    pub fn is_known(&self) -> bool {
        [
            Self::STABLE,
            Self::EMPTY,
            Self::DEAD,
            Self::PREPARING_REBALANCE,
            Self::COMPLETING_REBALANCE,
        ]
        .contains(&self.0.as_str())
    }
}

impl fmt::Display for GroupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupState {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

/// Entry of a consumer group listing as returned by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerGroupListing {
    pub group_id: String,
    pub state: GroupState,
}

/// Value side of [`list_consumer_groups`](crate::client::AdminClient::list_consumer_groups).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupListing {
    pub state: GroupState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerGroupDescription {
    pub group_id: String,
    pub state: GroupState,

    /// Group that commits offsets without using group membership.
    pub is_simple: bool,
    pub members: Vec<MemberDescription>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDescription {
    pub member_id: String,
    pub client_id: String,
    pub host: String,
    pub assignment: BTreeSet<TopicPartition>,
}

/// Offset value used by the broker when nothing was committed.
pub const NO_OFFSET: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetAndMetadata {
    pub offset: i64,
    pub metadata: String,
}

impl OffsetAndMetadata {
    pub fn new(offset: i64, metadata: impl Into<String>) -> Self {
        Self {
            offset,
            metadata: metadata.into(),
        }
    }

    pub fn is_committed(&self) -> bool {
        self.offset != NO_OFFSET
    }
}

/// Committed offset of one partition, as handed out to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionOffset {
    pub partition: i32,
    pub offset: i64,
    pub metadata: String,
}

/// Committed offsets of one group, keyed by topic.
pub type TopicOffsets = BTreeMap<String, Vec<PartitionOffset>>;

/// Regroup flat per-partition commits by topic.
///
/// Partitions are sorted within each topic; the broker makes no ordering promise.
pub fn group_by_topic<I>(commits: I) -> TopicOffsets
where
    I: IntoIterator<Item = (TopicPartition, OffsetAndMetadata)>,
{
    let mut out = TopicOffsets::new();
    for (tp, commit) in commits {
        out.entry(tp.topic).or_default().push(PartitionOffset {
            partition: tp.partition,
            offset: commit.offset,
            metadata: commit.metadata,
        });
    }
    for partitions in out.values_mut() {
        partitions.sort_by_key(|p| p.partition);
    }
    out
}
