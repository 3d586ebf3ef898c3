//! A cluster that lives in process memory.
//!
//! [`InMemoryCluster`] implements [`SessionFactory`] and behaves like a broker for the requests an
//! [`AdminSession`] can issue: it rejects name collisions, replication factors above the broker count, unknown
//! resources and invalid configuration with the error codes a broker would use. On top of that it can inject faults
//! and counts what it was asked to do, which makes it the backbone of this crate's tests.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    ProtocolError,
    group::{
        ConsumerGroupDescription, ConsumerGroupListing, GroupState, MemberDescription,
        OffsetAndMetadata, TopicPartition,
    },
    resource::{AlterConfigOp, ResourceRef},
    session::{AdminSession, SessionConfig, SessionError, SessionFactory},
    topic::{NewTopic, PartitionInfo, TopicDescription, TopicListing},
};

/// Configuration every new topic starts out with, unless overridden through
/// [`InMemoryCluster::set_default_config`].
pub const DEFAULT_TOPIC_CONFIG: [(&str, &str); 9] = [
    ("cleanup.policy", "delete"),
    ("compression.type", "producer"),
    ("delete.retention.ms", "86400000"),
    ("max.message.bytes", "1048588"),
    ("min.insync.replicas", "1"),
    ("retention.bytes", "-1"),
    ("retention.ms", "604800000"),
    ("segment.bytes", "1073741824"),
    ("segment.ms", "604800000"),
];

/// Requests an [`AdminSession`] can issue, for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    ListTopics,
    DescribeTopics,
    CreateTopics,
    DeleteTopics,
    DescribeConfig,
    AlterConfig,
    ListConsumerGroups,
    DescribeConsumerGroups,
    ListConsumerGroupOffsets,
}

#[derive(Debug, Clone)]
struct TopicState {
    is_internal: bool,
    partitions: Vec<PartitionInfo>,
    config: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
struct GroupRecord {
    state: GroupState,
    is_simple: bool,
    members: Vec<MemberDescription>,
    offsets: BTreeMap<TopicPartition, OffsetAndMetadata>,
}

impl GroupRecord {
    fn new(state: GroupState, is_simple: bool) -> Self {
        Self {
            state,
            is_simple,
            members: vec![],
            offsets: BTreeMap::new(),
        }
    }
}

#[derive(Debug)]
struct ClusterState {
    broker_ids: Vec<i32>,
    default_config: BTreeMap<String, String>,
    topics: BTreeMap<String, TopicState>,
    groups: BTreeMap<String, GroupRecord>,
}

impl ClusterState {
    /// Spread replicas round-robin over the brokers, first replica leads.
    fn assign_partitions(&self, num_partitions: i32, replication_factor: i16) -> Vec<PartitionInfo> {
        let n_brokers = self.broker_ids.len();
        (0..num_partitions)
            .map(|partition| {
                let replicas: Vec<i32> = (0..replication_factor as usize)
                    .map(|r| self.broker_ids[(partition as usize + r) % n_brokers])
                    .collect();
                PartitionInfo {
                    partition,
                    leader: replicas.first().copied(),
                    isr: replicas.clone(),
                    replicas,
                }
            })
            .collect()
    }

    fn topic(&self, name: &str) -> Result<&TopicState, SessionError> {
        self.topics.get(name).ok_or_else(|| unknown_topic(name))
    }

    fn group(&self, group_id: &str) -> Result<&GroupRecord, SessionError> {
        self.groups.get(group_id).ok_or_else(|| {
            SessionError::server_with_message(
                ProtocolError::GroupIdNotFound,
                ResourceRef::group(group_id),
                format!("The group id {group_id} was not found."),
            )
        })
    }
}

fn unknown_topic(name: &str) -> SessionError {
    SessionError::server_with_message(
        ProtocolError::UnknownTopicOrPartition,
        ResourceRef::topic(name),
        "This server does not host this topic-partition.",
    )
}

#[derive(Debug, Default)]
struct Faults {
    /// Error returned by the next `n` opens.
    open: Option<(usize, SessionError)>,
    operations: BTreeMap<Operation, SessionError>,
    group_offsets: BTreeMap<String, SessionError>,
}

#[derive(Debug, Default)]
struct Stats {
    calls: Mutex<BTreeMap<Operation, usize>>,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
    max_concurrent_sessions: AtomicUsize,
    client_ids: Mutex<BTreeSet<String>>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<ClusterState>,
    faults: Mutex<Faults>,
    latency: Mutex<Option<Duration>>,
    stats: Stats,
    next_session_id: AtomicUsize,
}

/// An in-process cluster. Cloning yields another handle to the same cluster.
#[derive(Debug, Clone)]
pub struct InMemoryCluster {
    shared: Arc<Shared>,
}

impl InMemoryCluster {
    /// Create an empty cluster with brokers `0..num_brokers`.
    ///
    /// # Panics
    /// If `num_brokers` is zero.
    pub fn new(num_brokers: usize) -> Self {
        assert!(num_brokers > 0, "a cluster needs at least one broker");

        let state = ClusterState {
            broker_ids: (0..num_brokers as i32).collect(),
            default_config: DEFAULT_TOPIC_CONFIG
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            topics: BTreeMap::new(),
            groups: BTreeMap::new(),
        };

        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                faults: Mutex::new(Faults::default()),
                latency: Mutex::new(None),
                stats: Stats::default(),
                next_session_id: AtomicUsize::new(0),
            }),
        }
    }

    /// Change the value new topics start out with for `key`. Also makes `key` a known config key.
    pub fn set_default_config(&self, key: impl Into<String>, value: impl Into<String>) {
        self.shared
            .state
            .lock()
            .default_config
            .insert(key.into(), value.into());
    }

    /// Add a topic flagged as internal, bypassing all checks.
    pub fn add_internal_topic(&self, name: impl Into<String>, num_partitions: i32) {
        let mut state = self.shared.state.lock();
        let partitions = state.assign_partitions(num_partitions, 1);
        let config = state.default_config.clone();
        state.topics.insert(
            name.into(),
            TopicState {
                is_internal: true,
                partitions,
                config,
            },
        );
    }

    /// Create a consumer group or update state and type of an existing one.
    pub fn upsert_group(&self, group_id: impl Into<String>, state: GroupState, is_simple: bool) {
        let mut cluster = self.shared.state.lock();
        let group = cluster
            .groups
            .entry(group_id.into())
            .or_insert_with(|| GroupRecord::new(state.clone(), is_simple));
        group.state = state;
        group.is_simple = is_simple;
    }

    /// Add a member to a group, creating the group as [`Stable`](GroupState::STABLE) if needed.
    pub fn add_group_member(&self, group_id: impl Into<String>, member: MemberDescription) {
        self.shared
            .state
            .lock()
            .groups
            .entry(group_id.into())
            .or_insert_with(|| GroupRecord::new(GroupState::stable(), false))
            .members
            .push(member);
    }

    /// Record a commit, creating the group as [`Empty`](GroupState::EMPTY) if needed.
    pub fn commit_offset(
        &self,
        group_id: impl Into<String>,
        tp: TopicPartition,
        commit: OffsetAndMetadata,
    ) {
        self.shared
            .state
            .lock()
            .groups
            .entry(group_id.into())
            .or_insert_with(|| GroupRecord::new(GroupState::empty(), false))
            .offsets
            .insert(tp, commit);
    }

    /// Remove a group and everything it committed.
    pub fn remove_group(&self, group_id: &str) -> bool {
        self.shared.state.lock().groups.remove(group_id).is_some()
    }

    /// Fail the next `n` session opens with `error`.
    ///
    /// `n == 0` clears a previously configured open failure.
    pub fn fail_next_opens(&self, n: usize, error: SessionError) {
        self.shared.faults.lock().open = (n > 0).then_some((n, error));
    }

    /// Fail every `operation` with `error` until [`clear_faults`](Self::clear_faults).
    pub fn fail_operation(&self, operation: Operation, error: SessionError) {
        self.shared.faults.lock().operations.insert(operation, error);
    }

    /// Fail offset queries for one group with `error` until [`clear_faults`](Self::clear_faults).
    pub fn fail_group_offsets(&self, group_id: impl Into<String>, error: SessionError) {
        self.shared
            .faults
            .lock()
            .group_offsets
            .insert(group_id.into(), error);
    }

    pub fn clear_faults(&self) {
        *self.shared.faults.lock() = Faults::default();
    }

    /// Delay every request by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        *self.shared.latency.lock() = Some(latency);
    }

    /// Number of times `operation` was requested, failed requests included.
    pub fn calls(&self, operation: Operation) -> usize {
        self.shared
            .stats
            .calls
            .lock()
            .get(&operation)
            .copied()
            .unwrap_or_default()
    }

    pub fn total_calls(&self) -> usize {
        self.shared.stats.calls.lock().values().sum()
    }

    pub fn sessions_opened(&self) -> usize {
        self.shared.stats.sessions_opened.load(Ordering::SeqCst)
    }

    pub fn sessions_closed(&self) -> usize {
        self.shared.stats.sessions_closed.load(Ordering::SeqCst)
    }

    /// Highest number of sessions that were open at the same time.
    pub fn max_concurrent_sessions(&self) -> usize {
        self.shared.stats.max_concurrent_sessions.load(Ordering::SeqCst)
    }

    /// Client IDs sessions were opened with.
    pub fn client_ids(&self) -> BTreeSet<String> {
        self.shared.stats.client_ids.lock().clone()
    }
}

#[async_trait]
impl SessionFactory for InMemoryCluster {
    async fn open(&self, config: &SessionConfig) -> Result<Box<dyn AdminSession>, SessionError> {
        {
            let mut faults = self.shared.faults.lock();
            if let Some((remaining, error)) = &mut faults.open {
                let error = error.clone();
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    faults.open = None;
                }
                return Err(error);
            }
        }

        let stats = &self.shared.stats;
        let opened = stats.sessions_opened.fetch_add(1, Ordering::SeqCst) + 1;
        let open_now = opened.saturating_sub(stats.sessions_closed.load(Ordering::SeqCst));
        stats
            .max_concurrent_sessions
            .fetch_max(open_now, Ordering::SeqCst);
        stats
            .client_ids
            .lock()
            .insert(config.client_id.to_string());

        let id = self.shared.next_session_id.fetch_add(1, Ordering::SeqCst);
        debug!(session_id = id, client_id = config.client_id.as_ref(), "Opened in-memory session");

        Ok(Box::new(InMemorySession {
            id,
            shared: Arc::clone(&self.shared),
            closed: AtomicBool::new(false),
        }))
    }
}

/// Session handed out by [`InMemoryCluster`].
#[derive(Debug)]
pub struct InMemorySession {
    id: usize,
    shared: Arc<Shared>,
    closed: AtomicBool,
}

impl InMemorySession {
    /// Count the request, apply latency and injected faults.
    async fn begin(&self, operation: Operation) -> Result<(), SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Closed);
        }
        *self
            .shared
            .stats
            .calls
            .lock()
            .entry(operation)
            .or_default() += 1;

        let latency = *self.shared.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match self.shared.faults.lock().operations.get(&operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AdminSession for InMemorySession {
    async fn list_topics(&self) -> Result<Vec<TopicListing>, SessionError> {
        self.begin(Operation::ListTopics).await?;

        Ok(self
            .shared
            .state
            .lock()
            .topics
            .iter()
            .map(|(name, topic)| TopicListing {
                name: name.clone(),
                is_internal: topic.is_internal,
            })
            .collect())
    }

    async fn describe_topics(
        &self,
        names: &[String],
    ) -> Result<BTreeMap<String, TopicDescription>, SessionError> {
        self.begin(Operation::DescribeTopics).await?;

        let state = self.shared.state.lock();
        names
            .iter()
            .map(|name| -> Result<_, SessionError> {
                let topic = state.topic(name)?;
                Ok((
                    name.clone(),
                    TopicDescription {
                        name: name.clone(),
                        is_internal: topic.is_internal,
                        partitions: topic.partitions.clone(),
                    },
                ))
            })
            .collect()
    }

    async fn create_topics(&self, topics: &[NewTopic]) -> Result<(), SessionError> {
        self.begin(Operation::CreateTopics).await?;

        let mut state = self.shared.state.lock();
        let mut seen = BTreeSet::new();
        for topic in topics {
            let resource = ResourceRef::topic(&topic.name);
            if topic.name.is_empty() {
                return Err(SessionError::server(ProtocolError::InvalidRequest, resource));
            }
            if state.topics.contains_key(&topic.name) || !seen.insert(&topic.name) {
                return Err(SessionError::server_with_message(
                    ProtocolError::TopicAlreadyExists,
                    resource,
                    format!("Topic '{}' already exists.", topic.name),
                ));
            }
            if topic.num_partitions <= 0 {
                return Err(SessionError::server(
                    ProtocolError::InvalidPartitions,
                    resource,
                ));
            }
            if topic.replication_factor <= 0
                || topic.replication_factor as usize > state.broker_ids.len()
            {
                return Err(SessionError::server_with_message(
                    ProtocolError::InvalidReplicationFactor,
                    resource,
                    format!(
                        "Replication factor: {} larger than available brokers: {}.",
                        topic.replication_factor,
                        state.broker_ids.len()
                    ),
                ));
            }
        }

        for topic in topics {
            let partitions = state.assign_partitions(topic.num_partitions, topic.replication_factor);
            let config = state.default_config.clone();
            state.topics.insert(
                topic.name.clone(),
                TopicState {
                    is_internal: false,
                    partitions,
                    config,
                },
            );
        }
        Ok(())
    }

    async fn delete_topics(&self, names: &[String]) -> Result<(), SessionError> {
        self.begin(Operation::DeleteTopics).await?;

        let mut state = self.shared.state.lock();
        for name in names {
            state.topic(name)?;
        }
        for name in names {
            state.topics.remove(name);
        }
        Ok(())
    }

    async fn describe_config(
        &self,
        resource: &ResourceRef,
    ) -> Result<BTreeMap<String, String>, SessionError> {
        self.begin(Operation::DescribeConfig).await?;

        match resource {
            ResourceRef::Topic(name) => Ok(self.shared.state.lock().topic(name)?.config.clone()),
            other => Err(SessionError::server(
                ProtocolError::InvalidRequest,
                other.clone(),
            )),
        }
    }

    async fn alter_config(
        &self,
        resource: &ResourceRef,
        ops: &[AlterConfigOp],
    ) -> Result<(), SessionError> {
        self.begin(Operation::AlterConfig).await?;

        let name = match resource {
            ResourceRef::Topic(name) => name,
            other => {
                return Err(SessionError::server(
                    ProtocolError::InvalidRequest,
                    other.clone(),
                ));
            }
        };

        let mut state = self.shared.state.lock();
        let mut config = state.topic(name)?.config.clone();
        for op in ops {
            let Some(default) = state.default_config.get(op.key()) else {
                return Err(SessionError::server_with_message(
                    ProtocolError::InvalidConfig,
                    resource.clone(),
                    format!("Unknown topic config name: {}", op.key()),
                ));
            };
            match op {
                AlterConfigOp::Set { key, value } => {
                    check_config_value(key, value).map_err(|message| {
                        SessionError::server_with_message(
                            ProtocolError::InvalidConfig,
                            resource.clone(),
                            message,
                        )
                    })?;
                    config.insert(key.clone(), value.clone());
                }
                AlterConfigOp::Delete { key } => {
                    config.insert(key.clone(), default.clone());
                }
            }
        }

        if let Some(topic) = state.topics.get_mut(name) {
            topic.config = config;
        }
        Ok(())
    }

    async fn list_consumer_groups(&self) -> Result<Vec<ConsumerGroupListing>, SessionError> {
        self.begin(Operation::ListConsumerGroups).await?;

        Ok(self
            .shared
            .state
            .lock()
            .groups
            .iter()
            .map(|(group_id, group)| ConsumerGroupListing {
                group_id: group_id.clone(),
                state: group.state.clone(),
            })
            .collect())
    }

    async fn describe_consumer_groups(
        &self,
        group_ids: &[String],
    ) -> Result<BTreeMap<String, ConsumerGroupDescription>, SessionError> {
        self.begin(Operation::DescribeConsumerGroups).await?;

        let state = self.shared.state.lock();
        group_ids
            .iter()
            .map(|group_id| -> Result<_, SessionError> {
                let group = state.group(group_id)?;
                Ok((
                    group_id.clone(),
                    ConsumerGroupDescription {
                        group_id: group_id.clone(),
                        state: group.state.clone(),
                        is_simple: group.is_simple,
                        members: group.members.clone(),
                    },
                ))
            })
            .collect()
    }

    async fn list_consumer_group_offsets(
        &self,
        group_id: &str,
    ) -> Result<BTreeMap<TopicPartition, OffsetAndMetadata>, SessionError> {
        self.begin(Operation::ListConsumerGroupOffsets).await?;

        if let Some(error) = self.shared.faults.lock().group_offsets.get(group_id) {
            return Err(error.clone());
        }

        Ok(self.shared.state.lock().group(group_id)?.offsets.clone())
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shared
                .stats
                .sessions_closed
                .fetch_add(1, Ordering::SeqCst);
            debug!(session_id = self.id, "Closed in-memory session");
        }
    }
}

/// Broker-side value checks for the keys this cluster knows to be numeric or enumerated.
fn check_config_value(key: &str, value: &str) -> Result<(), String> {
    match key {
        "cleanup.policy" => {
            let valid = value
                .split(',')
                .map(str::trim)
                .all(|p| p == "delete" || p == "compact");
            if valid {
                Ok(())
            } else {
                Err(format!(
                    "Invalid value {value} for configuration cleanup.policy: String must be one of: compact, delete"
                ))
            }
        }
        "min.insync.replicas" => match value.parse::<i32>() {
            Ok(v) if v >= 1 => Ok(()),
            _ => Err(format!(
                "Invalid value {value} for configuration min.insync.replicas: Value must be at least 1"
            )),
        },
        "compression.type" => Ok(()),
        _ if key.ends_with(".ms") || key.ends_with(".bytes") => match value.parse::<i64>() {
            Ok(v) if v >= -1 => Ok(()),
            _ => Err(format!(
                "Invalid value {value} for configuration {key}: Not a number of type LONG"
            )),
        },
        _ => Ok(()),
    }
}
