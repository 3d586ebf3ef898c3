//! Committed offsets of every consumer group in the cluster.
use std::collections::BTreeMap;

use futures::{StreamExt, stream};
use tracing::{info, warn};

use crate::{
    client::{
        AdminClient,
        error::{Error, Result},
    },
    group::TopicOffsets,
};

/// A consumer group whose offsets could not be fetched.
#[derive(Debug)]
pub struct GroupOffsetsFailure {
    pub group_id: String,
    pub error: Error,
}

/// Result of [`AdminClient::list_all_consumer_group_offsets`].
///
/// Every group found while listing ends up in exactly one of `offsets` and `failures`.
#[derive(Debug, Default)]
#[must_use]
pub struct GroupOffsetsReport {
    /// Committed offsets by group ID, then topic.
    ///
    /// Groups without any commits map to an empty [`TopicOffsets`].
    pub offsets: BTreeMap<String, TopicOffsets>,

    pub failures: Vec<GroupOffsetsFailure>,
}

impl GroupOffsetsReport {
    /// No group failed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_group_ids(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.group_id.as_str())
    }
}

impl AdminClient {
    /// Committed offsets of every consumer group, keyed by group ID, then topic.
    ///
    /// Groups are discovered first; each group is then queried on its own session with up to
    /// [`fanout_limit`](crate::client::AdminClientBuilder::fanout_limit) queries in flight. A group whose query fails
    /// is recorded in [`GroupOffsetsReport::failures`] and does not affect the others. Only a failure to list the
    /// groups fails the call as a whole.
    pub async fn list_all_consumer_group_offsets(&self) -> Result<GroupOffsetsReport> {
        let group_ids: Vec<String> = self.list_consumer_groups().await?.into_keys().collect();
        let n_groups = group_ids.len();

        let results: Vec<(String, Result<TopicOffsets>)> = stream::iter(group_ids)
            .map(|group_id| async move {
                let res = self.list_consumer_group_offsets(group_id.as_str()).await;
                (group_id, res)
            })
            .buffer_unordered(self.fanout_limit)
            .collect()
            .await;

        let mut report = GroupOffsetsReport::default();
        for (group_id, res) in results {
            match res {
                Ok(offsets) => {
                    report.offsets.insert(group_id, offsets);
                }
                Err(error) => {
                    warn!(
                        e=%error,
                        group_id = group_id.as_str(),
                        "Failed to fetch consumer group offsets",
                    );
                    report.failures.push(GroupOffsetsFailure { group_id, error });
                }
            }
        }
        report.failures.sort_by(|a, b| a.group_id.cmp(&b.group_id));

        info!(
            n_groups,
            n_failed = report.failures.len(),
            "Fetched consumer group offsets",
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use assert_matches::assert_matches;

    use crate::{
        client::{AdminClientBuilder, testing::ScriptedCluster},
        group::{GroupState, OffsetAndMetadata, TopicPartition},
        memory::{InMemoryCluster, Operation},
        session::SessionError,
    };

    use super::*;

    fn client(cluster: &InMemoryCluster, fanout_limit: usize) -> AdminClient {
        AdminClientBuilder::new(Arc::new(cluster.clone()))
            .fanout_limit(fanout_limit)
            .build()
    }

    fn seed(cluster: &InMemoryCluster, group_id: &str, topic: &str, offset: i64) {
        cluster.commit_offset(
            group_id,
            TopicPartition::new(topic, 0),
            OffsetAndMetadata::new(offset, ""),
        );
    }

    #[tokio::test]
    async fn test_all_groups_merged() {
        let cluster = InMemoryCluster::new(1);
        seed(&cluster, "a", "orders", 1);
        seed(&cluster, "a", "payments", 2);
        seed(&cluster, "b", "orders", 3);
        cluster.upsert_group("idle", GroupState::empty(), false);
        let client = client(&cluster, 2);

        let report = client.list_all_consumer_group_offsets().await.unwrap();
        assert!(report.is_complete());
        assert_eq!(report.offsets.len(), 3);
        assert_eq!(report.offsets["a"].len(), 2);
        assert_eq!(report.offsets["a"]["payments"][0].offset, 2);
        assert_eq!(report.offsets["b"]["orders"][0].offset, 3);
        assert!(report.offsets["idle"].is_empty());

        // one session for the listing, one per group
        assert_eq!(cluster.sessions_opened(), 4);
        assert_eq!(cluster.sessions_closed(), 4);
        assert_eq!(cluster.calls(Operation::ListConsumerGroupOffsets), 3);
    }

    #[tokio::test]
    async fn test_partial_failure() {
        let cluster = InMemoryCluster::new(1);
        seed(&cluster, "a", "orders", 1);
        seed(&cluster, "b", "orders", 2);
        seed(&cluster, "c", "orders", 3);
        cluster.fail_group_offsets("b", SessionError::Connection("connection reset".to_owned()));
        let client = client(&cluster, 8);

        let report = client.list_all_consumer_group_offsets().await.unwrap();

        assert!(!report.is_complete());
        assert_eq!(
            report.offsets.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
        assert_eq!(report.failed_group_ids().collect::<Vec<_>>(), vec!["b"]);
        assert_matches!(report.failures[0].error, Error::Transport(_));
        assert_eq!(cluster.sessions_opened(), cluster.sessions_closed());
    }

    #[tokio::test]
    async fn test_listing_failure_is_an_error() {
        let cluster = InMemoryCluster::new(1);
        seed(&cluster, "a", "orders", 1);
        cluster.fail_operation(
            Operation::ListConsumerGroups,
            SessionError::Connection("connection reset".to_owned()),
        );
        let client = client(&cluster, 8);

        assert_matches!(
            client.list_all_consumer_group_offsets().await,
            Err(Error::Transport(_))
        );
        assert_eq!(cluster.calls(Operation::ListConsumerGroupOffsets), 0);
    }

    #[tokio::test]
    async fn test_no_groups() {
        let cluster = InMemoryCluster::new(1);
        let client = client(&cluster, 8);

        let report = client.list_all_consumer_group_offsets().await.unwrap();
        assert!(report.is_complete());
        assert!(report.offsets.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_groups_bounded_fanout() {
        let cluster = InMemoryCluster::new(3);
        for i in 0..100 {
            seed(&cluster, &format!("group-{i:03}"), "orders", i);
        }
        cluster.fail_group_offsets("group-050", SessionError::Closed);
        cluster.set_latency(Duration::from_millis(2));
        let client = client(&cluster, 4);

        let report = client.list_all_consumer_group_offsets().await.unwrap();
        assert_eq!(report.offsets.len(), 99);
        assert_eq!(report.failed_group_ids().collect::<Vec<_>>(), vec!["group-050"]);
        assert_eq!(report.offsets["group-099"]["orders"][0].offset, 99);

        let max_concurrent = cluster.max_concurrent_sessions();
        assert!(max_concurrent > 1, "queries did not overlap");
        assert!(max_concurrent <= 4, "{max_concurrent} sessions open at once");
        assert_eq!(cluster.sessions_opened(), cluster.sessions_closed());
    }

    #[tokio::test]
    async fn test_duplicate_group_listings_queried_once() {
        let cluster = ScriptedCluster::with_groups(&["billing", "audit", "billing", "billing"]);
        let client = AdminClientBuilder::new(Arc::new(cluster.clone())).build();

        let report = client.list_all_consumer_group_offsets().await.unwrap();
        assert!(report.is_complete());
        assert_eq!(
            report.offsets.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["audit", "billing"]
        );
        assert_eq!(report.offsets["billing"]["orders"][0].offset, 7);
        assert_eq!(
            cluster.offset_queries(),
            BTreeMap::from([("audit".to_owned(), 1), ("billing".to_owned(), 1)])
        );
    }
}
