use std::collections::BTreeMap;
use std::slice;

use tracing::debug;

use crate::{
    client::{
        AdminClient,
        error::{Error, Result},
    },
    group::{ConsumerGroupDescription, GroupListing, TopicOffsets, group_by_topic},
    resource::ResourceRef,
    validation::ExactlyOne,
};

impl AdminClient {
    /// All consumer groups known to the cluster and their state.
    pub async fn list_consumer_groups(&self) -> Result<BTreeMap<String, GroupListing>> {
        self.with_session("list_consumer_groups", |session| async move {
            let listings = session.list_consumer_groups().await?;

            Ok(listings
                .into_iter()
                .map(|l| {
                    if !l.state.is_known() {
                        debug!(
                            group_id = l.group_id.as_str(),
                            state = %l.state,
                            "Passing through unrecognized consumer group state",
                        );
                    }
                    (l.group_id, GroupListing { state: l.state })
                })
                .collect())
        })
        .await
    }

    /// Describe one consumer group including its members and their assignments.
    ///
    /// Fails with [`Error::NotFound`] if the group is unknown.
    pub async fn describe_consumer_group(
        &self,
        group_id: impl Into<String> + Send,
    ) -> Result<ConsumerGroupDescription> {
        let group_id = group_id.into();

        self.with_session("describe_consumer_group", |session| async move {
            let groups = session
                .describe_consumer_groups(slice::from_ref(&group_id))
                .await?;

            groups
                .exactly_one(&group_id)
                .map_err(|m| Error::unexpected_entries(ResourceRef::Group(group_id.clone()), m))
        })
        .await
    }

    /// Committed offsets of one consumer group, grouped by topic.
    ///
    /// A group without any commits yields an empty map.
    pub async fn list_consumer_group_offsets(
        &self,
        group_id: impl Into<String> + Send,
    ) -> Result<TopicOffsets> {
        let group_id = group_id.into();

        self.with_session("list_consumer_group_offsets", |session| async move {
            let commits = session.list_consumer_group_offsets(&group_id).await?;

            let uncommitted = commits.values().filter(|c| !c.is_committed()).count();
            debug!(
                group_id = group_id.as_str(),
                n_partitions = commits.len(),
                uncommitted,
                "Fetched consumer group offsets",
            );
            Ok(group_by_topic(commits))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use assert_matches::assert_matches;

    use crate::{
        client::{AdminClientBuilder, testing::ScriptedCluster},
        group::{GroupState, MemberDescription, NO_OFFSET, OffsetAndMetadata, TopicPartition},
        memory::InMemoryCluster,
    };

    use super::*;

    fn client(cluster: &InMemoryCluster) -> AdminClient {
        AdminClientBuilder::new(Arc::new(cluster.clone())).build()
    }

    #[tokio::test]
    async fn test_list_consumer_groups() {
        let cluster = InMemoryCluster::new(1);
        cluster.upsert_group("billing", GroupState::stable(), false);
        cluster.upsert_group("audit", GroupState::new("Assigning"), true);
        let client = client(&cluster);

        let groups = client.list_consumer_groups().await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["billing"].state, GroupState::stable());
        // states the broker invents later are passed through
        assert_eq!(groups["audit"].state.as_str(), "Assigning");
    }

    #[tokio::test]
    async fn test_describe_consumer_group() {
        let cluster = InMemoryCluster::new(1);
        cluster.upsert_group("billing", GroupState::stable(), false);
        cluster.add_group_member(
            "billing",
            MemberDescription {
                member_id: "consumer-1-5d7c".to_owned(),
                client_id: "consumer-1".to_owned(),
                host: "/10.0.0.7".to_owned(),
                assignment: BTreeSet::from([
                    TopicPartition::new("orders", 0),
                    TopicPartition::new("orders", 1),
                ]),
            },
        );
        let client = client(&cluster);

        let group = client.describe_consumer_group("billing").await.unwrap();
        assert_eq!(group.group_id, "billing");
        assert_eq!(group.state, GroupState::stable());
        assert!(!group.is_simple);
        assert_eq!(group.members.len(), 1);
        assert_eq!(group.members[0].host, "/10.0.0.7");
        assert_eq!(group.members[0].assignment.len(), 2);

        assert_matches!(
            client.describe_consumer_group("missing").await,
            Err(Error::NotFound(ResourceRef::Group(id))) if id == "missing"
        );
    }

    #[tokio::test]
    async fn test_list_consumer_group_offsets() {
        let cluster = InMemoryCluster::new(1);
        cluster.commit_offset(
            "billing",
            TopicPartition::new("orders", 1),
            OffsetAndMetadata::new(42, "checkpoint"),
        );
        cluster.commit_offset(
            "billing",
            TopicPartition::new("orders", 0),
            OffsetAndMetadata::new(NO_OFFSET, ""),
        );
        cluster.commit_offset(
            "billing",
            TopicPartition::new("payments", 0),
            OffsetAndMetadata::new(7, ""),
        );
        let client = client(&cluster);

        let offsets = client.list_consumer_group_offsets("billing").await.unwrap();
        assert_eq!(offsets.len(), 2);

        let orders = &offsets["orders"];
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].partition, 0);
        assert_eq!(orders[0].offset, NO_OFFSET);
        assert_eq!(orders[1].offset, 42);
        assert_eq!(orders[1].metadata, "checkpoint");
        assert_eq!(offsets["payments"][0].offset, 7);
    }

    #[tokio::test]
    async fn test_list_consumer_group_offsets_without_commits() {
        let cluster = InMemoryCluster::new(1);
        cluster.upsert_group("idle", GroupState::empty(), false);
        let client = client(&cluster);

        let offsets = client.list_consumer_group_offsets("idle").await.unwrap();
        assert!(offsets.is_empty());
    }

    #[tokio::test]
    async fn test_describe_omitted_group_is_not_found() {
        let cluster = ScriptedCluster::with_groups(&["billing"]);
        let client = AdminClientBuilder::new(Arc::new(cluster)).build();

        assert_matches!(
            client.describe_consumer_group("billing").await,
            Err(Error::NotFound(ResourceRef::Group(g))) if g == "billing"
        );
    }
}
