//! Session double that answers with whatever it was scripted to, including shapes [`InMemoryCluster`] never
//! produces.
//!
//! [`InMemoryCluster`]: crate::memory::InMemoryCluster
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    group::{
        ConsumerGroupDescription, ConsumerGroupListing, GroupState, OffsetAndMetadata, TopicPartition,
    },
    resource::{AlterConfigOp, ResourceRef},
    session::{AdminSession, SessionConfig, SessionError, SessionFactory},
    topic::{NewTopic, TopicDescription, TopicListing},
};

/// Lists the scripted group IDs verbatim, answers describe requests with empty maps and reports one commit on
/// `orders/0` for every group whose offsets are requested.
#[derive(Debug, Clone, Default)]
pub(crate) struct ScriptedCluster {
    group_ids: Vec<String>,
    offset_queries: Arc<Mutex<BTreeMap<String, usize>>>,
}

impl ScriptedCluster {
    pub(crate) fn with_groups(group_ids: &[&str]) -> Self {
        Self {
            group_ids: group_ids.iter().map(|g| g.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Offset queries per group ID.
    pub(crate) fn offset_queries(&self) -> BTreeMap<String, usize> {
        self.offset_queries.lock().clone()
    }
}

#[async_trait]
impl SessionFactory for ScriptedCluster {
    async fn open(&self, _config: &SessionConfig) -> Result<Box<dyn AdminSession>, SessionError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl AdminSession for ScriptedCluster {
    async fn list_topics(&self) -> Result<Vec<TopicListing>, SessionError> {
        Ok(vec![])
    }

    async fn describe_topics(
        &self,
        _names: &[String],
    ) -> Result<BTreeMap<String, TopicDescription>, SessionError> {
        Ok(BTreeMap::new())
    }

    async fn create_topics(&self, _topics: &[NewTopic]) -> Result<(), SessionError> {
        Ok(())
    }

    async fn delete_topics(&self, _names: &[String]) -> Result<(), SessionError> {
        Ok(())
    }

    async fn describe_config(
        &self,
        _resource: &ResourceRef,
    ) -> Result<BTreeMap<String, String>, SessionError> {
        Ok(BTreeMap::new())
    }

    async fn alter_config(
        &self,
        _resource: &ResourceRef,
        _ops: &[AlterConfigOp],
    ) -> Result<(), SessionError> {
        Ok(())
    }

    async fn list_consumer_groups(&self) -> Result<Vec<ConsumerGroupListing>, SessionError> {
        Ok(self
            .group_ids
            .iter()
            .map(|group_id| ConsumerGroupListing {
                group_id: group_id.clone(),
                state: GroupState::stable(),
            })
            .collect())
    }

    async fn describe_consumer_groups(
        &self,
        _group_ids: &[String],
    ) -> Result<BTreeMap<String, ConsumerGroupDescription>, SessionError> {
        Ok(BTreeMap::new())
    }

    async fn list_consumer_group_offsets(
        &self,
        group_id: &str,
    ) -> Result<BTreeMap<TopicPartition, OffsetAndMetadata>, SessionError> {
        *self
            .offset_queries
            .lock()
            .entry(group_id.to_owned())
            .or_default() += 1;

        Ok(BTreeMap::from([(
            TopicPartition::new("orders", 0),
            OffsetAndMetadata::new(7, ""),
        )]))
    }

    async fn close(&self) {}
}
