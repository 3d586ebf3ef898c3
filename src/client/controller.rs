use std::collections::{BTreeMap, BTreeSet};
use std::slice;

use tracing::{debug, info};

use crate::{
    client::{
        AdminClient,
        error::{Error, Result},
    },
    policy::ConfigKeyPolicy,
    resource::{AlterConfigOp, ResourceRef},
    topic::{NewTopic, TopicDescription},
    validation::{ExactlyOne, ValidationError},
};

impl AdminClient {
    /// Names of all topics, internal ones included.
    pub async fn list_topics(&self) -> Result<BTreeSet<String>> {
        self.list_topics_filtered(true).await
    }

    /// Names of all topics, optionally leaving out internal ones such as `__consumer_offsets`.
    pub async fn list_topics_filtered(&self, include_internal: bool) -> Result<BTreeSet<String>> {
        self.with_session("list_topics", |session| async move {
            let topics = session.list_topics().await?;

            Ok(topics
                .into_iter()
                .filter(|t| include_internal || !t.is_internal)
                .map(|t| t.name)
                .collect())
        })
        .await
    }

    /// Describe a topic and its partitions.
    ///
    /// Fails with [`Error::NotFound`] if the topic does not exist.
    pub async fn describe_topic(&self, name: impl Into<String> + Send) -> Result<TopicDescription> {
        let name = name.into();

        self.with_session("describe_topic", |session| async move {
            let topics = session.describe_topics(slice::from_ref(&name)).await?;

            topics
                .exactly_one(&name)
                .map_err(|m| Error::unexpected_entries(ResourceRef::Topic(name.clone()), m))
        })
        .await
    }

    /// Full current configuration of a topic.
    ///
    /// Reading is not restricted by [`ConfigKeyPolicy`]; only mutation is.
    pub async fn describe_topic_config(
        &self,
        name: impl Into<String> + Send,
    ) -> Result<BTreeMap<String, String>> {
        let resource = ResourceRef::Topic(name.into());

        self.with_session("describe_topic_config", |session| async move {
            Ok(session.describe_config(&resource).await?)
        })
        .await
    }

    /// Create a topic
    ///
    /// Only the shape of `topic` is checked locally; name collisions and replication factors the cluster cannot
    /// satisfy are reported by the broker.
    pub async fn create_topic(&self, topic: NewTopic) -> Result<()> {
        topic.validate()?;

        self.with_session("create_topic", |session| async move {
            session.create_topics(slice::from_ref(&topic)).await?;

            info!(
                topic = topic.name.as_str(),
                num_partitions = topic.num_partitions,
                replication_factor = topic.replication_factor,
                "Created topic",
            );
            Ok(())
        })
        .await
    }

    /// Delete a topic
    ///
    /// This is not idempotent: deleting a topic that does not exist fails with [`Error::NotFound`]. See
    /// [`delete_topic_if_exists`](Self::delete_topic_if_exists) for the forgiving variant.
    pub async fn delete_topic(&self, name: impl Into<String> + Send) -> Result<()> {
        let name = name.into();

        self.with_session("delete_topic", |session| async move {
            session.delete_topics(slice::from_ref(&name)).await?;

            info!(topic = name.as_str(), "Deleted topic");
            Ok(())
        })
        .await
    }

    /// Delete a topic, treating a missing topic as success.
    ///
    /// Returns whether a topic was actually deleted.
    pub async fn delete_topic_if_exists(&self, name: impl Into<String> + Send) -> Result<bool> {
        match self.delete_topic(name).await {
            Ok(()) => Ok(true),
            Err(Error::NotFound(resource)) => {
                debug!(%resource, "Topic to delete does not exist");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Set configuration entries of a topic.
    ///
    /// Every key must pass [`ConfigKeyPolicy`]. If one does not, the request fails with [`Error::Validation`] and
    /// no broker is contacted. Otherwise all entries are submitted as one batch that the broker applies in full or
    /// not at all.
    pub async fn alter_topic_config<I, K, V>(
        &self,
        name: impl Into<String> + Send,
        configs: I,
    ) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)> + Send,
        K: Into<String>,
        V: Into<String>,
    {
        let configs: BTreeMap<String, String> = configs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        ConfigKeyPolicy::validate_all(configs.keys()).map_err(ValidationError::from)?;

        let resource = ResourceRef::Topic(name.into());
        let ops: Vec<_> = configs
            .into_iter()
            .map(|(key, value)| AlterConfigOp::Set { key, value })
            .collect();

        self.with_session("alter_topic_config", |session| async move {
            session.alter_config(&resource, &ops).await?;

            info!(%resource, n_entries = ops.len(), "Altered topic config");
            Ok(())
        })
        .await
    }
}
