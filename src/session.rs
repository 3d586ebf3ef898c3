//! The administrative endpoint of a cluster, as seen by [`AdminClient`](crate::client::AdminClient).
//!
//! A [`SessionFactory`] knows how to reach a cluster; every call to [`SessionFactory::open`] yields a fresh
//! [`AdminSession`] that is used for one caller-facing operation and closed afterwards. How a session talks to the
//! broker (wire protocol, TLS, SASL) is entirely up to the implementation.
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::{
    ProtocolError,
    build_info::DEFAULT_CLIENT_ID,
    group::{ConsumerGroupDescription, ConsumerGroupListing, OffsetAndMetadata, TopicPartition},
    resource::{AlterConfigOp, ResourceRef},
    topic::{NewTopic, TopicDescription, TopicListing},
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SessionError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Server error {error} for {resource} with message \"{}\"", .message.as_deref().unwrap_or_default())]
    Server {
        error: ProtocolError,
        resource: ResourceRef,
        message: Option<String>,
    },

    #[error("Session already closed")]
    Closed,
}

impl SessionError {
    pub fn server(error: ProtocolError, resource: ResourceRef) -> Self {
        Self::Server {
            error,
            resource,
            message: None,
        }
    }

    pub fn server_with_message(
        error: ProtocolError,
        resource: ResourceRef,
        message: impl Into<String>,
    ) -> Self {
        Self::Server {
            error,
            resource,
            message: Some(message.into()),
        }
    }

    /// Failure to reach the broker at all, as opposed to the broker refusing a request.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Settings handed to [`SessionFactory::open`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub client_id: Arc<str>,

    /// Upper bound for a single round trip. Sessions report overruns as [`SessionError::Timeout`].
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            client_id: Arc::from(DEFAULT_CLIENT_ID),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// A short-lived handle to the administrative endpoint of a cluster.
///
/// Every method is one round trip. Results are keyed by the requested resource name; a resource the broker rejects
/// is reported as [`SessionError::Server`] naming that resource.
#[async_trait]
pub trait AdminSession: std::fmt::Debug + Send + Sync {
    /// All topics, internal ones included.
    async fn list_topics(&self) -> Result<Vec<TopicListing>, SessionError>;

    async fn describe_topics(
        &self,
        names: &[String],
    ) -> Result<BTreeMap<String, TopicDescription>, SessionError>;

    async fn create_topics(&self, topics: &[NewTopic]) -> Result<(), SessionError>;

    async fn delete_topics(&self, names: &[String]) -> Result<(), SessionError>;

    async fn describe_config(
        &self,
        resource: &ResourceRef,
    ) -> Result<BTreeMap<String, String>, SessionError>;

    /// Apply all `ops` or none of them.
    async fn alter_config(
        &self,
        resource: &ResourceRef,
        ops: &[AlterConfigOp],
    ) -> Result<(), SessionError>;

    async fn list_consumer_groups(&self) -> Result<Vec<ConsumerGroupListing>, SessionError>;

    async fn describe_consumer_groups(
        &self,
        group_ids: &[String],
    ) -> Result<BTreeMap<String, ConsumerGroupDescription>, SessionError>;

    /// Committed offsets of one group. A group without commits yields an empty map.
    async fn list_consumer_group_offsets(
        &self,
        group_id: &str,
    ) -> Result<BTreeMap<TopicPartition, OffsetAndMetadata>, SessionError>;

    /// Release all resources held by this session.
    ///
    /// Requests issued after closing fail with [`SessionError::Closed`].
    async fn close(&self);
}

/// Opens [`AdminSession`]s against one cluster.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, config: &SessionConfig) -> Result<Box<dyn AdminSession>, SessionError>;
}
