//! Topic, configuration and consumer-group administration for Kafka-compatible clusters.
//!
//! [`AdminClient`](client::AdminClient) is the entry point. It talks to the cluster through an
//! [`AdminSession`](session::AdminSession) that is opened per operation and closed again before the operation
//! returns; [`memory::InMemoryCluster`] is an in-process implementation of that boundary.
//!
//! ```
//! # async fn example() -> Result<(), rskafka_admin::client::error::Error> {
//! use std::sync::Arc;
//!
//! use rskafka_admin::{client::AdminClientBuilder, memory::InMemoryCluster, topic::NewTopic};
//!
//! let client = AdminClientBuilder::new(Arc::new(InMemoryCluster::new(3))).build();
//!
//! client.create_topic(NewTopic::new("orders", 3, 2)).await?;
//! client
//!     .alter_topic_config("orders", [("retention.ms", "86400000")])
//!     .await?;
//!
//! let report = client.list_all_consumer_group_offsets().await?;
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.group_id, failure.error);
//! }
//! # Ok(())
//! # }
//! ```
#![deny(
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    rust_2018_idioms,
    unsafe_code
)]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    clippy::explicit_iter_loop,
    clippy::future_not_send,
    clippy::use_self,
    clippy::clone_on_ref_ptr
)]
mod backoff;
mod build_info;
pub mod client;
pub mod group;
pub mod memory;
pub mod policy;
mod protocol;
pub mod resource;
pub mod session;
pub mod topic;
mod validation;

pub use backoff::{BackoffConfig, BackoffError};
pub use validation::ValidationError;

pub type ProtocolError = protocol::Error;
