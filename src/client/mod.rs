use std::future::Future;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::{
    backoff::{Backoff, BackoffConfig},
    session::{AdminSession, SessionConfig, SessionFactory},
};

pub mod controller;
pub mod error;
pub mod fanout;
pub mod groups;
#[cfg(test)]
mod testing;

use error::{Error, Result};

/// Default number of concurrent per-group queries in
/// [`list_all_consumer_group_offsets`](AdminClient::list_all_consumer_group_offsets).
pub const DEFAULT_FANOUT_LIMIT: usize = 8;

/// Builder for [`AdminClient`].
pub struct AdminClientBuilder {
    factory: Arc<dyn SessionFactory>,
    session_config: SessionConfig,
    fanout_limit: usize,
    backoff_config: BackoffConfig,
}

impl AdminClientBuilder {
    /// Create a new [`AdminClientBuilder`] that opens its sessions through `factory`.
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            session_config: SessionConfig::default(),
            fanout_limit: DEFAULT_FANOUT_LIMIT,
            backoff_config: BackoffConfig::default(),
        }
    }

    /// Client ID reported to the broker.
    pub fn client_id(mut self, client_id: impl Into<Arc<str>>) -> Self {
        self.session_config.client_id = client_id.into();
        self
    }

    /// Timeout for a single round trip, enforced by the session.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.session_config.request_timeout = timeout;
        self
    }

    /// Maximum number of consumer groups queried concurrently. Clamped to at least 1.
    pub fn fanout_limit(mut self, limit: usize) -> Self {
        self.fanout_limit = limit.max(1);
        self
    }

    /// Backoff used while a session cannot be opened.
    pub fn backoff_config(mut self, backoff_config: BackoffConfig) -> Self {
        self.backoff_config = backoff_config;
        self
    }

    /// Build [`AdminClient`].
    pub fn build(self) -> AdminClient {
        AdminClient {
            factory: self.factory,
            session_config: self.session_config,
            fanout_limit: self.fanout_limit,
            backoff_config: self.backoff_config,
        }
    }
}

impl std::fmt::Debug for AdminClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClientBuilder")
            .field("session_config", &self.session_config)
            .field("fanout_limit", &self.fanout_limit)
            .field("backoff_config", &self.backoff_config)
            .finish_non_exhaustive()
    }
}

/// Topic, configuration and consumer-group administration.
///
/// Every operation opens its own [`AdminSession`], uses it for its round trips and closes it before returning, on
/// success and failure alike. Nothing is cached between calls.
pub struct AdminClient {
    factory: Arc<dyn SessionFactory>,
    session_config: SessionConfig,
    fanout_limit: usize,
    backoff_config: BackoffConfig,
}

impl AdminClient {
    /// Run `f` against a freshly opened session and close it afterwards.
    async fn with_session<T, F, Fut>(&self, request_name: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(Arc<dyn AdminSession>) -> Fut + Send,
        Fut: Future<Output = Result<T>> + Send,
        T: Send,
    {
        let session = ScopedSession::new(request_name, self.open_session(request_name).await?);

        let result = f(session.handle()).await;
        match &result {
            Err(Error::ServerError {
                protocol_error,
                resource,
                ..
            }) => {
                debug!(
                    code = protocol_error.code(),
                    %resource,
                    request_name,
                    "broker rejected request"
                );
            }
            Err(e) => debug!(e=%e, request_name, "request failed"),
            Ok(_) => {}
        }

        session.close().await;
        result
    }

    /// Open a session, backing off while the cluster cannot be reached.
    async fn open_session(&self, request_name: &'static str) -> Result<Arc<dyn AdminSession>> {
        let mut backoff = Backoff::new(&self.backoff_config);

        let session = backoff
            .retry_with_backoff(request_name, || async {
                match self.factory.open(&self.session_config).await {
                    Ok(session) => ControlFlow::Break(Ok(session)),
                    Err(e) if e.is_transport() => {
                        warn!(e=%e, request_name, "Failed to open admin session");
                        ControlFlow::Continue(e)
                    }
                    Err(e) => {
                        error!(
                            e=%e,
                            request_name,
                            "opening admin session encountered fatal error",
                        );
                        ControlFlow::Break(Err(e))
                    }
                }
            })
            .await??;

        debug!(
            request_name,
            client_id = self.session_config.client_id.as_ref(),
            "Opened admin session"
        );
        Ok(Arc::from(session))
    }
}

impl std::fmt::Debug for AdminClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminClient")
            .field("session_config", &self.session_config)
            .field("fanout_limit", &self.fanout_limit)
            .field("backoff_config", &self.backoff_config)
            .finish_non_exhaustive()
    }
}

/// Session that is released on every exit path.
///
/// [`close`](Self::close) is the regular way out. If the owning future is dropped before that, e.g. because the
/// caller gave up on it, the close is handed to the runtime instead.
struct ScopedSession {
    request_name: &'static str,
    session: Arc<dyn AdminSession>,
    released: bool,
}

impl ScopedSession {
    fn new(request_name: &'static str, session: Arc<dyn AdminSession>) -> Self {
        Self {
            request_name,
            session,
            released: false,
        }
    }

    fn handle(&self) -> Arc<dyn AdminSession> {
        Arc::clone(&self.session)
    }

    async fn close(mut self) {
        self.released = true;
        self.session.close().await;
        debug!(request_name = self.request_name, "Closed admin session");
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                info!(
                    request_name = self.request_name,
                    "Request abandoned, closing admin session in background"
                );
                let session = Arc::clone(&self.session);
                handle.spawn(async move { session.close().await });
            }
            Err(_) => {
                error!(
                    request_name = self.request_name,
                    "Request abandoned outside of a runtime, admin session is left to its destructor"
                );
            }
        }
    }
}
