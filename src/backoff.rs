use rand::prelude::*;
use std::ops::ControlFlow;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Exponential backoff with jitter
///
/// See <https://aws.amazon.com/blogs/architecture/exponential-backoff-and-jitter/>
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub init_backoff: Duration,
    pub max_backoff: Duration,
    pub base: f64,

    /// Give up once the accumulated backoff would exceed this. `None` retries forever.
    pub deadline: Option<Duration>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            init_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(500),
            base: 3.,
            deadline: Some(Duration::from_secs(30)),
        }
    }
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BackoffError {
    #[error("Retry exceeded deadline of {deadline:?}. Source: {source}")]
    DeadlineExceeded {
        deadline: Duration,
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

pub type BackoffResult<T> = Result<T, BackoffError>;

/// [`Backoff`] can be created from a [`BackoffConfig`]
///
/// Consecutive calls to [`Backoff::next`] will return the next backoff interval
///
#[derive(Debug)]
pub struct Backoff<R = StdRng> {
    init_backoff: f64,
    next_backoff_secs: f64,
    max_backoff_secs: f64,
    base: f64,
    total: Duration,
    deadline: Option<Duration>,
    rng: R,
}

impl Backoff<StdRng> {
    /// Create a new [`Backoff`] from the provided [`BackoffConfig`]
    ///
    /// The generator is seeded from the thread-local one so the backoff can be held across `.await` in a `Send`
    /// future.
    pub fn new(config: &BackoffConfig) -> Self {
        Self::new_with_rng(config, StdRng::from_rng(&mut rand::rng()))
    }
}

impl<R: Rng> Backoff<R> {
    pub fn new_with_rng(config: &BackoffConfig, rng: R) -> Self {
        let init_backoff = config.init_backoff.as_secs_f64();
        Self {
            init_backoff,
            next_backoff_secs: init_backoff,
            max_backoff_secs: config.max_backoff.as_secs_f64(),
            base: config.base,
            total: Duration::ZERO,
            deadline: config.deadline,
            rng,
        }
    }

    /// Returns the next backoff duration to wait for
    pub fn next(&mut self) -> Duration {
        let upper = self.next_backoff_secs * self.base;
        let sampled = if upper > self.init_backoff {
            self.rng.random_range(self.init_backoff..upper)
        } else {
            self.init_backoff
        };
        let next_backoff = self.max_backoff_secs.min(sampled);
        Duration::from_secs_f64(std::mem::replace(&mut self.next_backoff_secs, next_backoff))
    }

    /// Perform an async operation that retries with a backoff
    ///
    /// `do_stuff` breaks with the final value or continues with the error that caused this attempt to fail.
    pub async fn retry_with_backoff<F, F1, B, E>(
        &mut self,
        request_name: &str,
        do_stuff: F,
    ) -> BackoffResult<B>
    where
        F: (Fn() -> F1) + Send + Sync,
        F1: std::future::Future<Output = ControlFlow<B, E>> + Send,
        E: std::error::Error + Send + Sync + 'static,
    {
        loop {
            let e = match do_stuff().await {
                ControlFlow::Break(r) => break Ok(r),
                ControlFlow::Continue(e) => e,
            };

            let backoff = self.next();
            self.total += backoff;
            if let Some(deadline) = self.deadline {
                if self.total > deadline {
                    return Err(BackoffError::DeadlineExceeded {
                        deadline,
                        source: Box::new(e),
                    });
                }
            }

            info!(
                e=%e,
                request_name,
                backoff_secs = backoff.as_secs_f64(),
                "request encountered non-fatal error - backing off",
            );
            tokio::time::sleep(backoff).await;
        }
    }
}
