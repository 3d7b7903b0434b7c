//! Per-request cancellation and deadline.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::adapters::cache::{Affected, CoherentCache, EntityKind};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RequestConfig;

/// Caller-supplied abort signal for one read or write pipeline.
///
/// Dropping the pipeline future on abort is what skips the cache fill of an
/// aborted read: the fill runs after the repository call inside the same
/// future.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// No deadline, not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().with_deadline(Instant::now() + timeout)
    }

    /// Context using the configured request timeout, if any.
    pub fn from_config(config: &RequestConfig) -> Self {
        match config.timeout() {
            Some(timeout) => Self::with_timeout(timeout),
            None => Self::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// A context cancelled together with this one, optionally with a
    /// tighter deadline of its own.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail fast if the request was already aborted.
    pub fn check(&self) -> DomainResult<()> {
        if self.token.is_cancelled() {
            return Err(DomainError::Cancelled);
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(DomainError::DeadlineExceeded);
        }
        Ok(())
    }

    /// Drive `fut` until it completes or the request is aborted.
    pub async fn run<T, F>(&self, fut: F) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        self.check()?;

        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(DomainError::Cancelled),
            () = wait_for(self.deadline) => Err(DomainError::DeadlineExceeded),
            result = fut => result,
        }
    }

    /// Run a mutation, then invalidate the cache for it.
    ///
    /// Invalidation happens on every outcome. An aborted or failed mutation
    /// may still have applied some of its statements.
    pub async fn run_write<T, F>(
        &self,
        cache: &CoherentCache,
        kind: EntityKind,
        affected: &Affected,
        fut: F,
    ) -> DomainResult<T>
    where
        F: Future<Output = DomainResult<T>>,
    {
        let result = self.run(fut).await;
        match &result {
            Ok(_) => cache.invalidate_for_write(kind, affected).await,
            Err(e) => {
                debug!(entity = kind.as_str(), error = %e, "Write failed, invalidating anyway");
                cache.invalidate_for_write(kind, affected).await;
            }
        }
        result
    }
}

async fn wait_for(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
