use std::task::Context;
use std::task::Poll;
use std::time::Duration;

use futures::future::BoxFuture;
use tower::BoxError;
use tower::Service;
use turn_limit::TurnLimiter;

use crate::error::TurnError;

/// Guards an inner service behind a shared [`TurnLimiter`].
///
/// Every request awaits its turn before being forwarded, entering the
/// wait queue at this service's configured priority whenever the
/// admission window is full.
#[derive(Clone, Debug)]
pub struct TurnLimitService<S> {
    inner: S,
    limiter: TurnLimiter,
    priority: i64,
    timeout: Option<Duration>,
}

impl<S> TurnLimitService<S> {
    pub fn new(inner: S, limiter: TurnLimiter) -> Self {
        Self {
            inner,
            limiter,
            priority: 0,
            timeout: None,
        }
    }

    /// Set the wait-queue priority for requests from this service.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Set the maximum time a request may wait for admission before
    /// failing with [`TurnError::Timeout`].
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<S, Req> Service<Req> for TurnLimitService<S>
where
    S: Service<Req, Error = BoxError> + Clone + Send + 'static,
    S::Future: Send,
    Req: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, Result<S::Response, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Req) -> Self::Future {
        let limiter = self.limiter.clone();
        let priority = self.priority;
        let wait_limit = self.timeout;

        // The future may outlive self, so it takes the ready instance
        // and leaves a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            match wait_limit {
                Some(limit) => limiter
                    .await_turn_timeout(priority, limit)
                    .await
                    .map_err(|_| BoxError::from(TurnError::Timeout))?,
                None => {
                    // Infallible without a deadline
                    let _ = limiter.await_turn_with_priority(priority).await;
                }
            }
            inner.call(req).await
        })
    }
}
