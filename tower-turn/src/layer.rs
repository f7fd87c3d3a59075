use std::time::Duration;

use tower::Layer;
use turn_limit::TurnLimiter;

use crate::service::TurnLimitService;

/// Admits requests through a shared [`TurnLimiter`] before they reach
/// the inner service.
#[derive(Clone, Debug)]
pub struct TurnLimitLayer {
    limiter: TurnLimiter,
    priority: i64,
    timeout: Option<Duration>,
}

impl TurnLimitLayer {
    /// Create a TurnLimitLayer around a shared limiter.
    ///
    /// Several layers can share one limiter; they then compete for the
    /// same admission window at their configured priorities.
    pub fn new(limiter: TurnLimiter) -> Self {
        TurnLimitLayer {
            limiter,
            priority: 0,
            timeout: None,
        }
    }

    /// Set the wait-queue priority for requests passing through this
    /// layer. Higher priorities are admitted first when a slot frees.
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    /// Set the maximum time a request may wait for admission.
    ///
    /// If the wait exceeds this duration, the service will return
    /// `TurnError::Timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl<S> Layer<S> for TurnLimitLayer {
    type Service = TurnLimitService<S>;

    fn layer(&self, service: S) -> Self::Service {
        let mut svc = TurnLimitService::new(service, self.limiter.clone())
            .with_priority(self.priority);
        if let Some(timeout) = self.timeout {
            svc = svc.with_timeout(timeout);
        }
        svc
    }
}
