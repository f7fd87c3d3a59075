use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio::time::sleep_until;
use tokio::time::timeout;
use tracing::debug;
use tracing::trace;

use crate::WaitTimeout;
use crate::queue::WaitQueue;
use crate::window::WindowTracker;

/// A sliding-window admission controller with priority queueing.
///
/// At most `capacity` callers hold a grant at any moment; each grant
/// occupies its slot for the window duration, after which the slot frees
/// and the highest-priority waiter (FIFO within a priority) is admitted
/// in its place. A caller that finds spare capacity is admitted at once
/// and never enters the queue.
///
/// Clones are cheap handles onto the same shared state. Release timers
/// run as tokio tasks, so the limiter must be used inside a tokio
/// runtime.
#[derive(Clone, Debug)]
pub struct TurnLimiter {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    window: Duration,
    state: Mutex<State>,
}

#[derive(Debug)]
struct State {
    tracker: WindowTracker,
    queue: WaitQueue,
}

impl TurnLimiter {
    /// Creates a limiter admitting at most `capacity` callers per
    /// `window`.
    ///
    /// # Panics
    ///
    /// Panics if `window` is zero.
    pub fn new(capacity: NonZeroUsize, window: Duration) -> Self {
        assert!(!window.is_zero(), "window must be positive");
        Self {
            inner: Arc::new(Inner {
                window,
                state: Mutex::new(State {
                    tracker: WindowTracker::new(capacity),
                    queue: WaitQueue::default(),
                }),
            }),
        }
    }

    /// Creates a limiter admitting at most `capacity` callers per minute.
    pub fn per_minute(capacity: NonZeroUsize) -> Self {
        Self::new(capacity, Duration::from_secs(60))
    }

    /// Waits for an admission slot at priority 0, indefinitely.
    pub async fn await_turn(&self) -> Result<(), WaitTimeout> {
        self.turn(0, None).await
    }

    /// Waits for an admission slot at `priority`, indefinitely.
    ///
    /// Whenever a slot frees, the highest-priority waiter is admitted
    /// first; equal priorities are admitted in call order. Sustained
    /// higher-priority traffic will starve lower priorities.
    pub async fn await_turn_with_priority(&self, priority: i64) -> Result<(), WaitTimeout> {
        self.turn(priority, None).await
    }

    /// Waits for an admission slot at `priority`, failing with
    /// [`WaitTimeout`] if still queued once `limit` has elapsed.
    ///
    /// A zero `limit` means wait indefinitely. A timed-out caller that
    /// retries re-enters at the back of whichever lane it names.
    pub async fn await_turn_timeout(
        &self,
        priority: i64,
        limit: Duration,
    ) -> Result<(), WaitTimeout> {
        self.turn(priority, (!limit.is_zero()).then_some(limit)).await
    }

    /// Number of callers currently queued (not yet admitted).
    pub fn len(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// `true` when nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.inner.state.lock().queue.is_empty()
    }

    /// Number of grants currently occupying the window.
    pub fn used_slots(&self) -> usize {
        self.inner.state.lock().tracker.used_slots()
    }

    /// Time until the earliest occupied slot frees; zero when an
    /// immediate admission is currently possible.
    pub fn time_until_next_admission(&self) -> Duration {
        self.inner
            .state
            .lock()
            .tracker
            .time_until_next_release(Instant::now())
    }

    async fn turn(&self, priority: i64, limit: Option<Duration>) -> Result<(), WaitTimeout> {
        let (mut admitted, position) = {
            let mut state = self.inner.state.lock();
            if state.tracker.has_capacity() {
                let deadline = Instant::now() + self.inner.window;
                let id = state.tracker.begin_grant(deadline);
                drop(state);
                trace!(priority, "admitted immediately");
                arm_release(&self.inner, id, deadline);
                return Ok(());
            }
            let (admit, admitted) = oneshot::channel();
            let position = state.queue.enqueue(priority, admit);
            trace!(priority, position, "queued");
            (admitted, position)
        };

        match limit {
            None => {
                // The sender lives in our queue slot and is dropped only
                // after a grant or a cancel; with no deadline armed,
                // nothing cancels us, so this always resolves as a grant.
                let _ = (&mut admitted).await;
                Ok(())
            }
            Some(limit) => match timeout(limit, &mut admitted).await {
                Ok(_) => Ok(()),
                Err(_) => {
                    let cancelled = self.inner.state.lock().queue.cancel(priority, position);
                    if cancelled {
                        debug!(priority, position, "wait timed out");
                        return Err(WaitTimeout);
                    }
                    // The grant beat the deadline to the lock; honor it.
                    match admitted.try_recv() {
                        Ok(()) => Ok(()),
                        Err(_) => Err(WaitTimeout),
                    }
                }
            },
        }
    }
}

/// Hands a freed slot to the next waiter, skipping callers that dropped
/// their wait before being admitted. Runs with the state lock held; the
/// returned release must be armed after unlocking.
fn grant_next(state: &mut State, window: Duration) -> Option<(u64, Instant)> {
    while let Some(admit) = state.queue.dequeue_highest() {
        if admit.send(()).is_ok() {
            let deadline = Instant::now() + window;
            let id = state.tracker.begin_grant(deadline);
            return Some((id, deadline));
        }
    }
    None
}

/// Schedules the release of one occupied slot at `deadline`.
///
/// On firing, the freed slot is immediately re-occupied by the
/// highest-priority waiter, if any, which schedules its own release in
/// turn; `used_slots` only drops below capacity when nobody is waiting.
fn arm_release(inner: &Arc<Inner>, id: u64, deadline: Instant) {
    let inner = Arc::clone(inner);
    tokio::spawn(async move {
        sleep_until(deadline).await;
        let regrant = {
            let mut state = inner.state.lock();
            state.tracker.finish_release(id);
            trace!(id, "slot released");
            grant_next(&mut state, inner.window)
        };
        if let Some((id, deadline)) = regrant {
            arm_release(&inner, id, deadline);
        }
    });
}
