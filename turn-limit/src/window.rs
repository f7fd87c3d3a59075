use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::time::Duration;

use tokio::time::Instant;

/// Tracks how many grants currently occupy the admission window and when
/// each occupied slot is due to be released.
///
/// The tracker only does the bookkeeping; arming the release timers is
/// the limiter's job, since that requires a runtime handle.
#[derive(Debug)]
pub(crate) struct WindowTracker {
    capacity: usize,
    in_flight: usize,
    next_release_id: u64,
    pending: BTreeMap<u64, Instant>,
}

impl WindowTracker {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            capacity: capacity.get(),
            in_flight: 0,
            next_release_id: 0,
            pending: BTreeMap::new(),
        }
    }

    pub(crate) fn has_capacity(&self) -> bool {
        self.in_flight < self.capacity
    }

    /// Occupies one slot until `deadline` and returns the id the matching
    /// release must report back with.
    pub(crate) fn begin_grant(&mut self, deadline: Instant) -> u64 {
        debug_assert!(self.has_capacity());
        let id = self.next_release_id;
        self.next_release_id += 1;
        self.in_flight += 1;
        self.pending.insert(id, deadline);
        id
    }

    /// Frees the slot occupied by grant `id`.
    pub(crate) fn finish_release(&mut self, id: u64) {
        if self.pending.remove(&id).is_some() {
            self.in_flight -= 1;
        }
    }

    pub(crate) fn used_slots(&self) -> usize {
        self.in_flight
    }

    /// Time until the earliest occupied slot frees, floored at zero.
    ///
    /// Zero also covers the spare-capacity case, where an admission is
    /// possible right now without waiting for any release.
    pub(crate) fn time_until_next_release(&self, now: Instant) -> Duration {
        if self.has_capacity() {
            return Duration::ZERO;
        }
        self.pending
            .values()
            .map(|deadline| deadline.saturating_duration_since(now))
            .min()
            .unwrap_or(Duration::ZERO)
    }
}
