use std::collections::BTreeMap;

use tokio::sync::oneshot;

/// One FIFO lane of waiters sharing a single priority value.
///
/// Positions are handed out from a monotonic counter and never reused, so
/// a position stays valid for cancellation no matter how many neighbours
/// leave the lane first. The map stays sorted by position, which makes
/// index order the admission order.
#[derive(Debug, Default)]
struct Lane {
    next_position: u64,
    slots: BTreeMap<u64, oneshot::Sender<()>>,
}

/// Waiting callers grouped by priority, FIFO within each priority.
///
/// Lanes are created on first use and deleted the moment they empty, so
/// the highest active priority is always the last key of the map and is
/// resolvable in time proportional to the number of distinct priorities.
#[derive(Debug, Default)]
pub(crate) struct WaitQueue {
    lanes: BTreeMap<i64, Lane>,
}

impl WaitQueue {
    /// Appends a waiter to the tail of its priority's lane and returns
    /// the position needed to cancel it later.
    pub(crate) fn enqueue(&mut self, priority: i64, admit: oneshot::Sender<()>) -> u64 {
        let lane = self.lanes.entry(priority).or_default();
        let position = lane.next_position;
        lane.next_position += 1;
        lane.slots.insert(position, admit);
        position
    }

    /// Removes and returns the earliest-enqueued waiter at the highest
    /// active priority.
    pub(crate) fn dequeue_highest(&mut self) -> Option<oneshot::Sender<()>> {
        let (&priority, lane) = self.lanes.iter_mut().next_back()?;
        let admit = lane
            .slots
            .pop_first()
            .map(|(_, admit)| admit)
            .expect("empty lanes are deleted eagerly");
        let emptied = lane.slots.is_empty();
        if emptied {
            self.lanes.remove(&priority);
        }
        Some(admit)
    }

    /// Removes the waiter at `position` if it is still queued.
    ///
    /// Idempotent: returns `false` when the waiter was already admitted
    /// or cancelled.
    pub(crate) fn cancel(&mut self, priority: i64, position: u64) -> bool {
        let Some(lane) = self.lanes.get_mut(&priority) else {
            return false;
        };
        let removed = lane.slots.remove(&position).is_some();
        if removed && lane.slots.is_empty() {
            self.lanes.remove(&priority);
        }
        removed
    }

    /// Total number of waiters across all priorities.
    pub(crate) fn len(&self) -> usize {
        self.lanes.values().map(|lane| lane.slots.len()).sum()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lanes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn waiter() -> (oneshot::Sender<()>, oneshot::Receiver<()>) {
        oneshot::channel()
    }

    #[test]
    fn it_dequeues_fifo_within_a_priority() {
        let mut queue = WaitQueue::default();

        let (tx_a, mut rx_a) = waiter();
        let (tx_b, mut rx_b) = waiter();
        queue.enqueue(0, tx_a);
        queue.enqueue(0, tx_b);

        queue.dequeue_highest().unwrap().send(()).unwrap();
        assert!(rx_a.try_recv().is_ok(), "first in should be first out");
        assert!(rx_b.try_recv().is_err());

        queue.dequeue_highest().unwrap().send(()).unwrap();
        assert!(rx_b.try_recv().is_ok());
        assert!(queue.is_empty());
    }

    #[test]
    fn it_prefers_the_highest_priority() {
        let mut queue = WaitQueue::default();

        let (tx_low, mut rx_low) = waiter();
        let (tx_high, mut rx_high) = waiter();
        // Enqueue order is deliberately low-before-high
        queue.enqueue(1, tx_low);
        queue.enqueue(5, tx_high);

        queue.dequeue_highest().unwrap().send(()).unwrap();
        assert!(rx_high.try_recv().is_ok());
        assert!(rx_low.try_recv().is_err());

        // With the priority-5 lane drained, priority 1 is next
        queue.dequeue_highest().unwrap().send(()).unwrap();
        assert!(rx_low.try_recv().is_ok());
    }

    #[test]
    fn it_deletes_emptied_lanes() {
        let mut queue = WaitQueue::default();

        let (tx, _rx) = waiter();
        queue.enqueue(3, tx);
        assert!(!queue.is_empty());

        let _ = queue.dequeue_highest();
        assert!(queue.lanes.is_empty(), "no lingering empty lanes");
        assert!(queue.dequeue_highest().is_none());
    }

    #[test]
    fn cancel_removes_from_the_middle_without_reordering() {
        let mut queue = WaitQueue::default();

        let (tx_a, mut rx_a) = waiter();
        let (tx_b, _rx_b) = waiter();
        let (tx_c, mut rx_c) = waiter();
        queue.enqueue(0, tx_a);
        let position_b = queue.enqueue(0, tx_b);
        queue.enqueue(0, tx_c);

        assert!(queue.cancel(0, position_b));
        assert_eq!(queue.len(), 2);

        queue.dequeue_highest().unwrap().send(()).unwrap();
        assert!(rx_a.try_recv().is_ok());
        queue.dequeue_highest().unwrap().send(()).unwrap();
        assert!(rx_c.try_recv().is_ok());
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut queue = WaitQueue::default();

        let (tx, _rx) = waiter();
        let position = queue.enqueue(0, tx);

        assert!(queue.cancel(0, position));
        assert!(!queue.cancel(0, position));
        assert!(!queue.cancel(42, position));
    }

    #[test]
    fn cancelling_the_last_waiter_retires_the_priority() {
        let mut queue = WaitQueue::default();

        let (tx_high, _rx_high) = waiter();
        let (tx_low, mut rx_low) = waiter();
        let position = queue.enqueue(5, tx_high);
        queue.enqueue(1, tx_low);

        assert!(queue.cancel(5, position));

        // Priority 5 is gone; the next dequeue must come from priority 1
        queue.dequeue_highest().unwrap().send(()).unwrap();
        assert!(rx_low.try_recv().is_ok());
        assert!(queue.is_empty());
    }

    #[test]
    fn len_counts_across_priorities() {
        let mut queue = WaitQueue::default();
        assert_eq!(queue.len(), 0);

        for priority in [0, 0, 3, -2] {
            let (tx, _rx) = waiter();
            queue.enqueue(priority, tx);
        }
        assert_eq!(queue.len(), 4);

        let _ = queue.dequeue_highest();
        assert_eq!(queue.len(), 3);
    }
}
