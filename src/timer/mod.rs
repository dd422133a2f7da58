//! Single-shot timer facility for the control thread.
//!
//! Wraps [`DelayQueue`]: `schedule` arms a one-shot entry, `cancel` before
//! expiry fully suppresses it, and `next_expired` yields entries as their
//! deadlines pass. Each entry fires at most once.

use std::task::Poll;
use std::time::Duration;

use tokio_util::time::delay_queue::Key;
use tokio_util::time::DelayQueue;

pub type TimerKey = Key;

pub struct TimerQueue<T> {
    queue: DelayQueue<T>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            queue: DelayQueue::new(),
        }
    }

    pub fn schedule(&mut self, value: T, after: Duration) -> TimerKey {
        self.queue.insert(value, after)
    }

    /// Cancels a scheduled entry. Returns the value if it had not fired yet.
    pub fn cancel(&mut self, key: &TimerKey) -> Option<T> {
        self.queue.try_remove(key).map(|expired| expired.into_inner())
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Waits for the next entry to expire. Pending while the queue is empty;
    /// the control loop re-polls after processing any other event, so
    /// entries scheduled later are picked up.
    pub async fn next_expired(&mut self) -> T {
        futures::future::poll_fn(|cx| match self.queue.poll_expired(cx) {
            Poll::Ready(Some(expired)) => Poll::Ready(expired.into_inner()),
            Poll::Ready(None) => Poll::Pending,
            Poll::Pending => Poll::Pending,
        })
        .await
    }
}
