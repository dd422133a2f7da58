//! Job offload seam between the control thread and the worker pool.
//!
//! The contract is fire-and-forget: `post` must run the job's `execute` off
//! the control thread and deliver the completed job back exactly once. The
//! control thread drains completions at a single point per loop iteration
//! ([`crate::MatchEngine::run`]) and reconciles them in delivery order.

#[cfg(test)]
use mockall::automock;
use tokio::sync::mpsc;
use tracing::error;

use crate::QueueJob;

#[cfg_attr(test, automock)]
pub trait JobPool: Send + Sync {
    fn post(&self, job: QueueJob);
}

/// Worker pool backed by tokio's blocking thread pool. Completed jobs come
/// back over an unbounded channel owned by the control loop.
pub struct TokioJobPool {
    completion_tx: mpsc::UnboundedSender<QueueJob>,
}

impl TokioJobPool {
    /// Returns the pool plus the completion receiver to drain on the
    /// control thread.
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<QueueJob>) {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        (Self { completion_tx }, completion_rx)
    }
}

impl JobPool for TokioJobPool {
    fn post(&self, mut job: QueueJob) {
        let completion_tx = self.completion_tx.clone();
        tokio::task::spawn_blocking(move || {
            job.execute();
            if completion_tx.send(job).is_err() {
                error!("job completion receiver dropped, result lost");
            }
        });
    }
}

#[cfg(test)]
mod worker_test;
