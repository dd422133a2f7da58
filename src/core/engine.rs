use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::time::interval;
use tokio::time::MissedTickBehavior;
use tracing::warn;

use crate::pull_match_metrics;
use crate::DispatchCollectMgr;
use crate::MatchQueueMgr;
use crate::MatchSuccess;
use crate::QueueJob;
use crate::Result;
use crate::Settings;
use crate::TokioJobPool;

/// Owns the single control task: the match queue manager's tick loop, the
/// completion drain point, and the collect engine's timeout processing. All
/// shared state lives behind `&mut self` of this one task — no locks.
pub struct MatchEngine {
    manager: MatchQueueMgr,
    collector: DispatchCollectMgr,
    completion_rx: mpsc::UnboundedReceiver<QueueJob>,
    shutdown_signal: watch::Receiver<()>,
    tick_interval: Duration,
}

impl MatchEngine {
    pub fn new(
        settings: &Settings,
        success_do: Arc<dyn MatchSuccess>,
        shutdown_signal: watch::Receiver<()>,
    ) -> Self {
        let (pool, completion_rx) = TokioJobPool::unbounded();
        let mut manager = MatchQueueMgr::with_config(settings.match_queue, success_do);
        manager.attach_job_pool(Arc::new(pool));
        Self {
            manager,
            collector: DispatchCollectMgr::new(),
            completion_rx,
            shutdown_signal,
            tick_interval: Duration::from_millis(settings.match_queue.tick_interval_ms),
        }
    }

    pub fn manager(&self) -> &MatchQueueMgr {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut MatchQueueMgr {
        &mut self.manager
    }

    pub fn collector(&self) -> &DispatchCollectMgr {
        &self.collector
    }

    pub fn collector_mut(&mut self) -> &mut DispatchCollectMgr {
        &mut self.collector
    }

    /// Control loop. Completions are reconciled in delivery order at their
    /// own drain point, not inside the scheduling pass.
    pub async fn run(&mut self) -> Result<()> {
        let mut tick = interval(self.tick_interval);
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Use biased to ensure branch order
                biased;
                // P0: shutdown received;
                _ = self.shutdown_signal.changed() => {
                    warn!("[MatchEngine] shutdown signal received.");
                    return Ok(());
                }
                // P1: completed jobs, drained before the next pass can run
                Some(job) = self.completion_rx.recv() => {
                    self.manager.on_job_complete(job);
                }
                // P2: collect session timeouts
                coll_id = self.collector.next_timeout() => {
                    self.collector.handle_timeout(coll_id);
                }
                // P3: tick the scheduler and refresh pull metrics
                _ = tick.tick() => {
                    self.manager.run(1);
                    pull_match_metrics(&self.manager, &self.collector);
                }
            }
        }
    }
}
