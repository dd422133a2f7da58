//! Dispatch-collect confirmation engine.
//!
//! One collect session is one round of soliciting accept/refuse votes from a
//! fixed set of participants for a single proposal (typically "does everyone
//! accept this formed group?"). A session resolves on unanimity, on the
//! first refusal, or on timeout, and is destroyed exactly once.

mod one_collect;
pub use one_collect::VoteState;
pub(crate) use one_collect::*;

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use tracing::debug;
use tracing::error;

use crate::TimerQueue;

/// Session IDs wrap back to 1 before this bound. Wraparound correctness
/// assumes no session stays live across a full wrap cycle.
pub const COLLECT_ID_WRAP: u32 = 1_000_000_000;

/// Owner-side notifications for one collect session. All callbacks fire on
/// the control thread.
#[cfg_attr(test, automock)]
pub trait CollectEvents: Send + Sync {
    /// One vote arrived (fires for every recorded vote, whatever the final
    /// outcome).
    fn on_collect_one(&self, coll_id: u32, key: u64, accept: bool);
    /// Every registered key voted Accept.
    fn on_collect_success(&self, coll_id: u32);
    /// A key refused, or the timeout fired; `key` names the refusing (or an
    /// arbitrary non-accepting) participant. A session that timed out with
    /// no registered keys names the sentinel key 0.
    fn on_collect_failed(&self, coll_id: u32, key: u64);
}

pub struct DispatchCollectMgr {
    collect_map: HashMap<u32, OneCollect>,
    coll_id_base: u32,
    timeouts: TimerQueue<u32>,
}

impl Default for DispatchCollectMgr {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchCollectMgr {
    pub fn new() -> Self {
        Self {
            collect_map: HashMap::new(),
            coll_id_base: 0,
            timeouts: TimerQueue::new(),
        }
    }

    fn gen_id(&mut self) -> u32 {
        self.coll_id_base += 1;
        if self.coll_id_base >= COLLECT_ID_WRAP {
            self.coll_id_base = 1;
        }
        self.coll_id_base
    }

    fn del_one_collect(&mut self, coll_id: u32, op: &str) {
        debug!("del_one_collect, coll_id={}, op={}", coll_id, op);
        if let Some(coll) = self.collect_map.remove(&coll_id) {
            self.timeouts.cancel(&coll.timeout);
        }
    }

    /// Opens a session with the given timeout and returns its ID. Register
    /// participants with [`add_one_collect`](Self::add_one_collect) before
    /// votes start arriving.
    pub fn create_one_collect(&mut self, timeout: Duration, events: Arc<dyn CollectEvents>) -> u32 {
        let coll_id = self.gen_id();
        let timer_key = self.timeouts.schedule(coll_id, timeout);
        self.collect_map
            .insert(coll_id, OneCollect::new(coll_id, timer_key, events));
        coll_id
    }

    /// Registers a participant key on a pending session.
    pub fn add_one_collect(&mut self, coll_id: u32, key: u64, ex_data: Option<Box<dyn Any + Send>>) -> bool {
        let Some(coll) = self.collect_map.get_mut(&coll_id) else {
            return false;
        };
        coll.add_one_collect(key, ex_data);
        true
    }

    pub fn del_one_collect_key(&mut self, coll_id: u32, key: u64) {
        if let Some(coll) = self.collect_map.get_mut(&coll_id) {
            coll.del_one_collect(key);
        }
    }

    /// Records a vote and evaluates resolution. No-op (returns false) for an
    /// unknown session or key. On resolution the session's timer is
    /// cancelled and the session destroyed.
    pub fn collect_one(&mut self, coll_id: u32, key: u64, accept: bool) -> bool {
        let Some(coll) = self.collect_map.get_mut(&coll_id) else {
            error!(
                "collect_one err, coll_id={}, not exist. key={}, accept={}",
                coll_id, key, accept
            );
            return false;
        };
        if !coll.collect_one(key, accept) {
            return false;
        }
        let outcome = coll.check_collect_over();
        let events = coll.events.clone();
        match outcome {
            CollectOutcome::Pending => {}
            CollectOutcome::Success => {
                events.on_collect_success(coll_id);
                self.del_one_collect(coll_id, "collect one");
            }
            CollectOutcome::Failed(refuse_key) => {
                events.on_collect_failed(coll_id, refuse_key);
                self.del_one_collect(coll_id, "collect one");
            }
        }
        true
    }

    /// Resolves a timed-out session as failed, naming one arbitrary
    /// non-accepting key. Driven by the control loop after
    /// [`next_timeout`](Self::next_timeout) yields.
    pub fn handle_timeout(&mut self, coll_id: u32) {
        let Some(coll) = self.collect_map.get(&coll_id) else {
            return;
        };
        let timeout_key = coll.pick_non_accepting();
        let events = coll.events.clone();
        events.on_collect_failed(coll_id, timeout_key);
        // timer already fired, nothing to cancel
        self.collect_map.remove(&coll_id);
    }

    /// Waits for the next session timeout to fire.
    pub async fn next_timeout(&mut self) -> u32 {
        self.timeouts.next_expired().await
    }

    /// Number of sessions currently pending.
    pub fn count(&self) -> usize {
        self.collect_map.len()
    }

    pub fn vote_state(&self, coll_id: u32, key: u64) -> Option<VoteState> {
        self.collect_map.get(&coll_id)?.vote_state(key)
    }

    #[cfg(test)]
    pub(crate) fn set_id_base(&mut self, base: u32) {
        self.coll_id_base = base;
    }
}
