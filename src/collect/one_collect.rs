use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use super::CollectEvents;
use crate::TimerKey;

/// Per-participant vote state. Transitions out of `Unknown` are terminal;
/// votes are not revocable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    Unknown,
    Accept,
    Refuse,
}

/// How a session stands after a resolution scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CollectOutcome {
    Pending,
    Success,
    Failed(u64),
}

struct CollectDetail {
    result: VoteState,
    #[allow(dead_code)]
    ex_data: Option<Box<dyn Any + Send>>,
}

/// One confirmation round: a fixed set of participant keys voting
/// accept/refuse on a single proposal.
pub(crate) struct OneCollect {
    pub(crate) events: Arc<dyn CollectEvents>,
    coll_id: u32,
    coll_info: HashMap<u64, CollectDetail>,
    pub(crate) timeout: TimerKey,
}

impl OneCollect {
    pub(crate) fn new(coll_id: u32, timeout: TimerKey, events: Arc<dyn CollectEvents>) -> Self {
        Self {
            events,
            coll_id,
            coll_info: HashMap::new(),
            timeout,
        }
    }

    /// Registers a participant key. Ignored if already present. Keys added
    /// after votes started arriving do not retroactively protect against a
    /// resolution decision already taken.
    pub(crate) fn add_one_collect(&mut self, key: u64, ex_data: Option<Box<dyn Any + Send>>) {
        self.coll_info.entry(key).or_insert(CollectDetail {
            result: VoteState::Unknown,
            ex_data,
        });
    }

    pub(crate) fn del_one_collect(&mut self, key: u64) {
        self.coll_info.remove(&key);
    }

    /// Records one vote and notifies the owner. Returns false if the key is
    /// unknown or has already voted (votes are terminal per key).
    pub(crate) fn collect_one(&mut self, key: u64, accept: bool) -> bool {
        let Some(detail) = self.coll_info.get_mut(&key) else {
            return false;
        };
        if detail.result != VoteState::Unknown {
            warn!(
                "collect_one ignored, coll_id={}, key={} already voted {:?}",
                self.coll_id, key, detail.result
            );
            return false;
        }
        detail.result = if accept { VoteState::Accept } else { VoteState::Refuse };
        self.events.on_collect_one(self.coll_id, key, accept);
        true
    }

    /// Resolution scan: any single Refuse is terminal failure, all-Accept is
    /// success, anything else stays pending. Iteration order does not affect
    /// the verdict, only which refusing key gets named.
    pub(crate) fn check_collect_over(&self) -> CollectOutcome {
        let mut outcome = CollectOutcome::Success;
        for (key, detail) in &self.coll_info {
            match detail.result {
                VoteState::Refuse => return CollectOutcome::Failed(*key),
                VoteState::Unknown => outcome = CollectOutcome::Pending,
                VoteState::Accept => {}
            }
        }
        if self.coll_info.is_empty() {
            // no keys registered yet; keep waiting
            return CollectOutcome::Pending;
        }
        outcome
    }

    /// Arbitrary key that has not reached Accept, blamed on timeout.
    /// Selection among ties is unspecified; callers must not rely on it.
    /// A session with no registered keys yields the sentinel key 0.
    pub(crate) fn pick_non_accepting(&self) -> u64 {
        self.coll_info
            .iter()
            .find(|(_, detail)| detail.result != VoteState::Accept)
            .map(|(key, _)| *key)
            .unwrap_or(0)
    }

    pub(crate) fn vote_state(&self, key: u64) -> Option<VoteState> {
        self.coll_info.get(&key).map(|d| d.result)
    }
}
