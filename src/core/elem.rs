use std::fmt;
use std::fmt::Debug;
use std::sync::Arc;
use std::time::Instant;

#[cfg(test)]
use mockall::automock;

use crate::MatchQueueKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MatchElemType {
    Person,
    Team,
}

/// Identity of one matchable unit. Globally unique per type+ID pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchElemKey {
    pub elem_type: MatchElemType,
    pub elem_id: u64,
}

impl MatchElemKey {
    pub fn person(elem_id: u64) -> Self {
        Self {
            elem_type: MatchElemType::Person,
            elem_id,
        }
    }

    pub fn team(elem_id: u64) -> Self {
        Self {
            elem_type: MatchElemType::Team,
            elem_id,
        }
    }
}

/// Opaque payload carried by a waiting element.
///
/// Async jobs operate on deep copies of the queue state, so the payload must
/// be clonable; the scheduler additionally needs the member headcount for
/// capacity accounting and the member IDs for team index maintenance.
pub trait ElemData: Send {
    fn clone_box(&self) -> Box<dyn ElemData>;
    fn gamer_num(&self) -> usize;
    fn gamer_ids(&self) -> Vec<u64>;
}

/// Lifecycle callbacks invoked by the manager when an element enters or
/// leaves a queue. `success` on leave distinguishes a committed match from a
/// cancellation or re-entry.
#[cfg_attr(test, automock)]
pub trait ElemHooks: Send + Sync {
    fn on_enter_queue(&self, que_key: MatchQueueKey, elem: &MatchElem);
    fn on_leave_queue(&self, que_key: MatchQueueKey, elem: &MatchElem, success: bool);
}

/// One waiting unit: a person or a team plus its opaque payload.
pub struct MatchElem {
    pub elem_key: MatchElemKey,
    pub start_time: Instant,
    pub elem_data: Box<dyn ElemData>,
    pub(crate) hooks: Arc<dyn ElemHooks>,
}

impl MatchElem {
    pub fn new(elem_key: MatchElemKey, elem_data: Box<dyn ElemData>, hooks: Arc<dyn ElemHooks>) -> Self {
        Self {
            elem_key,
            start_time: Instant::now(),
            elem_data,
            hooks,
        }
    }

    /// Seconds this element has been waiting since enqueue.
    pub fn wait_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Every key this element occupies in the reverse index. A team expands
    /// to its own key plus one Person key per member, so a team and any of
    /// its members can never sit in two different queues at once.
    pub(crate) fn all_type_keys(&self) -> Vec<MatchElemKey> {
        let mut keys = vec![self.elem_key];
        if self.elem_key.elem_type == MatchElemType::Team {
            for gamer_id in self.elem_data.gamer_ids() {
                keys.push(MatchElemKey::person(gamer_id));
            }
        }
        keys
    }

    /// Deep copy handed to async jobs so the pluggable algorithm never sees
    /// live queue state.
    pub(crate) fn deep_clone(&self) -> MatchElem {
        MatchElem {
            elem_key: self.elem_key,
            start_time: self.start_time,
            elem_data: self.elem_data.clone_box(),
            hooks: self.hooks.clone(),
        }
    }
}

impl Debug for MatchElem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchElem")
            .field("elem_key", &self.elem_key)
            .field("gamer_num", &self.elem_data.gamer_num())
            .field("wait_seconds", &self.wait_seconds())
            .finish()
    }
}

// ------------------------- stock ElemData impls --------------------------

/// Per-gamer extension data for score matching, supplied by the business
/// layer.
pub trait ScoreMatchGamerExt: Send {
    fn clone_box(&self) -> Box<dyn ScoreMatchGamerExt>;
}

pub struct ScoreMatchGamer {
    pub gamer_id: u64,
    pub gamer_data: Option<Box<dyn ScoreMatchGamerExt>>,
}

impl Clone for ScoreMatchGamer {
    fn clone(&self) -> Self {
        Self {
            gamer_id: self.gamer_id,
            gamer_data: self.gamer_data.as_ref().map(|d| d.clone_box()),
        }
    }
}

/// Stock payload: a roster of gamers, usable for both Person (single entry)
/// and Team (one entry per member) elements.
#[derive(Default, Clone)]
pub struct ScoreMatchElemData {
    pub gamers: Vec<ScoreMatchGamer>,
}

impl ScoreMatchElemData {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ElemData for ScoreMatchElemData {
    fn clone_box(&self) -> Box<dyn ElemData> {
        Box::new(self.clone())
    }

    fn gamer_num(&self) -> usize {
        self.gamers.len()
    }

    fn gamer_ids(&self) -> Vec<u64> {
        self.gamers.iter().map(|g| g.gamer_id).collect()
    }
}
