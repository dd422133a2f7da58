use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::fmt::Debug;

use tracing::debug;

use crate::MatchElem;
use crate::MatchElemKey;

/// Matching strategy IDs. 0 is the reserved "none" value; registration of an
/// algorithm under it is always rejected.
pub const MATCH_STRATEGY_NONE: u32 = 0;
/// Headcount-only matching, no score constraints.
pub const MATCH_STRATEGY_NORMAL: u32 = 1;

/// Identifies one logical waiting line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MatchQueueKey {
    pub map_id: u32,
    pub match_strategy: u32,
}

/// A backfill request: add participants into an already-running session
/// instead of forming a new one. `supply_uuid` is the dedup/identity key.
pub struct SupplyInfo {
    pub info_data: Option<Box<dyn Any + Send>>,
    pub supply_uuid: u64,
}

impl SupplyInfo {
    pub fn new(supply_uuid: u64) -> Self {
        Self {
            info_data: None,
            supply_uuid,
        }
    }
}

impl Debug for SupplyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupplyInfo")
            .field("supply_uuid", &self.supply_uuid)
            .finish()
    }
}

/// One waiting line: ordered waiting elements plus ordered pending backfill
/// requests. `in_match` gives mutual exclusion against the worker pool — at
/// most one outstanding async job per queue.
pub(crate) struct MatchQueue {
    pub(crate) in_match: bool,
    match_elems: Vec<MatchElem>,
    supply_infos: Vec<SupplyInfo>,
    supply_set: HashSet<u64>,
}

impl MatchQueue {
    pub(crate) fn new() -> Self {
        Self {
            in_match: false,
            match_elems: Vec::new(),
            supply_infos: Vec::new(),
            supply_set: HashSet::new(),
        }
    }

    pub(crate) fn elem_len(&self) -> usize {
        self.match_elems.len()
    }

    pub(crate) fn supply_len(&self) -> usize {
        self.supply_infos.len()
    }

    pub(crate) fn find_match_idx(&self, elem_key: MatchElemKey) -> Option<usize> {
        self.match_elems.iter().position(|e| e.elem_key == elem_key)
    }

    pub(crate) fn elem_at(&self, idx: usize) -> &MatchElem {
        &self.match_elems[idx]
    }

    pub(crate) fn add_match(&mut self, elem: MatchElem) {
        self.match_elems.push(elem);
    }

    pub(crate) fn remove_match(&mut self, idx: usize) -> MatchElem {
        self.match_elems.remove(idx)
    }

    pub(crate) fn has_supply(&self) -> bool {
        !self.supply_infos.is_empty()
    }

    /// Queue a backfill request. A repeated UUID replaces the prior entry and
    /// moves it to the back of the line. Returns true when an existing entry
    /// was replaced.
    pub(crate) fn add_supply(&mut self, info: SupplyInfo) -> bool {
        let replaced = if self.supply_set.contains(&info.supply_uuid) {
            self.supply_infos.retain(|s| s.supply_uuid != info.supply_uuid);
            true
        } else {
            self.supply_set.insert(info.supply_uuid);
            false
        };
        self.supply_infos.push(info);
        replaced
    }

    /// Pop the oldest pending backfill request.
    pub(crate) fn pop_supply(&mut self) -> Option<SupplyInfo> {
        if self.supply_infos.is_empty() {
            return None;
        }
        let first_supply = self.supply_infos.remove(0);
        self.supply_set.remove(&first_supply.supply_uuid);

        debug!("pop_supply, UUID={}", first_supply.supply_uuid);
        Some(first_supply)
    }

    pub(crate) fn del_supply(&mut self, supply_uuid: u64) -> bool {
        if !self.supply_set.remove(&supply_uuid) {
            return false;
        }
        if let Some(idx) = self.supply_infos.iter().position(|s| s.supply_uuid == supply_uuid) {
            debug!("del_supply, UUID={}", supply_uuid);
            self.supply_infos.remove(idx);
            return true;
        }
        false
    }

    /// Deep-copy of the waiting elements, handed to an async job as its
    /// private snapshot.
    pub(crate) fn copy_can_match_elems(&self) -> Vec<MatchElem> {
        self.match_elems.iter().map(|e| e.deep_clone()).collect()
    }
}
