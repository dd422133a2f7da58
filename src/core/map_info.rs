use serde::Deserialize;
use serde::Serialize;

/// Static matching requirements of one map.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct MapInfo {
    pub map_id: u32,
    /// Total headcount a full match on this map needs
    pub match_total_need: i32,
    /// Maximum headcount of a single group
    pub match_single_max: i32,
}

/// Identity of one serving node (a "client" game server receiving formed
/// matches).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientKey {
    pub server_id: u32,
}

/// Live capacity of one serving node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub cur_player_num: i32,
    pub max_player_num: i32,
}

impl ClientInfo {
    /// Remaining headroom. Admission control dispatches to a node only while
    /// this stays above the target map's total need.
    pub fn hungry(&self) -> i32 {
        self.max_player_num - self.cur_player_num
    }
}

/// A serving node as tracked by the manager: capacity plus the
/// administrative enable flag.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MatchClient {
    pub(crate) key: ClientKey,
    pub(crate) load: ClientInfo,
    pub(crate) not_use: bool,
}

impl MatchClient {
    /// Eligibility is a pure function of current state; no memory of past
    /// scheduling decisions.
    pub(crate) fn can_match(&self) -> bool {
        if self.not_use {
            return false;
        }
        self.load.hungry() > 0
    }
}
