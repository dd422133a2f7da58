//! One scheduling pass: match hungry serving nodes against eligible queues
//! and dispatch at most one async job per queue.

use std::collections::HashSet;

use tracing::debug;
use tracing::error;

use crate::ClientKey;
use crate::MapInfo;
use crate::MatchJob;
use crate::MatchQueueKey;
use crate::MatchQueueMgr;
use crate::QueueJob;
use crate::SupplyJob;

impl MatchQueueMgr {
    /// Queue keys for one map that are worth a matching attempt (at least
    /// one waiting element or pending backfill).
    fn match_queue_keys_by_map(&self, map_id: u32) -> Vec<MatchQueueKey> {
        self.waiting_queue
            .iter()
            .filter(|(que_key, one_que)| {
                que_key.map_id == map_id && (one_que.elem_len() > 0 || one_que.supply_len() > 0)
            })
            .map(|(que_key, _)| *que_key)
            .collect()
    }

    fn client_hungry(&self, cli_key: ClientKey) -> i32 {
        self.match_client_info
            .get(&cli_key)
            .map(|c| c.load.hungry())
            .unwrap_or(0)
    }

    /// One pass over the hungry list. First-fit over the registered maps (a
    /// known coarse-grained policy), then over that map's eligible queues
    /// while the node's headroom strictly exceeds the map's total need.
    /// Every dispatch provisionally reserves the map's total need against
    /// the node; reconciliation releases it again if the result is rejected.
    pub(crate) fn try_match_once(&mut self) {
        let hungry_list: Vec<ClientKey> = self
            .match_client_info
            .values()
            .filter(|c| c.can_match())
            .map(|c| c.key)
            .collect();
        if hungry_list.is_empty() {
            return;
        }

        // queues already dispatched this pass; a second hungry node must not
        // retry the same busy queue
        let mut matched_que: HashSet<MatchQueueKey> = HashSet::new();
        for one_hungry in hungry_list {
            let Some(can_match_map) = self
                .maps_info
                .values()
                .find(|a_map| self.client_hungry(one_hungry) > a_map.match_total_need)
                .copied()
            else {
                continue;
            };
            let que_keys = self.match_queue_keys_by_map(can_match_map.map_id);
            for que_key in que_keys {
                if self.client_hungry(one_hungry) <= can_match_map.match_total_need {
                    break;
                }
                if self.try_match_one_queue(que_key, one_hungry, &can_match_map, &mut matched_que) {
                    if let Some(client) = self.match_client_info.get_mut(&one_hungry) {
                        client.load.cur_player_num += can_match_map.match_total_need;
                    }
                }
            }
        }
    }

    /// Attempts one dispatch for one (queue, node) pair. Pending backfill
    /// requests take priority over fresh matches. Returns true when a job
    /// went out (and capacity should be reserved).
    fn try_match_one_queue(
        &mut self,
        que_key: MatchQueueKey,
        cli_key: ClientKey,
        one_map: &MapInfo,
        matched_que: &mut HashSet<MatchQueueKey>,
    ) -> bool {
        if matched_que.contains(&que_key) {
            // already handled this pass
            return false;
        }
        let (in_match, has_supply) = match self.waiting_queue.get(&que_key) {
            Some(one_que) => (one_que.in_match, one_que.has_supply()),
            None => return false,
        };
        if in_match {
            // the previous job has not reconciled yet; note the queue as
            // handled so later hungry nodes skip it outright this pass
            matched_que.insert(que_key);
            return false;
        }
        if has_supply {
            let achieve = match self.find_supply_achieve(que_key.match_strategy) {
                Some(factory) => factory.create_new(),
                None => {
                    error!(
                        "<queue_match> no supply strategy={} achieve.",
                        que_key.match_strategy
                    );
                    return false;
                }
            };
            let match_que = self
                .waiting_queue
                .get_mut(&que_key)
                .expect("queue checked above");
            let Some(sup_info) = match_que.pop_supply() else {
                return false;
            };
            let que_elems = match_que.copy_can_match_elems();
            if que_elems.is_empty() {
                debug!(
                    "<queue_match> supply uuid={} dropped, queue {:?} has no waiting elems",
                    sup_info.supply_uuid, que_key
                );
                return false;
            }
            match_que.in_match = true;
            matched_que.insert(que_key);
            let job = SupplyJob::new(
                achieve,
                cli_key,
                one_map.match_total_need,
                que_key,
                *one_map,
                sup_info,
                que_elems,
            );
            self.job_pool().post(QueueJob::Supply(job));
            return true;
        }

        let achieve = match self.find_match_achieve(que_key.match_strategy) {
            Some(factory) => factory.create_new(),
            None => {
                error!(
                    "<queue_match> no match strategy={} achieve.",
                    que_key.match_strategy
                );
                return false;
            }
        };
        let match_que = self
            .waiting_queue
            .get_mut(&que_key)
            .expect("queue checked above");
        let que_elems = match_que.copy_can_match_elems();
        if que_elems.is_empty() {
            return false;
        }
        match_que.in_match = true;
        matched_que.insert(que_key);
        let job = MatchJob::new(
            achieve,
            cli_key,
            one_map.match_total_need,
            que_key,
            *one_map,
            que_elems,
        );
        self.job_pool().post(QueueJob::Match(job));
        true
    }
}
