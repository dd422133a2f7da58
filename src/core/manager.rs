use std::collections::BTreeMap;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::ClientInfo;
use crate::ClientKey;
use crate::JobPool;
use crate::MapInfo;
use crate::MatchAchieveFactory;
use crate::MatchClient;
use crate::MatchElem;
use crate::MatchElemKey;
use crate::MatchError;
use crate::MatchJob;
use crate::MatchQueue;
use crate::MatchQueueConfig;
use crate::MatchQueueKey;
use crate::MatchResult;
use crate::QueueJob;
use crate::Result;
use crate::SupplyAchieveFactory;
use crate::SupplyInfo;
use crate::SupplyJob;
use crate::MATCH_STRATEGY_NONE;

/// Business-layer hook invoked on the control thread once a computed result
/// has survived re-validation. Returning false vetoes the result: the queue
/// is freed, the result discarded, no element removed.
#[cfg_attr(test, automock)]
pub trait MatchSuccess: Send + Sync {
    fn match_success(&self, result: &MatchResult, client_key: ClientKey, map_info: &MapInfo) -> bool;
    fn supply_success(&self, result: &MatchResult, supply_info: &SupplyInfo) -> bool;
}

/// The match queue manager: owns the keyed waiting queues, the reverse index
/// from element key to queue, serving-node capacity bookkeeping, and the
/// strategy registries. All methods run on the single control thread.
pub struct MatchQueueMgr {
    pub(crate) base_cfg: MatchQueueConfig,
    tick_total: i64,
    pub(crate) waiting_queue: HashMap<MatchQueueKey, MatchQueue>,
    elem2match_queue: HashMap<MatchElemKey, MatchQueueKey>,
    // BTreeMap keeps pass iteration deterministic; the first-fit policy is
    // order-dependent
    pub(crate) match_client_info: BTreeMap<ClientKey, MatchClient>,
    pub(crate) maps_info: BTreeMap<u32, MapInfo>,
    job_pool: Option<Arc<dyn JobPool>>,
    pub(crate) success_do: Arc<dyn MatchSuccess>,
    match_ext_achieve: HashMap<u32, Arc<dyn MatchAchieveFactory>>,
    supply_ext_achieve: HashMap<u32, Arc<dyn SupplyAchieveFactory>>,
}

impl MatchQueueMgr {
    pub fn new(success_do: Arc<dyn MatchSuccess>) -> Self {
        Self::with_config(MatchQueueConfig::default(), success_do)
    }

    pub fn with_config(base_cfg: MatchQueueConfig, success_do: Arc<dyn MatchSuccess>) -> Self {
        Self {
            base_cfg,
            tick_total: 0,
            waiting_queue: HashMap::new(),
            elem2match_queue: HashMap::new(),
            match_client_info: BTreeMap::new(),
            maps_info: BTreeMap::new(),
            job_pool: None,
            success_do,
            match_ext_achieve: HashMap::new(),
            supply_ext_achieve: HashMap::new(),
        }
    }

    /// Must be attached before the first `run` tick.
    pub fn attach_job_pool(&mut self, pool: Arc<dyn JobPool>) {
        self.job_pool = Some(pool);
    }

    pub(crate) fn job_pool(&self) -> &Arc<dyn JobPool> {
        self.job_pool.as_ref().expect("MatchQueueMgr has no job pool attached")
    }

    // ------------------------- queue membership -------------------------

    /// Moves the element into the target queue. The element (and, for a
    /// team, every member) is first removed from any queue it currently
    /// occupies, then appended and indexed; `on_enter_queue` fires last.
    pub fn enter_wait_queue(&mut self, que_key: MatchQueueKey, elem: MatchElem) {
        // leave first so a re-entry can never trip the one-queue invariant
        for key in elem.all_type_keys() {
            self.leave_queue(key, false);
        }
        self.push(que_key, elem);
    }

    fn push(&mut self, que_key: MatchQueueKey, elem: MatchElem) {
        if self.elem2match_queue.contains_key(&elem.elem_key) {
            panic!("MatchElem {:?} already indexed in a match queue", elem.elem_key);
        }
        let elem_key = elem.elem_key;
        let match_que = self.waiting_queue.entry(que_key).or_insert_with(MatchQueue::new);
        match_que.add_match(elem);
        let idx = match_que.elem_len() - 1;
        self.elem2match_queue.insert(elem_key, que_key);

        let elem_ref = self.waiting_queue[&que_key].elem_at(idx);
        elem_ref.hooks.on_enter_queue(que_key, elem_ref);
        info!("<queue_match> enter queue: key={:?}, elem={:?}", que_key, elem_ref);
    }

    /// Removes the element from its current queue, firing `on_leave_queue`
    /// with the given success flag. Returns false if the key is not queued.
    pub fn leave_queue(&mut self, elem_key: MatchElemKey, success: bool) -> bool {
        let Some(que_key) = self.elem2match_queue.get(&elem_key).copied() else {
            return false;
        };
        if let Some(match_que) = self.waiting_queue.get_mut(&que_key) {
            if let Some(idx) = match_que.find_match_idx(elem_key) {
                let elem = match_que.remove_match(idx);
                elem.hooks.on_leave_queue(que_key, &elem, success);
                info!(
                    "<queue_match> leave queue: que_key={:?}, elem={:?}, success={}",
                    que_key, elem, success
                );
            }
        }
        self.elem2match_queue.remove(&elem_key);
        true
    }

    /// O(1) reverse lookup of a waiting element.
    ///
    /// Panics if the reverse index points at a queue that no longer holds
    /// the key — the index and the queues are mutated together on the
    /// control thread, so a divergence is a logic bug.
    pub fn find_match_elem(&self, elem_key: MatchElemKey) -> Option<(&MatchElem, MatchQueueKey)> {
        let que_key = *self.elem2match_queue.get(&elem_key)?;
        let match_que = self.waiting_queue.get(&que_key)?;
        let idx = match_que
            .find_match_idx(elem_key)
            .unwrap_or_else(|| panic!("match index inconsistent: {:?} indexed to {:?} but absent", elem_key, que_key));
        Some((match_que.elem_at(idx), que_key))
    }

    // ------------------------- backfill requests -------------------------

    /// Queues a backfill request, deduplicated by UUID: a repeated UUID
    /// replaces the prior entry and moves it to the back.
    pub fn add_sub_world_supply(&mut self, que_key: MatchQueueKey, info: SupplyInfo) -> bool {
        let match_que = self.waiting_queue.entry(que_key).or_insert_with(MatchQueue::new);
        let replaced = match_que.add_supply(info);
        info!(
            "<queue_match> require supply: que_key={:?}, replaced={}",
            que_key, replaced
        );
        true
    }

    pub fn del_sub_world_supply(&mut self, que_key: MatchQueueKey, supply_uuid: u64) -> bool {
        let Some(match_que) = self.waiting_queue.get_mut(&que_key) else {
            return false;
        };
        let ret = match_que.del_supply(supply_uuid);
        if ret {
            info!(
                "<queue_match> delete supply: que_key={:?}, uuid={}",
                que_key, supply_uuid
            );
        }
        ret
    }

    // ------------------------- administration -------------------------

    pub fn update_match_map(&mut self, info: MapInfo) {
        self.maps_info.insert(info.map_id, info);
    }

    /// Capacity entry for a serving node, created lazily with zero capacity.
    pub fn client_info_mut(&mut self, client_key: ClientKey) -> &mut ClientInfo {
        let client = self
            .match_client_info
            .entry(client_key)
            .or_insert_with(|| MatchClient {
                key: client_key,
                load: ClientInfo::default(),
                not_use: false,
            });
        &mut client.load
    }

    pub fn client_info(&self, client_key: ClientKey) -> Option<ClientInfo> {
        self.match_client_info.get(&client_key).map(|c| c.load)
    }

    /// Administratively enable/disable a node; effective on the next
    /// scheduling pass.
    pub fn set_client_use(&mut self, client_key: ClientKey, not_use: bool) {
        if let Some(client) = self.match_client_info.get_mut(&client_key) {
            client.not_use = not_use;
        }
    }

    pub fn foreach_client(&self, mut run: impl FnMut(ClientKey, ClientInfo, bool)) {
        for client in self.match_client_info.values() {
            run(client.key, client.load, client.not_use);
        }
    }

    // ------------------------- strategy registry -------------------------

    /// Registers a match algorithm factory under a strategy ID. The reserved
    /// "none" ID and IDs already carrying a registration are rejected.
    pub fn register_match_achieve(
        &mut self,
        strategy: u32,
        achieve: Arc<dyn MatchAchieveFactory>,
    ) -> Result<()> {
        if strategy <= MATCH_STRATEGY_NONE {
            error!("register_match_achieve strategy={} is reserved", strategy);
            return Err(MatchError::ReservedStrategy(strategy).into());
        }
        if self.match_ext_achieve.contains_key(&strategy) {
            error!("register_match_achieve strategy={} already registered", strategy);
            return Err(MatchError::DuplicateStrategy(strategy).into());
        }
        self.match_ext_achieve.insert(strategy, achieve);
        Ok(())
    }

    pub fn register_supply_achieve(
        &mut self,
        strategy: u32,
        achieve: Arc<dyn SupplyAchieveFactory>,
    ) -> Result<()> {
        if strategy <= MATCH_STRATEGY_NONE {
            error!("register_supply_achieve strategy={} is reserved", strategy);
            return Err(MatchError::ReservedStrategy(strategy).into());
        }
        if self.supply_ext_achieve.contains_key(&strategy) {
            error!("register_supply_achieve strategy={} already registered", strategy);
            return Err(MatchError::DuplicateStrategy(strategy).into());
        }
        self.supply_ext_achieve.insert(strategy, achieve);
        Ok(())
    }

    pub(crate) fn find_match_achieve(&self, strategy: u32) -> Option<&Arc<dyn MatchAchieveFactory>> {
        self.match_ext_achieve.get(&strategy)
    }

    pub(crate) fn find_supply_achieve(&self, strategy: u32) -> Option<&Arc<dyn SupplyAchieveFactory>> {
        self.supply_ext_achieve.get(&strategy)
    }

    // ------------------------- scheduling tick -------------------------

    /// Advances the tick counter; every `show_match_tick_gap` ticks logs a
    /// summary of non-empty queues and every `match_tick_gap` ticks runs one
    /// scheduling pass.
    ///
    /// Panics on the first tick if no job pool has been attached.
    pub fn run(&mut self, _delta: i64) {
        if self.tick_total == 0 && self.job_pool.is_none() {
            panic!("MatchQueueMgr init fail, no job pool");
        }
        self.tick_total += 1;
        if self.tick_total % self.base_cfg.show_match_tick_gap == 0 {
            let mut buff = String::new();
            for (que_key, one_que) in &self.waiting_queue {
                if one_que.elem_len() > 0 || one_que.supply_len() > 0 {
                    let _ = write!(
                        buff,
                        "\n\t\t\t<map={}, strategy={}> queue_num={}, supply_num={}",
                        que_key.map_id,
                        que_key.match_strategy,
                        one_que.elem_len(),
                        one_que.supply_len()
                    );
                }
            }
            if !buff.is_empty() {
                info!("<queue_match> state: {}", buff);
            }
        }
        if self.tick_total % self.base_cfg.match_tick_gap != 0 {
            return;
        }
        self.try_match_once();
    }

    // ------------------------- reconciliation -------------------------

    /// Applies one completed job against live queue state. Runs on the
    /// control thread, never concurrently with a scheduling pass.
    pub fn on_job_complete(&mut self, job: QueueJob) {
        match job {
            QueueJob::Match(job) => self.complete_match_job(job),
            QueueJob::Supply(job) => self.complete_supply_job(job),
        }
    }

    fn complete_match_job(&mut self, job: MatchJob) {
        let Some(match_que) = self.waiting_queue.get_mut(&job.ctx.que_key) else {
            error!("<queue_match> match return no que_key={:?}", job.ctx.que_key);
            self.release_reservation(job.cli_key, job.reserved);
            return;
        };
        match_que.in_match = false;
        if job.ctx.que_result.is_empty() {
            self.release_reservation(job.cli_key, job.reserved);
            return;
        }
        if !self.all_result_elems_exist(&job.ctx.que_result) {
            warn!(
                "<queue_match> ghost match discarded: que_key={:?}",
                job.ctx.que_key
            );
            self.release_reservation(job.cli_key, job.reserved);
            return;
        }
        if !self
            .success_do
            .match_success(&job.ctx.que_result, job.cli_key, &job.ctx.que_map)
        {
            self.release_reservation(job.cli_key, job.reserved);
            return;
        }
        info!("<queue_match> match success que_key={:?}, result:", job.ctx.que_key);
        for (elem_idx, one_elem) in job.ctx.que_result.groups.iter().enumerate() {
            info!("\t<queue_match> elem_idx={}, elem={:?}", elem_idx, one_elem);
        }
        for one_elem in &job.ctx.que_result.groups {
            self.leave_queue(one_elem.elem_key, true);
        }
    }

    fn complete_supply_job(&mut self, job: SupplyJob) {
        let Some(match_que) = self.waiting_queue.get_mut(&job.ctx.que_key) else {
            error!("<queue_match> supply return no que_key={:?}", job.ctx.que_key);
            self.release_reservation(job.cli_key, job.reserved);
            return;
        };
        match_que.in_match = false;
        if job.ctx.que_result.is_empty() {
            self.release_reservation(job.cli_key, job.reserved);
            return;
        }
        if !self.all_result_elems_exist(&job.ctx.que_result) {
            warn!(
                "<queue_match> ghost supply discarded: que_key={:?}",
                job.ctx.que_key
            );
            self.release_reservation(job.cli_key, job.reserved);
            return;
        }
        if !self
            .success_do
            .supply_success(&job.ctx.que_result, &job.ctx.sup_info)
        {
            self.release_reservation(job.cli_key, job.reserved);
            return;
        }
        info!(
            "<queue_match> supply success que_key={:?}, uuid={}, result:",
            job.ctx.que_key, job.ctx.sup_info.supply_uuid
        );
        for (elem_idx, one_elem) in job.ctx.que_result.groups.iter().enumerate() {
            info!("\t<queue_match> elem_idx={}, elem={:?}", elem_idx, one_elem);
        }
        for one_elem in &job.ctx.que_result.groups {
            self.leave_queue(one_elem.elem_key, true);
        }
    }

    /// Re-validation against the live reverse index: a result holding any
    /// element that left the system while the job computed is stale ("ghost
    /// match") and must be discarded wholesale, never partially committed.
    fn all_result_elems_exist(&self, result: &MatchResult) -> bool {
        result
            .groups
            .iter()
            .all(|one_elem| self.find_match_elem(one_elem.elem_key).is_some())
    }

    /// Hands back capacity reserved at dispatch time when the result was not
    /// committed (empty, ghost, vetoed, or the queue vanished).
    pub(crate) fn release_reservation(&mut self, cli_key: ClientKey, reserved: i32) {
        if let Some(client) = self.match_client_info.get_mut(&cli_key) {
            client.load.cur_player_num -= reserved;
        }
    }

    // ------------------------- metrics getters -------------------------

    /// Total currently-queued elements across all queues.
    pub fn queued_total(&self) -> usize {
        self.waiting_queue.values().map(|q| q.elem_len()).sum()
    }

    /// Total currently-pending backfill requests across all queues.
    pub fn supply_total(&self) -> usize {
        self.waiting_queue.values().map(|q| q.supply_len()).sum()
    }
}
