//! Shared fixtures for unit tests.

use std::sync::Arc;
use std::sync::Mutex;

use crate::ClientKey;
use crate::ElemHooks;
use crate::JobPool;
use crate::MapInfo;
use crate::MatchAchieve;
use crate::MatchAchieveFactory;
use crate::MatchContext;
use crate::MatchElem;
use crate::MatchElemKey;
use crate::MatchQueueKey;
use crate::QueueJob;
use crate::ScoreMatchElemData;
use crate::ScoreMatchGamer;
use crate::SupplyAchieve;
use crate::SupplyAchieveFactory;
use crate::SupplyContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    Enter(MatchQueueKey, MatchElemKey),
    Leave(MatchQueueKey, MatchElemKey, bool),
}

/// Records every enter/leave callback for later assertions.
#[derive(Default)]
pub struct RecordingHooks {
    pub events: Mutex<Vec<HookEvent>>,
}

impl RecordingHooks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn take(&self) -> Vec<HookEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl ElemHooks for RecordingHooks {
    fn on_enter_queue(&self, que_key: MatchQueueKey, elem: &MatchElem) {
        self.events
            .lock()
            .unwrap()
            .push(HookEvent::Enter(que_key, elem.elem_key));
    }

    fn on_leave_queue(&self, que_key: MatchQueueKey, elem: &MatchElem, success: bool) {
        self.events
            .lock()
            .unwrap()
            .push(HookEvent::Leave(que_key, elem.elem_key, success));
    }
}

pub struct NoopHooks;

impl ElemHooks for NoopHooks {
    fn on_enter_queue(&self, _que_key: MatchQueueKey, _elem: &MatchElem) {}
    fn on_leave_queue(&self, _que_key: MatchQueueKey, _elem: &MatchElem, _success: bool) {}
}

/// A Person element carrying a single gamer with the same ID.
pub fn person_elem(elem_id: u64, hooks: Arc<dyn ElemHooks>) -> MatchElem {
    let mut data = ScoreMatchElemData::new();
    data.gamers.push(ScoreMatchGamer {
        gamer_id: elem_id,
        gamer_data: None,
    });
    MatchElem::new(MatchElemKey::person(elem_id), Box::new(data), hooks)
}

/// A Team element carrying one gamer per member ID.
pub fn team_elem(team_id: u64, member_ids: &[u64], hooks: Arc<dyn ElemHooks>) -> MatchElem {
    let mut data = ScoreMatchElemData::new();
    for &gamer_id in member_ids {
        data.gamers.push(ScoreMatchGamer {
            gamer_id,
            gamer_data: None,
        });
    }
    MatchElem::new(MatchElemKey::team(team_id), Box::new(data), hooks)
}

pub fn test_map(map_id: u32, match_total_need: i32) -> MapInfo {
    MapInfo {
        map_id,
        match_total_need,
        match_single_max: match_total_need,
    }
}

pub fn test_client(server_id: u32) -> ClientKey {
    ClientKey { server_id }
}

/// Job pool that captures posted jobs instead of running them, so tests can
/// execute and reconcile them step by step.
#[derive(Default)]
pub struct CapturePool {
    jobs: Mutex<Vec<QueueJob>>,
}

impl CapturePool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn take(&self) -> Vec<QueueJob> {
        std::mem::take(&mut *self.jobs.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }
}

impl JobPool for CapturePool {
    fn post(&self, job: QueueJob) {
        self.jobs.lock().unwrap().push(job);
    }
}

/// Match algorithm that groups every snapshot element.
pub struct TakeAllMatch;

impl MatchAchieve for TakeAllMatch {
    fn do_thread_match(&mut self, ctx: &mut MatchContext) {
        let elems = std::mem::take(&mut ctx.que_elems);
        ctx.que_result.add_group(elems);
    }
}

pub struct TakeAllMatchFactory;

impl MatchAchieveFactory for TakeAllMatchFactory {
    fn create_new(&self) -> Box<dyn MatchAchieve> {
        Box::new(TakeAllMatch)
    }
}

/// Supply algorithm that backfills with the longest-waiting element.
pub struct TakeOneSupply;

impl SupplyAchieve for TakeOneSupply {
    fn do_thread_supply(&mut self, ctx: &mut SupplyContext) {
        if !ctx.que_elems.is_empty() {
            let elem = ctx.que_elems.remove(0);
            ctx.que_result.add_group([elem]);
        }
    }
}

pub struct TakeOneSupplyFactory;

impl SupplyAchieveFactory for TakeOneSupplyFactory {
    fn create_new(&self) -> Box<dyn SupplyAchieve> {
        Box::new(TakeOneSupply)
    }
}
