//! Async match/backfill jobs.
//!
//! A job snapshots its input at construction (deep-cloned elements, target
//! map, dispatching node) and carries the mutable [`MatchResult`] its
//! pluggable algorithm populates. `execute` runs on a worker thread and must
//! only touch the job's own context; the completed job is delivered back to
//! the control thread, which reconciles it via
//! [`crate::MatchQueueMgr::on_job_complete`].

use crate::ClientKey;
use crate::MapInfo;
use crate::MatchElem;
use crate::MatchQueueKey;
use crate::SupplyInfo;

/// Pluggable matching algorithm. Runs entirely on a worker thread against
/// the job's cloned elements; its only output channel is `ctx.que_result`.
pub trait MatchAchieve: Send {
    fn do_thread_match(&mut self, ctx: &mut MatchContext);
}

/// Pluggable backfill algorithm; same contract as [`MatchAchieve`] with one
/// [`SupplyInfo`] incorporated.
pub trait SupplyAchieve: Send {
    fn do_thread_supply(&mut self, ctx: &mut SupplyContext);
}

/// Creates a fresh algorithm instance per job so no mutable algorithm state
/// is ever shared across jobs.
pub trait MatchAchieveFactory: Send + Sync {
    fn create_new(&self) -> Box<dyn MatchAchieve>;
}

pub trait SupplyAchieveFactory: Send + Sync {
    fn create_new(&self) -> Box<dyn SupplyAchieve>;
}

impl<F> MatchAchieveFactory for F
where F: Fn() -> Box<dyn MatchAchieve> + Send + Sync
{
    fn create_new(&self) -> Box<dyn MatchAchieve> {
        self()
    }
}

impl<F> SupplyAchieveFactory for F
where F: Fn() -> Box<dyn SupplyAchieve> + Send + Sync
{
    fn create_new(&self) -> Box<dyn SupplyAchieve> {
        self()
    }
}

/// Groups produced by one job invocation. Owned exclusively by the job until
/// the control thread commits it.
#[derive(Default)]
pub struct MatchResult {
    pub groups: Vec<MatchElem>,
}

impl MatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn add_group(&mut self, elems: impl IntoIterator<Item = MatchElem>) {
        self.groups.extend(elems);
    }
}

/// The slice of job state a match algorithm may read and write.
pub struct MatchContext {
    pub que_key: MatchQueueKey,
    pub que_map: MapInfo,
    pub que_elems: Vec<MatchElem>,
    pub que_result: MatchResult,
}

pub struct SupplyContext {
    pub que_key: MatchQueueKey,
    pub que_map: MapInfo,
    pub sup_info: SupplyInfo,
    pub que_elems: Vec<MatchElem>,
    pub que_result: MatchResult,
}

pub struct MatchJob {
    achieve: Box<dyn MatchAchieve>,
    pub(crate) cli_key: ClientKey,
    /// Capacity provisionally reserved against the dispatching node,
    /// released again if the result is not committed
    pub(crate) reserved: i32,
    pub ctx: MatchContext,
}

impl MatchJob {
    pub(crate) fn new(
        achieve: Box<dyn MatchAchieve>,
        cli_key: ClientKey,
        reserved: i32,
        que_key: MatchQueueKey,
        que_map: MapInfo,
        que_elems: Vec<MatchElem>,
    ) -> Self {
        Self {
            achieve,
            cli_key,
            reserved,
            ctx: MatchContext {
                que_key,
                que_map,
                que_elems,
                que_result: MatchResult::new(),
            },
        }
    }
}

pub struct SupplyJob {
    achieve: Box<dyn SupplyAchieve>,
    pub(crate) cli_key: ClientKey,
    pub(crate) reserved: i32,
    pub ctx: SupplyContext,
}

impl SupplyJob {
    pub(crate) fn new(
        achieve: Box<dyn SupplyAchieve>,
        cli_key: ClientKey,
        reserved: i32,
        que_key: MatchQueueKey,
        que_map: MapInfo,
        sup_info: SupplyInfo,
        que_elems: Vec<MatchElem>,
    ) -> Self {
        Self {
            achieve,
            cli_key,
            reserved,
            ctx: SupplyContext {
                que_key,
                que_map,
                sup_info,
                que_elems,
                que_result: MatchResult::new(),
            },
        }
    }
}

/// Unit of work handed to the [`crate::JobPool`].
pub enum QueueJob {
    Match(MatchJob),
    Supply(SupplyJob),
}

impl QueueJob {
    /// Runs the pluggable algorithm. Worker-thread side of the job contract.
    pub fn execute(&mut self) {
        match self {
            QueueJob::Match(job) => job.achieve.do_thread_match(&mut job.ctx),
            QueueJob::Supply(job) => job.achieve.do_thread_supply(&mut job.ctx),
        }
    }

    pub fn que_key(&self) -> MatchQueueKey {
        match self {
            QueueJob::Match(job) => job.ctx.que_key,
            QueueJob::Supply(job) => job.ctx.que_key,
        }
    }
}
