use std::sync::Arc;

use crate::test_utils::person_elem;
use crate::test_utils::test_client;
use crate::test_utils::test_map;
use crate::test_utils::CapturePool;
use crate::test_utils::NoopHooks;
use crate::test_utils::TakeAllMatchFactory;
use crate::test_utils::TakeOneSupplyFactory;
use crate::ClientKey;
use crate::MatchQueueKey;
use crate::MatchQueueMgr;
use crate::MockMatchSuccess;
use crate::QueueJob;
use crate::SupplyInfo;
use crate::MATCH_STRATEGY_NORMAL;

fn que_key(map_id: u32) -> MatchQueueKey {
    MatchQueueKey {
        map_id,
        match_strategy: MATCH_STRATEGY_NORMAL,
    }
}

/// Manager with one registered map (total need 4), one hungry node and both
/// normal-strategy factories registered, backed by a capturing pool.
fn setup(success_do: MockMatchSuccess) -> (MatchQueueMgr, Arc<CapturePool>, ClientKey) {
    let mut mgr = MatchQueueMgr::new(Arc::new(success_do));
    let pool = CapturePool::new();
    mgr.attach_job_pool(pool.clone());
    mgr.register_match_achieve(MATCH_STRATEGY_NORMAL, Arc::new(TakeAllMatchFactory))
        .unwrap();
    mgr.register_supply_achieve(MATCH_STRATEGY_NORMAL, Arc::new(TakeOneSupplyFactory))
        .unwrap();
    mgr.update_match_map(test_map(1, 4));
    let cli = test_client(1);
    mgr.client_info_mut(cli).max_player_num = 10;
    (mgr, pool, cli)
}

fn enqueue_persons(mgr: &mut MatchQueueMgr, que: MatchQueueKey, ids: std::ops::RangeInclusive<u64>) {
    let hooks = Arc::new(NoopHooks);
    for id in ids {
        mgr.enter_wait_queue(que, person_elem(id, hooks.clone()));
    }
}

#[test]
fn test_run_dispatches_only_on_gap_ticks() {
    let (mut mgr, pool, _) = setup(MockMatchSuccess::new());
    enqueue_persons(&mut mgr, que_key(1), 1..=4);

    // default match_tick_gap is 10
    for _ in 0..9 {
        mgr.run(1);
    }
    assert_eq!(pool.len(), 0);

    mgr.run(1);
    assert_eq!(pool.len(), 1);
}

#[test]
fn test_dispatch_reserves_capacity_and_marks_queue_busy() {
    let (mut mgr, pool, cli) = setup(MockMatchSuccess::new());
    enqueue_persons(&mut mgr, que_key(1), 1..=4);

    mgr.try_match_once();

    assert_eq!(pool.len(), 1);
    assert!(mgr.waiting_queue[&que_key(1)].in_match);
    assert_eq!(mgr.client_info(cli).unwrap().cur_player_num, 4);

    // a busy queue refuses further dispatches until reconciliation
    mgr.try_match_once();
    assert_eq!(pool.len(), 1);
}

#[test]
fn test_no_dispatch_without_strict_headroom() {
    let (mut mgr, pool, cli) = setup(MockMatchSuccess::new());
    enqueue_persons(&mut mgr, que_key(1), 1..=4);
    // headroom equal to the map's need is not enough
    mgr.client_info_mut(cli).max_player_num = 4;

    mgr.try_match_once();

    assert_eq!(pool.len(), 0);
    assert_eq!(mgr.client_info(cli).unwrap().cur_player_num, 0);
}

#[test]
fn test_supply_request_takes_priority_over_fresh_match() {
    let (mut mgr, pool, _) = setup(MockMatchSuccess::new());
    enqueue_persons(&mut mgr, que_key(1), 1..=4);
    mgr.add_sub_world_supply(que_key(1), SupplyInfo::new(42));

    mgr.try_match_once();

    let jobs = pool.take();
    assert_eq!(jobs.len(), 1);
    assert!(matches!(&jobs[0], QueueJob::Supply(job) if job.ctx.sup_info.supply_uuid == 42));
    assert_eq!(mgr.supply_total(), 0);
}

#[test]
fn test_supply_for_empty_queue_is_dropped() {
    let (mut mgr, pool, cli) = setup(MockMatchSuccess::new());
    mgr.add_sub_world_supply(que_key(1), SupplyInfo::new(42));

    mgr.try_match_once();

    // nobody waits in the queue: the request is consumed, no job goes out
    assert_eq!(pool.len(), 0);
    assert_eq!(mgr.supply_total(), 0);
    assert!(!mgr.waiting_queue[&que_key(1)].in_match);
    assert_eq!(mgr.client_info(cli).unwrap().cur_player_num, 0);
}

#[test]
fn test_unregistered_strategy_dispatches_nothing() {
    let mut mgr = MatchQueueMgr::new(Arc::new(MockMatchSuccess::new()));
    let pool = CapturePool::new();
    mgr.attach_job_pool(pool.clone());
    mgr.update_match_map(test_map(1, 4));
    mgr.client_info_mut(test_client(1)).max_player_num = 10;
    enqueue_persons(&mut mgr, que_key(1), 1..=4);

    mgr.try_match_once();

    assert_eq!(pool.len(), 0);
    assert!(!mgr.waiting_queue[&que_key(1)].in_match);
}

#[test]
fn test_two_hungry_nodes_share_one_queue_without_double_dispatch() {
    let (mut mgr, pool, _) = setup(MockMatchSuccess::new());
    mgr.client_info_mut(test_client(2)).max_player_num = 10;
    enqueue_persons(&mut mgr, que_key(1), 1..=4);

    mgr.try_match_once();

    assert_eq!(pool.len(), 1);
}

#[test]
fn test_busy_queue_is_skipped_by_every_hungry_node() {
    let (mut mgr, pool, cli) = setup(MockMatchSuccess::new());
    mgr.client_info_mut(test_client(2)).max_player_num = 10;
    enqueue_persons(&mut mgr, que_key(1), 1..=4);
    mgr.waiting_queue.get_mut(&que_key(1)).unwrap().in_match = true;

    mgr.try_match_once();

    assert_eq!(pool.len(), 0);
    assert_eq!(mgr.client_info(cli).unwrap().cur_player_num, 0);
    assert_eq!(mgr.client_info(test_client(2)).unwrap().cur_player_num, 0);
}

#[test]
fn test_first_fit_picks_first_affordable_map() {
    let (mut mgr, pool, _) = setup(MockMatchSuccess::new());
    // map 1 now needs more than the node's headroom of 10; map 2 fits
    mgr.update_match_map(test_map(1, 100));
    mgr.update_match_map(test_map(2, 4));
    enqueue_persons(&mut mgr, que_key(1), 1..=4);
    enqueue_persons(&mut mgr, que_key(2), 11..=14);

    mgr.try_match_once();

    let jobs = pool.take();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].que_key(), que_key(2));
}

/// Full cycle: dispatch, execute on the caller thread, reconcile.
#[test]
fn test_dispatch_execute_reconcile_commits_match() {
    let mut success_do = MockMatchSuccess::new();
    success_do
        .expect_match_success()
        .withf(|result, cli, map| {
            result.groups.len() == 4 && cli.server_id == 1 && map.match_total_need == 4
        })
        .times(1)
        .returning(|_, _, _| true);
    let (mut mgr, pool, cli) = setup(success_do);
    enqueue_persons(&mut mgr, que_key(1), 1..=4);

    mgr.try_match_once();
    let mut jobs = pool.take();
    assert_eq!(jobs.len(), 1);
    let mut job = jobs.pop().unwrap();
    job.execute();
    mgr.on_job_complete(job);

    assert_eq!(mgr.queued_total(), 0);
    assert!(!mgr.waiting_queue[&que_key(1)].in_match);
    assert_eq!(mgr.client_info(cli).unwrap().cur_player_num, 4);
}
