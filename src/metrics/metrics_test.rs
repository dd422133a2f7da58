use std::sync::Arc;
use std::time::Duration;

use prometheus::Registry;

use super::*;
use crate::test_utils::person_elem;
use crate::test_utils::NoopHooks;
use crate::DispatchCollectMgr;
use crate::MatchQueueKey;
use crate::MatchQueueMgr;
use crate::MockCollectEvents;
use crate::MockMatchSuccess;
use crate::SupplyInfo;
use crate::MATCH_STRATEGY_NORMAL;

#[tokio::test]
#[serial_test::serial]
async fn test_pull_snapshots_live_state_into_gauges() {
    let mut mgr = MatchQueueMgr::new(Arc::new(MockMatchSuccess::new()));
    let que_key = MatchQueueKey {
        map_id: 1,
        match_strategy: MATCH_STRATEGY_NORMAL,
    };
    let hooks = Arc::new(NoopHooks);
    mgr.enter_wait_queue(que_key, person_elem(1, hooks.clone()));
    mgr.enter_wait_queue(que_key, person_elem(2, hooks));
    mgr.add_sub_world_supply(que_key, SupplyInfo::new(42));

    let mut collector = DispatchCollectMgr::new();
    let mut events = MockCollectEvents::new();
    events.expect_on_collect_one().never();
    collector.create_one_collect(Duration::from_millis(100), Arc::new(events));

    pull_match_metrics(&mgr, &collector);

    assert_eq!(MATCH_TOTAL_QUEUED_METRIC.get(), 2);
    assert_eq!(MATCH_TOTAL_SUPPLY_METRIC.get(), 1);
    assert_eq!(COLLECT_PENDING_METRIC.get(), 1);
}

#[test]
#[serial_test::serial]
fn test_register_custom_metrics_exposes_all_gauges() {
    let registry = Registry::new_custom(Some("qengine".to_string()), None).unwrap();
    register_custom_metrics(&registry);

    let metric_names: Vec<_> = registry.gather().iter().map(|m| m.get_name().to_string()).collect();
    assert!(metric_names.contains(&"qengine_match_totalmatch_len".to_string()));
    assert!(metric_names.contains(&"qengine_match_totalsupply_len".to_string()));
    assert!(metric_names.contains(&"qengine_collect_pending_len".to_string()));
}
