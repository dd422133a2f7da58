use lazy_static::lazy_static;
use prometheus::IntGauge;
use prometheus::Registry;

use crate::DispatchCollectMgr;
use crate::MatchQueueMgr;

lazy_static! {
    pub static ref MATCH_TOTAL_QUEUED_METRIC: IntGauge = IntGauge::new(
        "match_totalmatch_len",
        "Total number of elements currently waiting across all match queues"
    )
    .expect("metric can not be created");

    pub static ref MATCH_TOTAL_SUPPLY_METRIC: IntGauge = IntGauge::new(
        "match_totalsupply_len",
        "Total number of pending backfill requests across all match queues"
    )
    .expect("metric can not be created");

    pub static ref COLLECT_PENDING_METRIC: IntGauge = IntGauge::new(
        "collect_pending_len",
        "Number of dispatch-collect sessions currently pending"
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

pub fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(MATCH_TOTAL_QUEUED_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(MATCH_TOTAL_SUPPLY_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(COLLECT_PENDING_METRIC.clone()))
        .expect("collector can be registered");
}

/// Pull pass: snapshot live state into the gauges. Invoked from the engine
/// tick so a scrape always sees values at most one tick old.
pub fn pull_match_metrics(manager: &MatchQueueMgr, collector: &DispatchCollectMgr) {
    MATCH_TOTAL_QUEUED_METRIC.set(manager.queued_total() as i64);
    MATCH_TOTAL_SUPPLY_METRIC.set(manager.supply_total() as i64);
    COLLECT_PENDING_METRIC.set(collector.count() as i64);
}

#[cfg(test)]
mod metrics_test;
