use std::sync::Arc;

use crate::test_utils::person_elem;
use crate::test_utils::test_client;
use crate::test_utils::test_map;
use crate::test_utils::NoopHooks;
use crate::test_utils::TakeAllMatch;
use crate::JobPool;
use crate::MatchJob;
use crate::MatchQueueKey;
use crate::QueueJob;
use crate::TokioJobPool;
use crate::MATCH_STRATEGY_NORMAL;

fn sample_job(elem_ids: &[u64]) -> MatchJob {
    let hooks = Arc::new(NoopHooks);
    let que_elems = elem_ids.iter().map(|&id| person_elem(id, hooks.clone())).collect();
    MatchJob::new(
        Box::new(TakeAllMatch),
        test_client(1),
        4,
        MatchQueueKey {
            map_id: 1,
            match_strategy: MATCH_STRATEGY_NORMAL,
        },
        test_map(1, 4),
        que_elems,
    )
}

#[tokio::test]
async fn test_posted_job_is_executed_and_delivered_once() {
    let (pool, mut completion_rx) = TokioJobPool::unbounded();

    pool.post(QueueJob::Match(sample_job(&[1, 2, 3, 4])));

    let done = completion_rx.recv().await.unwrap();
    let QueueJob::Match(job) = done else {
        panic!("expected a match job back");
    };
    assert_eq!(job.ctx.que_result.groups.len(), 4);
    assert!(completion_rx.try_recv().is_err());
}

#[tokio::test]
async fn test_completions_arrive_for_every_posted_job() {
    let (pool, mut completion_rx) = TokioJobPool::unbounded();

    pool.post(QueueJob::Match(sample_job(&[1])));
    pool.post(QueueJob::Match(sample_job(&[2, 3])));

    let mut group_sizes = vec![
        completion_rx.recv().await.unwrap(),
        completion_rx.recv().await.unwrap(),
    ]
    .into_iter()
    .map(|job| match job {
        QueueJob::Match(job) => job.ctx.que_result.groups.len(),
        QueueJob::Supply(_) => panic!("expected match jobs back"),
    })
    .collect::<Vec<_>>();
    group_sizes.sort();

    assert_eq!(group_sizes, vec![1, 2]);
}
