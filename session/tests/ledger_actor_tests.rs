use tokio::test;

use market::types::SortMode;
use session::SessionError;
use session::gate::RecordOutcome;
use session::ledger::PriceStatus;
use session::model::LookupOutcome;

use mock_jobs::{Harness, delta, nearest_filter, priced};

#[test]
async fn first_observation_queues_exactly_one_job() -> anyhow::Result<()> {
    let mut h = Harness::start();
    h.handle.begin("Sol").await?;

    h.handle.apply_delta(delta("Platinum", 1)).await?;
    h.handle.apply_delta(delta("Platinum", 2)).await?;
    h.handle.apply_delta(delta("Painite", 4)).await?;
    h.handle.apply_delta(delta("Platinum", -3)).await?;
    h.handle.apply_delta(delta("Platinum", 1)).await?;

    let jobs = h.drain_jobs().await;
    let mut keys: Vec<_> = jobs.iter().map(|j| j.commodity_key.as_str()).collect();
    keys.sort();
    assert_eq!(keys, ["painite", "platinum"]);
    assert!(jobs.iter().all(|j| j.reference_system == "Sol"));

    let snap = h.handle.snapshot().await?;
    assert!(snap.has_pending());
    Ok(())
}

#[test]
async fn pause_suppresses_lookup_for_good() -> anyhow::Result<()> {
    let mut h = Harness::start();
    h.handle.begin("Sol").await?;
    h.handle.pause().await?;

    h.handle.apply_delta(delta("Gold", 3)).await?;
    h.handle.resume().await?;
    h.handle.apply_delta(delta("Gold", 1)).await?;

    assert!(h.drain_jobs().await.is_empty());

    let snap = h.handle.snapshot().await?;
    let gold = &snap.per_commodity[0];
    assert_eq!(gold.tons, 4);
    assert_eq!(gold.price_status, PriceStatus::NotQueried);
    Ok(())
}

#[test]
async fn new_session_queries_again() -> anyhow::Result<()> {
    let mut h = Harness::start();
    let first = h.handle.begin("Sol").await?;
    h.handle.apply_delta(delta("Osmium", 1)).await?;
    let a = h.next_job().await;

    assert_eq!(h.handle.end().await?, Some(first));
    let second = h.handle.begin("Achenar").await?;
    h.handle.apply_delta(delta("Osmium", 1)).await?;
    let b = h.next_job().await;

    assert_eq!(a.session_id, first);
    assert_eq!(b.session_id, second);
    assert_eq!(b.reference_system, "Achenar");
    Ok(())
}

#[test]
async fn result_from_ended_session_is_dropped() -> anyhow::Result<()> {
    let mut h = Harness::start();
    h.handle.begin("Sol").await?;
    h.handle.apply_delta(delta("Platinum", 5)).await?;
    let old = h.next_job().await;

    h.handle.end().await?;
    h.handle.begin("Sol").await?;
    h.handle.apply_delta(delta("Platinum", 5)).await?;
    let _fresh = h.next_job().await;

    let outcome = h
        .handle
        .deliver_result(old.commodity_key, old.session_id, priced(250_000.0))
        .await?;
    assert_eq!(outcome, RecordOutcome::Stale);

    let snap = h.handle.snapshot().await?;
    assert_eq!(snap.grand_total, 0.0);
    assert_eq!(snap.per_commodity[0].price_status, PriceStatus::Pending);
    Ok(())
}

#[test]
async fn priced_result_is_published_to_subscribers() -> anyhow::Result<()> {
    let mut h = Harness::start();
    let mut watcher = h.handle.subscribe();

    h.handle.begin("Sol").await?;
    h.handle.apply_delta(delta("Low Temperature Diamonds", 4)).await?;
    let job = h.next_job().await;

    watcher.borrow_and_update();
    let outcome = h
        .handle
        .deliver_result(job.commodity_key, job.session_id, priced(1000.0))
        .await?;
    assert_eq!(outcome, RecordOutcome::Applied);

    watcher.changed().await?;
    let snap = watcher.borrow().clone();
    assert_eq!(snap.grand_total, 4000.0);
    assert_eq!(snap.per_commodity[0].unit_price, Some(1000.0));

    // Later tonnage changes recompute with the cached price.
    h.handle.apply_delta(delta("Low Temperature Diamonds", 2)).await?;
    assert_eq!(h.handle.snapshot().await?.grand_total, 6000.0);
    assert!(h.drain_jobs().await.is_empty());
    Ok(())
}

#[test]
async fn filter_is_frozen_when_the_job_is_created() -> anyhow::Result<()> {
    let mut h = Harness::start();
    h.handle.begin("Sol").await?;

    h.handle.apply_delta(delta("Bromellite", 1)).await?;
    let before = h.next_job().await;

    h.prefs.apply(nearest_filter())?;
    h.handle.apply_delta(delta("Grandidierite", 1)).await?;
    let after = h.next_job().await;

    assert_eq!(before.filter.sort_mode, SortMode::BestPrice);
    assert_eq!(after.filter.sort_mode, SortMode::Nearest);
    Ok(())
}

#[test]
async fn full_queue_marks_commodity_unavailable() -> anyhow::Result<()> {
    let mut h = Harness::with_queue(1);
    h.handle.begin("Sol").await?;

    h.handle.apply_delta(delta("Rhodplumsite", 1)).await?;
    h.handle.apply_delta(delta("Serendibite", 1)).await?;

    let jobs = h.drain_jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].commodity_key, "rhodplumsite");

    let snap = h.handle.snapshot().await?;
    let serendibite = snap
        .per_commodity
        .iter()
        .find(|c| c.name == "Serendibite")
        .expect("entry exists");
    assert_eq!(serendibite.price_status, PriceStatus::Unavailable);
    Ok(())
}

#[test]
async fn lifecycle_errors_are_reported() -> anyhow::Result<()> {
    let h = Harness::start();

    assert_eq!(h.handle.pause().await, Err(SessionError::NoActiveSession));
    assert_eq!(h.handle.resume().await, Err(SessionError::NoActiveSession));
    assert_eq!(h.handle.end().await?, None);

    h.handle.begin("Sol").await?;
    assert_eq!(
        h.handle.begin("Sol").await,
        Err(SessionError::SessionAlreadyActive)
    );
    Ok(())
}

#[test]
async fn deltas_outside_a_session_are_ignored() -> anyhow::Result<()> {
    let mut h = Harness::start();
    h.handle.apply_delta(delta("Painite", 10)).await?;

    assert!(h.drain_jobs().await.is_empty());
    let snap = h.handle.snapshot().await?;
    assert!(snap.session_id.is_none());
    assert!(snap.per_commodity.is_empty());
    Ok(())
}

#[test]
async fn unavailable_result_settles_the_ledger() -> anyhow::Result<()> {
    let mut h = Harness::start();
    h.handle.begin("Sol").await?;
    h.handle.apply_delta(delta("Void Opal", 2)).await?;
    let job = h.next_job().await;

    let handle = h.handle.clone();
    let waiter = tokio::spawn(async move { handle.settled().await });

    h.handle
        .deliver_result(job.commodity_key, job.session_id, LookupOutcome::Unavailable)
        .await?;

    let snap = waiter.await??;
    assert!(!snap.has_pending());
    assert_eq!(snap.per_commodity[0].total_value, 0.0);
    Ok(())
}

#[test]
async fn handle_reports_stopped_actor() -> anyhow::Result<()> {
    let h = Harness::start();
    h.handle.shutdown().await;
    h.join.await?;

    assert_eq!(
        h.handle.begin("Sol").await,
        Err(SessionError::ActorUnavailable)
    );
    Ok(())
}
