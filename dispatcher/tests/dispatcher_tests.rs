use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing_test::traced_test;

use dispatcher::{DispatcherConfig, JobState, SearchDispatcher};
use session::gate::RecordOutcome;
use session::model::{LookupJob, LookupOutcome};

use mock_source::{RecordingSink, Reply, ScriptedSource, candidate, job};

fn dispatcher(source: Arc<ScriptedSource>, sink: Arc<RecordingSink>) -> Arc<SearchDispatcher> {
    SearchDispatcher::new(source, sink, DispatcherConfig::default())
}

async fn run_all(d: Arc<SearchDispatcher>, jobs: Vec<LookupJob>) {
    let (tx, rx) = mpsc::channel(jobs.len().max(1));
    let runner = tokio::spawn(d.run(rx));
    for j in jobs {
        tx.send(j).await.expect("dispatcher running");
    }
    drop(tx);
    runner.await.expect("dispatcher task");
}

#[tokio::test]
async fn retries_with_canonical_name_after_empty_result() {
    let source = Arc::new(
        ScriptedSource::default().with(
            "lowtemperaturediamond",
            Reply::Rows(vec![candidate("Hillary Depot", 120_000.0, 1)]),
        ),
    );
    let d = dispatcher(source.clone(), RecordingSink::new(RecordOutcome::Applied));

    let outcome = d
        .resolve(&job("ltd", "Low Temperature Diamonds", "lowtemperaturediamond"))
        .await;

    assert_eq!(
        source.calls(),
        ["Low Temperature Diamonds", "lowtemperaturediamond"]
    );
    let LookupOutcome::Priced(found) = outcome else {
        panic!("expected a price");
    };
    assert_eq!(found.station_name, "Hillary Depot");
}

#[tokio::test]
async fn identical_names_are_searched_once() {
    let source = Arc::new(ScriptedSource::default());
    let d = dispatcher(source.clone(), RecordingSink::new(RecordOutcome::Applied));

    let outcome = d.resolve(&job("painite", "Painite", "painite")).await;

    assert_eq!(outcome, LookupOutcome::Unavailable);
    assert_eq!(source.calls(), ["Painite"]);
}

#[tokio::test]
#[traced_test]
async fn backend_error_counts_as_zero_results() {
    let source = Arc::new(
        ScriptedSource::default()
            .with("Platin", Reply::Fail)
            .with("platinum", Reply::Rows(vec![candidate("Ray Gateway", 230_000.0, 2)])),
    );
    let d = dispatcher(source.clone(), RecordingSink::new(RecordOutcome::Applied));

    let outcome = d.resolve(&job("platin", "Platin", "platinum")).await;

    assert!(matches!(outcome, LookupOutcome::Priced(c) if c.sell_price == 230_000.0));
    assert!(logs_contain("lookup attempt failed"));
}

#[tokio::test(start_paused = true)]
async fn timeout_counts_as_zero_results() {
    let source = Arc::new(
        ScriptedSource::default()
            .with("Osmium", Reply::Hang)
            .with("osmium_raw", Reply::Rows(vec![candidate("Obsidian Orbital", 50_000.0, 0)])),
    );
    let d = SearchDispatcher::new(
        source.clone(),
        RecordingSink::new(RecordOutcome::Applied),
        DispatcherConfig {
            attempt_timeout: Duration::from_secs(15),
            ..DispatcherConfig::default()
        },
    );

    let outcome = d.resolve(&job("osmium", "Osmium", "osmium_raw")).await;

    assert_eq!(source.calls(), ["Osmium", "osmium_raw"]);
    assert!(matches!(outcome, LookupOutcome::Priced(_)));
}

#[tokio::test]
async fn stale_market_data_is_rejected_client_side() {
    let source = Arc::new(
        ScriptedSource::default()
            .with("Bromellite", Reply::Rows(vec![candidate("Old Port", 90_000.0, 60)])),
    );
    let d = dispatcher(source, RecordingSink::new(RecordOutcome::Applied));

    let outcome = d.resolve(&job("bromellite", "Bromellite", "")).await;
    assert_eq!(outcome, LookupOutcome::Unavailable);
}

#[tokio::test]
async fn best_price_wins_among_fresh_candidates() {
    let source = Arc::new(ScriptedSource::default().with(
        "Gold",
        Reply::Rows(vec![
            candidate("Cheap", 40_000.0, 1),
            candidate("Rich", 48_000.0, 1),
            candidate("Ancient", 99_000.0, 45),
        ]),
    ));
    let d = dispatcher(source, RecordingSink::new(RecordOutcome::Applied));

    let LookupOutcome::Priced(found) = d.resolve(&job("gold", "Gold", "gold")).await else {
        panic!("expected a price");
    };
    assert_eq!(found.station_name, "Rich");
}

#[tokio::test(start_paused = true)]
async fn concurrency_is_bounded() {
    let source = Arc::new(ScriptedSource::default().delayed(Duration::from_millis(200)));
    let sink = RecordingSink::new(RecordOutcome::Applied);
    let d = dispatcher(source.clone(), sink.clone());
    let stats = d.stats();

    let jobs: Vec<_> = (0..6)
        .map(|i| {
            let name = format!("Commodity {i}");
            job(&name.to_lowercase(), &name, "")
        })
        .collect();
    run_all(d, jobs).await;

    assert!(source.max_active.load(Ordering::SeqCst) <= 2);
    assert_eq!(sink.outcomes().len(), 6);

    let snap = stats.snapshot();
    assert_eq!(snap.enqueued, 6);
    assert_eq!(snap.failed, 6);
    assert_eq!(snap.in_flight, 0);
}

#[tokio::test]
async fn results_are_delivered_with_job_identity() {
    let source = Arc::new(
        ScriptedSource::default()
            .with("Serendibite", Reply::Rows(vec![candidate("Fort", 150_000.0, 3)])),
    );
    let sink = RecordingSink::new(RecordOutcome::Applied);
    let d = dispatcher(source, sink.clone());
    let stats = d.stats();

    let j = job("serendibite", "Serendibite", "serendibite");
    let (session_id, key) = (j.session_id, j.commodity_key.clone());
    run_all(d, vec![j]).await;

    let delivered = sink.delivered.lock().clone();
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].0, key);
    assert_eq!(delivered[0].1, session_id);
    assert_eq!(stats.state_of(session_id, &key), Some(JobState::Resolved));
}

#[tokio::test]
async fn stale_acknowledgements_are_counted() {
    let sink = RecordingSink::new(RecordOutcome::Stale);
    let d = dispatcher(Arc::new(ScriptedSource::default()), sink);
    let stats = d.stats();

    run_all(d, vec![job("gold", "Gold", "gold")]).await;

    let snap = stats.snapshot();
    assert_eq!(snap.stale, 1);
    assert_eq!(snap.failed, 1);
    assert_eq!(stats.tracked(), 0);
}

#[tokio::test]
async fn crashed_lookup_is_delivered_unavailable() {
    let source = Arc::new(
        ScriptedSource::default()
            .with("Painite", Reply::Panic)
            .with("Gold", Reply::Rows(vec![candidate("Fort", 40_000.0, 1)])),
    );
    let sink = RecordingSink::new(RecordOutcome::Applied);
    let d = dispatcher(source, sink.clone());
    let stats = d.stats();

    let crashing = job("painite", "Painite", "painite");
    let session_id = crashing.session_id;
    run_all(d, vec![crashing, job("gold", "Gold", "gold")]).await;

    let mut outcomes = sink.outcomes();
    outcomes.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(outcomes.len(), 2);
    assert!(matches!(&outcomes[0], (k, LookupOutcome::Priced(_)) if k == "gold"));
    assert!(matches!(&outcomes[1], (k, LookupOutcome::Unavailable) if k == "painite"));

    assert_eq!(stats.state_of(session_id, "painite"), Some(JobState::Failed));
    let snap = stats.snapshot();
    assert_eq!(snap.in_flight, 0);
    assert_eq!(snap.failed, 1);
    assert_eq!(snap.resolved, 1);
}
