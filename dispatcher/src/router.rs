//! Background resolution of lookup jobs.
//!
//! Jobs come off one queue and each runs on its own task, with a semaphore
//! capping how many talk to the pricing source at once. Every failure on
//! this path (network, status, timeout, empty result) ends as a zero-result
//! attempt; nothing propagates back to the producer. A job whose task dies
//! is delivered as unavailable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use common::logger::{lookup_span, warn_if_slow};
use common::time::now_utc;
use market::errors::LookupError;
use market::selection::best_candidate;
use market::source::PricingSource;
use market::types::{PriceCandidate, PriceQuery};
use session::gate::RecordOutcome;
use session::model::{LookupJob, LookupOutcome, SessionId};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{self, JoinError, JoinSet};
use tracing::{Instrument, Span, debug, info, warn};

use crate::names::name_candidates;
use crate::sink::ResultSink;
use crate::stats::{DispatcherStats, JobState};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Jobs allowed to query the source at the same time.
    pub concurrency: usize,
    /// Upper bound on one search call; hitting it counts as zero results.
    pub attempt_timeout: Duration,
    pub slow_warn: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            attempt_timeout: Duration::from_secs(15),
            slow_warn: Duration::from_secs(5),
        }
    }
}

pub struct SearchDispatcher {
    source: Arc<dyn PricingSource>,
    sink: Arc<dyn ResultSink>,
    permits: Semaphore,
    config: DispatcherConfig,
    stats: Arc<DispatcherStats>,
}

impl SearchDispatcher {
    pub fn new(
        source: Arc<dyn PricingSource>,
        sink: Arc<dyn ResultSink>,
        config: DispatcherConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            sink,
            permits: Semaphore::new(config.concurrency.max(1)),
            config,
            stats: Arc::new(DispatcherStats::default()),
        })
    }

    pub fn stats(&self) -> Arc<DispatcherStats> {
        Arc::clone(&self.stats)
    }

    /// Consumes jobs until the queue closes, then waits for in-flight work.
    pub async fn run(self: Arc<Self>, mut jobs: mpsc::Receiver<LookupJob>) {
        info!(
            source = self.source.name(),
            concurrency = self.config.concurrency,
            "search dispatcher started"
        );

        let mut tasks = JoinSet::new();
        let mut running: HashMap<task::Id, (String, SessionId)> = HashMap::new();

        while let Some(job) = jobs.recv().await {
            self.stats
                .transition(job.session_id, &job.commodity_key, JobState::Enqueued);

            let span = lookup_span(&job.commodity_key, &job.session_id);
            let identity = (job.commodity_key.clone(), job.session_id);
            let this = Arc::clone(&self);
            let handle = tasks.spawn(async move { this.process(job).await }.instrument(span));
            running.insert(handle.id(), identity);

            while let Some(joined) = tasks.try_join_next_with_id() {
                self.reap(joined, &mut running).await;
            }
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            self.reap(joined, &mut running).await;
        }
        info!(stats = ?self.stats.snapshot(), "search dispatcher stopped");
    }

    async fn reap(
        &self,
        joined: Result<(task::Id, ()), JoinError>,
        running: &mut HashMap<task::Id, (String, SessionId)>,
    ) {
        let err = match joined {
            Ok((id, ())) => {
                running.remove(&id);
                return;
            }
            Err(err) => err,
        };
        let Some((commodity_key, session_id)) = running.remove(&err.id()) else {
            return;
        };

        warn!(
            commodity = %commodity_key,
            %session_id,
            error = %err,
            "lookup task died; marking unavailable"
        );
        self.stats
            .transition(session_id, &commodity_key, JobState::Failed);
        self.deliver(commodity_key, session_id, LookupOutcome::Unavailable)
            .await;
    }

    async fn process(&self, job: LookupJob) {
        let Ok(permit) = self.permits.acquire().await else {
            warn!("dispatcher semaphore closed; dropping job");
            return;
        };

        self.stats
            .transition(job.session_id, &job.commodity_key, JobState::InFlight);
        let outcome = self.resolve(&job).await;
        drop(permit);

        let next = match outcome {
            LookupOutcome::Priced(_) => JobState::Resolved,
            LookupOutcome::Unavailable => JobState::Failed,
        };
        self.stats
            .transition(job.session_id, &job.commodity_key, next);

        self.deliver(job.commodity_key, job.session_id, outcome)
            .await;
    }

    async fn deliver(&self, commodity_key: String, session_id: SessionId, outcome: LookupOutcome) {
        match self.sink.deliver(commodity_key, session_id, outcome).await {
            Ok(RecordOutcome::Stale) => {
                self.stats.mark_stale(session_id);
                debug!("result arrived after its session ended");
            }
            Ok(_) => {}
            Err(err) => warn!(error = %err, "could not deliver lookup result"),
        }
    }

    /// Tries each candidate name in turn; the first surviving candidate wins.
    pub async fn resolve(&self, job: &LookupJob) -> LookupOutcome {
        for (i, name) in name_candidates(job).into_iter().enumerate() {
            Span::current().record("attempt", i + 1);

            let query = PriceQuery {
                commodity: name,
                reference_system: job.reference_system.clone(),
                filter: job.filter.clone(),
            };

            if let Some(candidate) = self.attempt(&query).await {
                info!(
                    name = %query.commodity,
                    sell_price = candidate.sell_price,
                    station = %candidate.station_name,
                    "price resolved"
                );
                return LookupOutcome::Priced(candidate);
            }
            debug!(name = %query.commodity, "no usable result under this name");
        }

        LookupOutcome::Unavailable
    }

    async fn attempt(&self, query: &PriceQuery) -> Option<PriceCandidate> {
        let search = warn_if_slow(
            "price_search",
            self.config.slow_warn,
            self.source.search(query),
        );

        let result = match tokio::time::timeout(self.config.attempt_timeout, search).await {
            Ok(res) => res,
            Err(_) => Err(LookupError::Timeout(
                self.config.attempt_timeout.as_millis() as u64,
            )),
        };

        match result {
            Ok(candidates) => best_candidate(candidates, &query.filter, now_utc()),
            Err(err) => {
                warn!(
                    source = self.source.name(),
                    name = %query.commodity,
                    error = %err,
                    "lookup attempt failed"
                );
                None
            }
        }
    }
}
