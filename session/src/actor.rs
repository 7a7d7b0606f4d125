//! Single owner of the session context.
//!
//! Every mutation (lifecycle calls, inventory deltas, lookup results) is a
//! command on one inbox, applied in arrival order by one task. That makes
//! the trigger gate's check-and-set atomic without a lock, and keeps stale
//! results from racing a session reset.

use market::types::FilterConfig;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::error::SessionError;
use crate::estimate::{EstimateSnapshot, snapshot};
use crate::gate::{RecordOutcome, maybe_trigger, record_result};
use crate::model::{InventoryDelta, LookupJob, LookupOutcome, SessionContext, SessionId};

pub const DEFAULT_INBOX_CAPACITY: usize = 256;

#[derive(Debug)]
pub enum LedgerCommand {
    Begin {
        reference_system: String,
        reply: oneshot::Sender<Result<SessionId, SessionError>>,
    },
    Pause {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    End {
        reply: oneshot::Sender<Option<SessionId>>,
    },
    Delta(InventoryDelta),
    LookupResult {
        commodity_key: String,
        session_id: SessionId,
        outcome: LookupOutcome,
        reply: oneshot::Sender<RecordOutcome>,
    },
    Snapshot {
        reply: oneshot::Sender<EstimateSnapshot>,
    },
    Shutdown,
}

pub struct LedgerActor {
    ctx: SessionContext,
    prefs: watch::Receiver<FilterConfig>,
    jobs: mpsc::Sender<LookupJob>,
    snapshots: watch::Sender<EstimateSnapshot>,
}

impl LedgerActor {
    pub fn new(
        prefs: watch::Receiver<FilterConfig>,
        jobs: mpsc::Sender<LookupJob>,
        snapshots: watch::Sender<EstimateSnapshot>,
    ) -> Self {
        Self {
            ctx: SessionContext::new(),
            prefs,
            jobs,
            snapshots,
        }
    }

    pub async fn run(mut self, mut inbox: mpsc::Receiver<LedgerCommand>) {
        info!("ledger actor started");

        while let Some(cmd) = inbox.recv().await {
            if matches!(cmd, LedgerCommand::Shutdown) {
                break;
            }
            self.handle(cmd);
        }

        info!("ledger actor stopped");
    }

    fn handle(&mut self, cmd: LedgerCommand) {
        match cmd {
            LedgerCommand::Begin {
                reference_system,
                reply,
            } => {
                let res = self.ctx.begin(&reference_system);
                if let Ok(id) = &res {
                    info!(session_id = %id, system = %reference_system, "session started");
                    self.publish();
                }
                let _ = reply.send(res);
            }

            LedgerCommand::Pause { reply } => {
                let res = self.ctx.pause();
                if res.is_ok() {
                    info!("session paused");
                }
                let _ = reply.send(res);
            }

            LedgerCommand::Resume { reply } => {
                let res = self.ctx.resume();
                if res.is_ok() {
                    info!("session resumed");
                }
                let _ = reply.send(res);
            }

            LedgerCommand::End { reply } => {
                let ended = self.ctx.end();
                if let Some(id) = ended {
                    info!(session_id = %id, "session ended; ledger discarded");
                    self.publish();
                }
                let _ = reply.send(ended);
            }

            LedgerCommand::Delta(delta) => self.on_delta(delta),

            LedgerCommand::LookupResult {
                commodity_key,
                session_id,
                outcome,
                reply,
            } => {
                let res = record_result(&mut self.ctx, &commodity_key, session_id, outcome);
                if res == RecordOutcome::Applied {
                    self.publish();
                }
                let _ = reply.send(res);
            }

            LedgerCommand::Snapshot { reply } => {
                let _ = reply.send(snapshot(&self.ctx));
            }

            LedgerCommand::Shutdown => {}
        }
    }

    fn on_delta(&mut self, delta: InventoryDelta) {
        let Some(ledger) = self.ctx.ledger_mut() else {
            debug!(commodity = %delta.localized_name, "delta outside a session; ignored");
            return;
        };
        let Some(applied) =
            ledger.apply_delta(&delta.localized_name, &delta.canonical_name, delta.delta_tons)
        else {
            return;
        };

        // The filter is frozen into the job here; later edits don't reach it.
        let filter = self.prefs.borrow().clone();
        if let Some(job) = maybe_trigger(&mut self.ctx, &applied, &filter) {
            self.enqueue(job);
        }

        self.publish();
    }

    fn enqueue(&mut self, job: LookupJob) {
        let key = job.commodity_key.clone();
        let session_id = job.session_id;

        if let Err(err) = self.jobs.try_send(job) {
            warn!(commodity = %key, error = %err, "lookup queue unavailable; marking unavailable");
            record_result(&mut self.ctx, &key, session_id, LookupOutcome::Unavailable);
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(snapshot(&self.ctx));
    }
}

/// Cloneable front door to a running [`LedgerActor`].
#[derive(Clone)]
pub struct LedgerHandle {
    tx: mpsc::Sender<LedgerCommand>,
    snapshots: watch::Receiver<EstimateSnapshot>,
}

/// Starts the actor on the current runtime.
pub fn spawn(
    prefs: watch::Receiver<FilterConfig>,
    jobs: mpsc::Sender<LookupJob>,
    inbox_capacity: usize,
) -> (LedgerHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(inbox_capacity.max(1));
    let (snap_tx, snap_rx) = watch::channel(EstimateSnapshot::default());

    let actor = LedgerActor::new(prefs, jobs, snap_tx);
    let join = tokio::spawn(actor.run(rx));

    (
        LedgerHandle {
            tx,
            snapshots: snap_rx,
        },
        join,
    )
}

impl LedgerHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> LedgerCommand,
    ) -> Result<T, SessionError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| SessionError::ActorUnavailable)?;
        rx.await.map_err(|_| SessionError::ActorUnavailable)
    }

    #[instrument(skip(self))]
    pub async fn begin(&self, reference_system: &str) -> Result<SessionId, SessionError> {
        let reference_system = reference_system.to_string();
        self.request(|reply| LedgerCommand::Begin {
            reference_system,
            reply,
        })
        .await?
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.request(|reply| LedgerCommand::Pause { reply }).await?
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.request(|reply| LedgerCommand::Resume { reply }).await?
    }

    /// Ends the live session if any. Ending twice is a no-op.
    pub async fn end(&self) -> Result<Option<SessionId>, SessionError> {
        self.request(|reply| LedgerCommand::End { reply }).await
    }

    /// Queues a cargo change. Never waits on a price lookup.
    pub async fn apply_delta(&self, delta: InventoryDelta) -> Result<(), SessionError> {
        self.tx
            .send(LedgerCommand::Delta(delta))
            .await
            .map_err(|_| SessionError::ActorUnavailable)
    }

    pub async fn deliver_result(
        &self,
        commodity_key: String,
        session_id: SessionId,
        outcome: LookupOutcome,
    ) -> Result<RecordOutcome, SessionError> {
        self.request(|reply| LedgerCommand::LookupResult {
            commodity_key,
            session_id,
            outcome,
            reply,
        })
        .await
    }

    pub async fn snapshot(&self) -> Result<EstimateSnapshot, SessionError> {
        self.request(|reply| LedgerCommand::Snapshot { reply }).await
    }

    /// Receives every snapshot published after a ledger change.
    pub fn subscribe(&self) -> watch::Receiver<EstimateSnapshot> {
        self.snapshots.clone()
    }

    /// Resolves once no commodity is waiting on a lookup.
    pub async fn settled(&self) -> Result<EstimateSnapshot, SessionError> {
        // Flush anything still queued ahead of us before watching.
        self.snapshot().await?;
        let mut rx = self.subscribe();
        let snap = rx
            .wait_for(|s| !s.has_pending())
            .await
            .map_err(|_| SessionError::ActorUnavailable)?;
        Ok(snap.clone())
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(LedgerCommand::Shutdown).await;
    }
}
