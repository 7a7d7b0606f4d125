use std::time::Duration;

use session::estimate::EstimateSnapshot;
use session::{LedgerHandle, SessionError};
use tracing::{info, warn};

use crate::events::ReplayEvent;

/// Feeds `events` through the ledger actor.
///
/// Returns one snapshot per session, taken just before it ended (or at the
/// end of input for a session still open).
pub async fn replay(
    handle: &LedgerHandle,
    events: &[ReplayEvent],
) -> anyhow::Result<Vec<EstimateSnapshot>> {
    let mut reports = Vec::new();

    for event in events {
        match event {
            ReplayEvent::Begin { system } => lifecycle(handle.begin(system).await.map(|_| ()))?,
            ReplayEvent::Pause => lifecycle(handle.pause().await)?,
            ReplayEvent::Resume => lifecycle(handle.resume().await)?,
            ReplayEvent::End => {
                let snap = handle.snapshot().await?;
                if handle.end().await?.is_some() {
                    reports.push(snap);
                }
            }
            ReplayEvent::Delta { .. } => {
                if let Some(delta) = event.as_delta() {
                    handle.apply_delta(delta).await?;
                }
            }
            ReplayEvent::Wait { timeout_ms } => {
                let wait = Duration::from_millis(*timeout_ms);
                match tokio::time::timeout(wait, handle.settled()).await {
                    Ok(settled) => {
                        settled?;
                    }
                    Err(_) => warn!(timeout_ms, "lookups still pending after wait"),
                }
            }
        }
    }

    let last = handle.snapshot().await?;
    if last.session_id.is_some() {
        reports.push(last);
    }

    info!(sessions = reports.len(), "replay complete");
    Ok(reports)
}

fn lifecycle(res: Result<(), SessionError>) -> anyhow::Result<()> {
    match res {
        Ok(()) => Ok(()),
        Err(SessionError::ActorUnavailable) => Err(SessionError::ActorUnavailable.into()),
        Err(err) => {
            warn!(error = %err, "lifecycle event rejected");
            Ok(())
        }
    }
}
