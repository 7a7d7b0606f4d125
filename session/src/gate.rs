//! Decides when a commodity gets its one price lookup, and applies results.
//!
//! A job fires only for the first positive observation of a commodity,
//! only while the session is active, and only while the entry is still
//! `NotQueried`. Firing moves the entry to `Pending` before anything else
//! happens, so a burst of deltas cannot fire twice. An observation made
//! while paused is spent: resuming does not bring it back.

use market::types::FilterConfig;
use tracing::{debug, info};

use crate::ledger::{DeltaApplied, PriceStatus};
use crate::model::{LookupJob, LookupOutcome, SessionContext, SessionId, SessionState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Applied,
    /// Result belongs to a session that has since ended or been replaced.
    Stale,
    /// The entry is not waiting on a lookup (or does not exist).
    NotPending,
}

pub fn maybe_trigger(
    ctx: &mut SessionContext,
    delta: &DeltaApplied,
    filter: &FilterConfig,
) -> Option<LookupJob> {
    if !delta.first_positive {
        return None;
    }

    let state = ctx.state();
    if state != SessionState::Active {
        debug!(commodity = %delta.key, %state, "first observation while not active; lookup suppressed");
        return None;
    }

    let reference_system = ctx.reference_system()?.to_string();
    let ledger = ctx.ledger_mut()?;
    let session_id = ledger.session_id();
    let entry = ledger.get_mut(&delta.key)?;

    if entry.status != PriceStatus::NotQueried {
        return None;
    }
    entry.status = PriceStatus::Pending;

    info!(
        commodity = %entry.localized_name,
        system = %reference_system,
        %session_id,
        "price lookup triggered"
    );

    Some(LookupJob {
        commodity_key: delta.key.clone(),
        localized_name: entry.localized_name.clone(),
        canonical_name: entry.canonical_name.clone(),
        reference_system,
        filter: filter.clone(),
        session_id,
    })
}

pub fn record_result(
    ctx: &mut SessionContext,
    commodity_key: &str,
    session_id: SessionId,
    outcome: LookupOutcome,
) -> RecordOutcome {
    if !ctx.is_current(session_id) {
        debug!(commodity = %commodity_key, %session_id, "dropping result from superseded session");
        return RecordOutcome::Stale;
    }

    let Some(entry) = ctx.ledger_mut().and_then(|l| l.get_mut(commodity_key)) else {
        return RecordOutcome::NotPending;
    };
    if entry.status != PriceStatus::Pending {
        return RecordOutcome::NotPending;
    }

    match outcome {
        LookupOutcome::Priced(candidate) => {
            info!(
                commodity = %entry.localized_name,
                sell_price = candidate.sell_price,
                station = %candidate.station_name,
                system = %candidate.system_name,
                "price cached"
            );
            entry.status = PriceStatus::Priced(candidate.sell_price);
            entry.source = Some(candidate);
        }
        LookupOutcome::Unavailable => {
            info!(commodity = %entry.localized_name, "no price found; marked unavailable");
            entry.status = PriceStatus::Unavailable;
        }
    }

    RecordOutcome::Applied
}
