//! Client-side guards and candidate selection.
//!
//! Backends do not always honour their own filters, so results are
//! re-checked here before one candidate is picked.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::types::{FilterConfig, PriceCandidate, SortMode};

/// Drops candidates that are too old or whose arrival distance is too far.
///
/// A candidate without a timestamp cannot be shown to be fresh and is
/// dropped. A candidate without an arrival distance is kept.
pub fn guard(
    candidates: Vec<PriceCandidate>,
    filter: &FilterConfig,
    now: DateTime<Utc>,
) -> Vec<PriceCandidate> {
    let cutoff = filter.freshness_cutoff(now);
    let before = candidates.len();

    let kept: Vec<PriceCandidate> = candidates
        .into_iter()
        .filter(|c| c.recorded_at.is_some_and(|at| at >= cutoff))
        .filter(|c| match (filter.max_arrival_distance_ls, c.distance_to_arrival_ls) {
            (Some(max), Some(ls)) => ls <= max,
            _ => true,
        })
        .collect();

    if kept.len() != before {
        debug!(
            dropped = before - kept.len(),
            kept = kept.len(),
            "candidates rejected by client-side guard"
        );
    }
    kept
}

/// Picks one candidate by `mode`. Ties go to the earliest candidate.
pub fn select(candidates: &[PriceCandidate], mode: SortMode) -> Option<&PriceCandidate> {
    let mut iter = candidates.iter();
    let first = iter.next()?;

    let chosen = match mode {
        SortMode::BestPrice => iter.fold(first, |best, c| {
            if c.sell_price > best.sell_price { c } else { best }
        }),
        SortMode::Nearest => {
            let distance = |c: &PriceCandidate| c.distance_ly.unwrap_or(f64::INFINITY);
            iter.fold(first, |best, c| {
                if distance(c) < distance(best) { c } else { best }
            })
        }
    };
    Some(chosen)
}

/// Guard then select; `None` means the search counts as zero results.
pub fn best_candidate(
    candidates: Vec<PriceCandidate>,
    filter: &FilterConfig,
    now: DateTime<Utc>,
) -> Option<PriceCandidate> {
    let kept = guard(candidates, filter, now);
    select(&kept, filter.sort_mode).cloned()
}
