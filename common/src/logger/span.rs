use std::future::Future;
use std::time::{Duration, Instant};

use tracing::{Span, field};

/// Span wrapping one lookup job from dispatch to delivery.
///
/// `attempt` is recorded later, once the dispatcher knows which name it is
/// querying with.
pub fn lookup_span(commodity: &str, session_id: &impl std::fmt::Display) -> Span {
    tracing::info_span!(
        "lookup",
        commodity = %commodity,
        session_id = %session_id,
        attempt = field::Empty
    )
}

/// Awaits `fut` and emits a `performance` warning if it took longer than `max`.
pub async fn warn_if_slow<F, T>(label: &'static str, max: Duration, fut: F) -> T
where
    F: Future<Output = T>,
{
    let start = Instant::now();
    let out = fut.await;
    let elapsed = start.elapsed();
    if elapsed > max {
        tracing::warn!(
            target: "performance",
            label = label,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow operation detected"
        );
    }
    out
}
