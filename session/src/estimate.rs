//! Derived totals over the live ledger, plus the two compact renderings
//! consumers show to the player.

use std::cmp::Ordering;

use serde::Serialize;

use crate::ledger::PriceStatus;
use crate::model::{SessionContext, SessionId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommodityEstimate {
    pub name: String,
    pub tons: u64,
    pub unit_price: Option<f64>,
    pub total_value: f64,
    pub price_status: PriceStatus,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct EstimateSnapshot {
    pub session_id: Option<SessionId>,
    pub per_commodity: Vec<CommodityEstimate>,
    pub grand_total: f64,
}

impl EstimateSnapshot {
    pub fn has_pending(&self) -> bool {
        self.per_commodity
            .iter()
            .any(|c| c.price_status == PriceStatus::Pending)
    }
}

/// Recomputes the snapshot from scratch. Ordered by descending value, then name.
pub fn snapshot(ctx: &SessionContext) -> EstimateSnapshot {
    let Some(ledger) = ctx.ledger() else {
        return EstimateSnapshot::default();
    };

    let mut per_commodity: Vec<CommodityEstimate> = ledger
        .entries()
        .map(|e| CommodityEstimate {
            name: e.localized_name.clone(),
            tons: e.tons,
            unit_price: e.unit_price(),
            total_value: e.estimated_value(),
            price_status: e.status,
        })
        .collect();

    per_commodity.sort_by(|a, b| {
        b.total_value
            .partial_cmp(&a.total_value)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.name.cmp(&b.name))
    });

    let grand_total = per_commodity.iter().map(|c| c.total_value).sum();

    EstimateSnapshot {
        session_id: Some(ledger.session_id()),
        per_commodity,
        grand_total,
    }
}

/// `4_349_234 -> "4.3M"`, `125_000 -> "125.0K"`, `42 -> "42"`.
///
/// Values under a thousand are truncated, never rounded up into the next unit.
pub fn compact_value(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{:.0}", value.trunc())
    }
}

/// Single overlay row. `None` until something has been priced.
pub fn overlay_line(snapshot: &EstimateSnapshot) -> Option<String> {
    let any_priced = snapshot
        .per_commodity
        .iter()
        .any(|c| matches!(c.price_status, PriceStatus::Priced(_)));
    any_priced.then(|| format!("Est. Sell: {}", compact_value(snapshot.grand_total)))
}

/// One `name: value` line per searched commodity, then the total.
///
/// Unavailable commodities are listed as `0` so the player can see the
/// search happened. Commodities never searched are left out.
pub fn discord_summary(snapshot: &EstimateSnapshot) -> Option<String> {
    let lines: Vec<String> = snapshot
        .per_commodity
        .iter()
        .filter(|c| {
            matches!(
                c.price_status,
                PriceStatus::Priced(_) | PriceStatus::Unavailable
            )
        })
        .map(|c| format!("{}: {}", c.name, compact_value(c.total_value)))
        .collect();

    if lines.is_empty() {
        return None;
    }

    let mut out = lines.join("\n");
    out.push_str(&format!("\nTotal: {}", compact_value(snapshot.grand_total)));
    Some(out)
}
