use std::collections::HashMap;

use market::types::PriceCandidate;
use serde::Serialize;
use tracing::{debug, warn};

use crate::model::SessionId;

/// Where a commodity's price lookup stands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "price", rename_all = "snake_case")]
pub enum PriceStatus {
    NotQueried,
    Pending,
    Priced(f64),
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommodityEntry {
    pub localized_name: String,
    pub canonical_name: String,
    pub tons: u64,
    pub status: PriceStatus,
    /// Station the cached price came from, when priced.
    pub source: Option<PriceCandidate>,
    /// Set the first time tonnage goes above zero; never cleared.
    seen_positive: bool,
}

impl CommodityEntry {
    fn new(localized_name: &str, canonical_name: &str) -> Self {
        Self {
            localized_name: localized_name.to_string(),
            canonical_name: canonical_name.to_string(),
            tons: 0,
            status: PriceStatus::NotQueried,
            source: None,
            seen_positive: false,
        }
    }

    pub fn unit_price(&self) -> Option<f64> {
        match self.status {
            PriceStatus::Priced(p) => Some(p),
            _ => None,
        }
    }

    /// `tons × price` when priced, otherwise zero.
    pub fn estimated_value(&self) -> f64 {
        self.unit_price().map_or(0.0, |p| p * self.tons as f64)
    }
}

/// What applying one delta did to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeltaApplied {
    pub key: String,
    pub tons: u64,
    /// True exactly once per commodity per session: the first 0 → >0 transition.
    pub first_positive: bool,
}

/// Lookup key for a commodity: its display name, trimmed and case-folded.
pub fn commodity_key(localized_name: &str, canonical_name: &str) -> Option<String> {
    [localized_name, canonical_name]
        .iter()
        .map(|n| n.trim())
        .find(|n| !n.is_empty())
        .map(str::to_lowercase)
}

/// Per-session commodity entries keyed by [`commodity_key`].
#[derive(Debug, Clone)]
pub struct CommodityLedger {
    session_id: SessionId,
    entries: HashMap<String, CommodityEntry>,
}

impl CommodityLedger {
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            entries: HashMap::new(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn get(&self, key: &str) -> Option<&CommodityEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut CommodityEntry> {
        self.entries.get_mut(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CommodityEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Applies a tonnage change, clamping at zero. Unseen commodities get a
    /// fresh `NotQueried` entry. Returns `None` when both names are blank.
    pub fn apply_delta(
        &mut self,
        localized_name: &str,
        canonical_name: &str,
        delta_tons: i64,
    ) -> Option<DeltaApplied> {
        let Some(key) = commodity_key(localized_name, canonical_name) else {
            warn!(delta_tons, "inventory delta without a commodity name; ignored");
            return None;
        };

        let display = if localized_name.trim().is_empty() {
            canonical_name.trim()
        } else {
            localized_name.trim()
        };

        let entry = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| CommodityEntry::new(display, canonical_name.trim()));

        if entry.canonical_name.is_empty() && !canonical_name.trim().is_empty() {
            entry.canonical_name = canonical_name.trim().to_string();
        }

        let before = entry.tons;
        entry.tons = if delta_tons >= 0 {
            before.saturating_add(delta_tons.unsigned_abs())
        } else {
            before.saturating_sub(delta_tons.unsigned_abs())
        };

        let first_positive = !entry.seen_positive && entry.tons > 0;
        if first_positive {
            entry.seen_positive = true;
        }

        debug!(
            commodity = %key,
            before,
            after = entry.tons,
            first_positive,
            "commodity tonnage changed"
        );

        Some(DeltaApplied {
            key,
            tons: entry.tons,
            first_positive,
        })
    }
}
