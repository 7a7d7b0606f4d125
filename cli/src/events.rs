//! JSON-lines replay input.
//!
//! One event per line, e.g.
//! `{"event":"delta","name":"Platinum","canonical":"platinum","tons":4}`.
//! Blank lines and lines starting with `#` are skipped.

use anyhow::Context;
use serde::Deserialize;
use session::model::InventoryDelta;

const DEFAULT_WAIT_MS: u64 = 30_000;

fn default_wait_ms() -> u64 {
    DEFAULT_WAIT_MS
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ReplayEvent {
    Begin {
        system: String,
    },
    Pause,
    Resume,
    End,
    Delta {
        name: String,
        #[serde(default)]
        canonical: String,
        tons: i64,
    },
    /// Blocks until no lookup is pending, or the timeout passes.
    Wait {
        #[serde(default = "default_wait_ms")]
        timeout_ms: u64,
    },
}

impl ReplayEvent {
    pub fn as_delta(&self) -> Option<InventoryDelta> {
        match self {
            ReplayEvent::Delta {
                name,
                canonical,
                tons,
            } => Some(InventoryDelta {
                localized_name: name.clone(),
                canonical_name: canonical.clone(),
                delta_tons: *tons,
            }),
            _ => None,
        }
    }
}

pub fn parse_events(text: &str) -> anyhow::Result<Vec<ReplayEvent>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("bad event on line {}", i + 1))
        })
        .collect()
}
