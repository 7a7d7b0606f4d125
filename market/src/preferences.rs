//! Market search preferences.
//!
//! Raw values arrive as strings from whatever persists them. Each field is
//! validated on its own against the previous value: a malformed entry
//! reverts to what was there before instead of failing the whole load.
//! Whole snapshots pushed through [`PreferencesStore::apply`] are checked
//! against every invariant and rejected as a unit.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::types::{FilterConfig, SortMode};

pub const KEY_LARGE_PAD: &str = "market_large_pad";
pub const KEY_SORT_MODE: &str = "market_sort";
pub const KEY_MIN_DEMAND: &str = "market_min_demand";
pub const KEY_AGE_DAYS: &str = "market_age_days";
pub const KEY_DISTANCE_LY: &str = "market_distance_ly";
pub const KEY_DISTANCE_LS: &str = "market_distance_ls";
pub const KEY_INCLUDE_CARRIERS: &str = "market_include_carriers";
pub const KEY_INCLUDE_SURFACE: &str = "market_include_surface";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid filter configuration: {field} {reason}")]
    InvalidFilterConfiguration { field: &'static str, reason: String },

    #[error("unreadable commodity id table: {0}")]
    CommodityMap(String),
}

/// Raw persisted preference values keyed by the `KEY_*` constants.
pub type RawPreferences = HashMap<String, String>;

/// Positive integer; anything else keeps `previous`.
pub fn validate_positive_int(raw: &str, previous: u32) -> u32 {
    match raw.trim().parse::<u32>() {
        Ok(v) if v > 0 => v,
        _ => previous,
    }
}

/// Positive finite number; anything else keeps `previous`.
pub fn validate_positive_float(raw: &str, previous: f64) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => v,
        _ => previous,
    }
}

/// Nullable distance: blank clears it, a positive number sets it,
/// anything else keeps `previous`.
pub fn validate_optional_distance(raw: &str, previous: Option<f64>) -> Option<f64> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v > 0.0 => Some(v),
        _ => previous,
    }
}

pub fn validate_flag(raw: &str, previous: bool) -> bool {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" | "" => false,
        _ => previous,
    }
}

pub fn validate_sort_mode(raw: &str, previous: SortMode) -> SortMode {
    raw.parse().unwrap_or(previous)
}

/// Folds raw values over `previous`; keys that are missing keep their old value.
pub fn validate(raw: &RawPreferences, previous: &FilterConfig) -> FilterConfig {
    let mut cfg = previous.clone();
    let get = |key: &str| raw.get(key).map(String::as_str);

    if let Some(v) = get(KEY_LARGE_PAD) {
        cfg.require_large_pad = validate_flag(v, cfg.require_large_pad);
    }
    if let Some(v) = get(KEY_SORT_MODE) {
        cfg.sort_mode = validate_sort_mode(v, cfg.sort_mode);
    }
    if let Some(v) = get(KEY_MIN_DEMAND) {
        cfg.min_demand = validate_positive_int(v, cfg.min_demand);
    }
    if let Some(v) = get(KEY_AGE_DAYS) {
        cfg.max_age_days = validate_positive_int(v, cfg.max_age_days);
    }
    if let Some(v) = get(KEY_DISTANCE_LY) {
        cfg.max_distance_ly = validate_positive_float(v, cfg.max_distance_ly);
    }
    if let Some(v) = get(KEY_DISTANCE_LS) {
        cfg.max_arrival_distance_ls = validate_optional_distance(v, cfg.max_arrival_distance_ls);
    }
    if let Some(v) = get(KEY_INCLUDE_CARRIERS) {
        cfg.include_carriers = validate_flag(v, cfg.include_carriers);
    }
    if let Some(v) = get(KEY_INCLUDE_SURFACE) {
        cfg.include_surface_stations = validate_flag(v, cfg.include_surface_stations);
    }

    cfg
}

/// Holds the filter configuration currently in force and broadcasts changes.
///
/// Readers take a snapshot with `borrow().clone()` at the moment they need
/// one; later edits never reach a snapshot already taken.
pub struct PreferencesStore {
    tx: watch::Sender<FilterConfig>,
}

impl PreferencesStore {
    pub fn new(initial: FilterConfig) -> Result<Self, ConfigError> {
        initial.validate()?;
        let (tx, _rx) = watch::channel(initial);
        Ok(Self { tx })
    }

    pub fn current(&self) -> FilterConfig {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FilterConfig> {
        self.tx.subscribe()
    }

    /// Replaces the configuration. On error the prior configuration stays in effect.
    pub fn apply(&self, next: FilterConfig) -> Result<(), ConfigError> {
        if let Err(e) = next.validate() {
            warn!(error = %e, "rejected filter configuration; keeping previous");
            return Err(e);
        }
        self.tx.send_replace(next);
        info!("filter configuration updated");
        Ok(())
    }

    /// Applies raw field edits, reverting any malformed field individually.
    pub fn apply_raw(&self, raw: &RawPreferences) -> FilterConfig {
        let next = validate(raw, &self.current());
        debug!(?next, "raw preferences folded");
        self.tx.send_replace(next.clone());
        next
    }
}

impl Default for PreferencesStore {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(FilterConfig::default());
        Self { tx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawPreferences {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn malformed_fields_revert_individually() {
        let prev = FilterConfig::default();
        let next = validate(
            &raw(&[
                (KEY_MIN_DEMAND, "abc"),
                (KEY_AGE_DAYS, "7"),
                (KEY_DISTANCE_LY, "-4"),
                (KEY_SORT_MODE, "nearest"),
            ]),
            &prev,
        );

        assert_eq!(next.min_demand, prev.min_demand);
        assert_eq!(next.max_age_days, 7);
        assert_eq!(next.max_distance_ly, prev.max_distance_ly);
        assert_eq!(next.sort_mode, SortMode::Nearest);
    }

    #[test]
    fn blank_arrival_distance_clears_it() {
        let prev = FilterConfig::default();
        assert_eq!(prev.max_arrival_distance_ls, Some(5000.0));

        let cleared = validate(&raw(&[(KEY_DISTANCE_LS, "  ")]), &prev);
        assert_eq!(cleared.max_arrival_distance_ls, None);

        let kept = validate(&raw(&[(KEY_DISTANCE_LS, "far")]), &prev);
        assert_eq!(kept.max_arrival_distance_ls, Some(5000.0));
    }

    #[test]
    fn zero_is_not_a_valid_min_demand() {
        assert_eq!(validate_positive_int("0", 1000), 1000);
        assert_eq!(validate_positive_int(" 250 ", 1000), 250);
    }

    #[test]
    fn flags_accept_common_spellings() {
        assert!(validate_flag("yes", false));
        assert!(!validate_flag("0", true));
        assert!(validate_flag("maybe", true));
    }

    #[test]
    fn store_rejects_invalid_snapshot_and_keeps_prior() {
        let store = PreferencesStore::default();
        let before = store.current();

        let bad = FilterConfig {
            max_age_days: 0,
            ..FilterConfig::default()
        };
        assert!(store.apply(bad).is_err());
        assert_eq!(store.current(), before);
    }

    #[test]
    fn subscribers_see_new_snapshot_but_old_clones_do_not_change() {
        let store = PreferencesStore::default();
        let rx = store.subscribe();
        let snapshot = rx.borrow().clone();

        store
            .apply(FilterConfig {
                min_demand: 5,
                ..FilterConfig::default()
            })
            .unwrap();

        assert_eq!(rx.borrow().min_demand, 5);
        assert_eq!(snapshot.min_demand, 1000);
    }

    #[tokio::test]
    async fn raw_edits_wake_subscribers() -> anyhow::Result<()> {
        let store = PreferencesStore::default();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        let next = store.apply_raw(&raw(&[(KEY_LARGE_PAD, "on"), (KEY_MIN_DEMAND, "oops")]));

        rx.changed().await?;
        assert_eq!(*rx.borrow(), next);
        assert!(next.require_large_pad);
        assert_eq!(next.min_demand, 1000);
        Ok(())
    }
}
