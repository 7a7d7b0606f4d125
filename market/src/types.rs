use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::preferences::ConfigError;

/// Ordering applied when a backend returns several candidate stations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    BestPrice,
    Nearest,
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SortMode::BestPrice => "best_price",
            SortMode::Nearest => "nearest",
        };
        f.write_str(s)
    }
}

impl FromStr for SortMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "best_price" | "bestprice" | "best" => Ok(SortMode::BestPrice),
            "nearest" => Ok(SortMode::Nearest),
            other => Err(ConfigError::InvalidFilterConfiguration {
                field: "sort_mode",
                reason: format!("unknown sort mode {other:?}"),
            }),
        }
    }
}

/// Station categories a market query may cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationCategory {
    /// Orbital starports, outposts in space, megaships. Always searched.
    Dockable,
    /// Planetary ports and settlements.
    Surface,
    /// Player-owned fleet carriers.
    Carrier,
}

/// The unified, user-configured market search constraints.
///
/// Snapshots are immutable: a lookup job carries the value that was current
/// when the job was created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub require_large_pad: bool,
    pub sort_mode: SortMode,
    pub min_demand: u32,
    pub max_age_days: u32,
    pub max_distance_ly: f64,
    pub max_arrival_distance_ls: Option<f64>,
    pub include_carriers: bool,
    pub include_surface_stations: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            require_large_pad: false,
            sort_mode: SortMode::BestPrice,
            min_demand: 1000,
            max_age_days: 30,
            max_distance_ly: 100.0,
            max_arrival_distance_ls: Some(5000.0),
            include_carriers: true,
            include_surface_stations: true,
        }
    }
}

impl FilterConfig {
    /// Checks every field invariant; the first violation is reported.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_demand == 0 {
            return Err(invalid("min_demand", "must be greater than zero"));
        }
        if self.max_age_days == 0 {
            return Err(invalid("max_age_days", "must be greater than zero"));
        }
        if !(self.max_distance_ly.is_finite() && self.max_distance_ly > 0.0) {
            return Err(invalid("max_distance_ly", "must be a positive number"));
        }
        if self
            .max_arrival_distance_ls
            .is_some_and(|ls| !(ls.is_finite() && ls > 0.0))
        {
            return Err(invalid(
                "max_arrival_distance_ls",
                "must be a positive number or unset",
            ));
        }
        Ok(())
    }

    /// Categories to search: the dockable set, plus each opted-in extra.
    pub fn station_categories(&self) -> Vec<StationCategory> {
        let mut out = vec![StationCategory::Dockable];
        if self.include_carriers {
            out.push(StationCategory::Carrier);
        }
        if self.include_surface_stations {
            out.push(StationCategory::Surface);
        }
        out
    }

    /// Freshness window expressed in whole hours.
    pub fn max_age_hours(&self) -> u64 {
        u64::from(self.max_age_days) * 24
    }

    /// Oldest acceptable market timestamp relative to `now`.
    ///
    /// Windows reaching past the representable range start at the earliest
    /// representable instant, which accepts any timestamp.
    pub fn freshness_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(chrono::Duration::days(i64::from(self.max_age_days)))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::InvalidFilterConfiguration {
        field,
        reason: reason.to_string(),
    }
}

/// One backend query: which name to search, around which system, under which filters.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuery {
    pub commodity: String,
    pub reference_system: String,
    pub filter: FilterConfig,
}

/// A station offer returned by a pricing source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceCandidate {
    pub sell_price: f64,
    pub station_name: String,
    pub system_name: String,
    pub distance_ly: Option<f64>,
    pub distance_to_arrival_ls: Option<f64>,
    pub demand: Option<f64>,
    pub recorded_at: Option<DateTime<Utc>>,
}

/// Parses backend timestamps: RFC 3339, or a naive `YYYY-MM-DD HH:MM:SS` read as UTC.
pub fn parse_recorded_at(raw: &str) -> Option<DateTime<Utc>> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(candidate) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M:%S%#z", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| {
            DateTime::parse_from_str(candidate, fmt)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    chrono::NaiveDateTime::parse_from_str(candidate, fmt)
                        .ok()
                        .map(|naive| naive.and_utc())
                })
        })
}
