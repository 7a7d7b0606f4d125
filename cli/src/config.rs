use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use dispatcher::DispatcherConfig;
use market::commodity_ids::CommodityIds;
use market::preferences::{self, ConfigError, RawPreferences};
use market::query::{PositionalQueryBuilder, QueryBuilder, RangeQueryBuilder};
use market::source::{InaraClient, PricingSource, SpanshClient, inara, spansh};
use market::types::FilterConfig;
use tracing::warn;

/// Which pricing service answers lookups.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PriceBackend {
    /// Range filters posted as JSON.
    Spansh,
    /// Positional URL parameters.
    Inara,
}

impl FromStr for PriceBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spansh" => Ok(PriceBackend::Spansh),
            "inara" => Ok(PriceBackend::Inara),
            other => Err(format!("unknown price backend {other:?}")),
        }
    }
}

/// Environment variable for each market preference key.
const PREFERENCE_VARS: [(&str, &str); 8] = [
    ("MARKET_LARGE_PAD", preferences::KEY_LARGE_PAD),
    ("MARKET_SORT", preferences::KEY_SORT_MODE),
    ("MARKET_MIN_DEMAND", preferences::KEY_MIN_DEMAND),
    ("MARKET_AGE_DAYS", preferences::KEY_AGE_DAYS),
    ("MARKET_DISTANCE_LY", preferences::KEY_DISTANCE_LY),
    ("MARKET_DISTANCE_LS", preferences::KEY_DISTANCE_LS),
    ("MARKET_INCLUDE_CARRIERS", preferences::KEY_INCLUDE_CARRIERS),
    ("MARKET_INCLUDE_SURFACE", preferences::KEY_INCLUDE_SURFACE),
];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub backend: PriceBackend,
    pub spansh_api_url: String,
    pub inara_api_url: String,
    /// JSON name -> id table the positional backend searches by.
    pub inara_commodity_map: Option<PathBuf>,

    // =========================
    // Lookup dispatch
    // =========================
    /// Upper bound on one search call. A timeout is treated as zero results,
    /// so the canonical-name retry still runs.
    pub lookup_timeout_ms: u64,

    /// Lookups allowed to hit the pricing service at the same time.
    pub lookup_concurrency: usize,

    /// Capacity of the ledger -> dispatcher job queue. When it is full a new
    /// commodity is marked unavailable rather than blocking delta handling.
    pub lookup_queue_capacity: usize,

    /// Capacity of the ledger actor's command inbox.
    pub ledger_inbox_capacity: usize,

    // =========================
    // Market preferences
    // =========================
    pub filter: FilterConfig,

    /// Structured JSON logs (`APP_ENV=production`).
    pub json_logs: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset or malformed values
    /// fall back to their defaults.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let backend = match get("PRICE_BACKEND") {
            Some(raw) => raw.parse().unwrap_or_else(|err: String| {
                warn!(error = %err, "falling back to spansh");
                PriceBackend::Spansh
            }),
            None => PriceBackend::Spansh,
        };

        let raw: RawPreferences = PREFERENCE_VARS
            .iter()
            .filter_map(|(var, key)| get(var).map(|v| (key.to_string(), v)))
            .collect();
        let filter = preferences::validate(&raw, &FilterConfig::default());

        Self {
            backend,
            spansh_api_url: get("SPANSH_API_URL")
                .unwrap_or_else(|| spansh::DEFAULT_BASE_URL.to_string()),
            inara_api_url: get("INARA_API_URL")
                .unwrap_or_else(|| inara::DEFAULT_BASE_URL.to_string()),
            inara_commodity_map: get("INARA_COMMODITY_MAP")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            lookup_timeout_ms: parse_or("LOOKUP_TIMEOUT_MS", get("LOOKUP_TIMEOUT_MS"), 15_000),
            lookup_concurrency: parse_or("LOOKUP_CONCURRENCY", get("LOOKUP_CONCURRENCY"), 2),
            lookup_queue_capacity: parse_or(
                "LOOKUP_QUEUE_CAPACITY",
                get("LOOKUP_QUEUE_CAPACITY"),
                64,
            ),
            ledger_inbox_capacity: parse_or(
                "LEDGER_INBOX_CAPACITY",
                get("LEDGER_INBOX_CAPACITY"),
                session::actor::DEFAULT_INBOX_CAPACITY,
            ),

            filter,
            json_logs: get("APP_ENV").is_some_and(|v| v == "production"),
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            concurrency: self.lookup_concurrency,
            attempt_timeout: Duration::from_millis(self.lookup_timeout_ms),
            ..DispatcherConfig::default()
        }
    }

    /// Id table for the positional backend; empty when no path is configured.
    pub fn commodity_ids(&self) -> Result<CommodityIds, ConfigError> {
        let Some(path) = &self.inara_commodity_map else {
            warn!("INARA_COMMODITY_MAP not set; positional searches will find nothing");
            return Ok(CommodityIds::default());
        };
        let ids = CommodityIds::load(path)?;
        tracing::info!(path = %path.display(), commodities = ids.len(), "commodity id table loaded");
        Ok(ids)
    }

    pub fn build_source(&self) -> anyhow::Result<Arc<dyn PricingSource>> {
        // The HTTP client gets a little headroom so the dispatcher's own
        // timeout is the one that fires.
        let http_timeout = Duration::from_millis(self.lookup_timeout_ms + 1_000);

        Ok(match self.backend {
            PriceBackend::Spansh => Arc::new(SpanshClient::new(&self.spansh_api_url, http_timeout)?),
            PriceBackend::Inara => {
                let ids = self.commodity_ids().context("commodity id table")?;
                Arc::new(InaraClient::new(&self.inara_api_url, http_timeout, ids)?)
            }
        })
    }

    pub fn query_builder(&self) -> anyhow::Result<Box<dyn QueryBuilder>> {
        Ok(match self.backend {
            PriceBackend::Spansh => Box::new(RangeQueryBuilder),
            PriceBackend::Inara => {
                let ids = self.commodity_ids().context("commodity id table")?;
                Box::new(PositionalQueryBuilder::new(ids))
            }
        })
    }
}

fn parse_or<T: FromStr + Copy>(var: &str, raw: Option<String>, default: T) -> T {
    match raw {
        None => default,
        Some(v) => v.trim().parse().unwrap_or_else(|_| {
            warn!(var, value = %v, "unparseable setting; using default");
            default
        }),
    }
}
