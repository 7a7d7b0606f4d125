//! Translation of one [`PriceQuery`] into a backend-specific request.
//!
//! Each backend gets one [`QueryBuilder`] implementation. Shared rules:
//! demand is a lower bound only, freshness is a lower bound on the market
//! timestamp, optional constraints are left out entirely when unset, and
//! a market-existence filter is always on where the backend has one.

pub mod positional;
pub mod range;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::PriceQuery;

pub use positional::PositionalQueryBuilder;
pub use range::RangeQueryBuilder;

/// Upper bound synthesized for range-only backends when a filter is one-sided.
pub const MAX_RANGE_VALUE: u64 = 1_000_000_000;

/// A built request, in whichever shape the backend expects.
#[derive(Debug, Clone, PartialEq)]
pub enum MarketRequest {
    /// JSON document posted to the search endpoint.
    Body(Value),
    /// Flat key/value pairs appended to the search URL, in order.
    Params(Vec<(String, String)>),
}

impl MarketRequest {
    /// First value for `key` when this is a parameter request.
    pub fn param(&self, key: &str) -> Option<&str> {
        match self {
            MarketRequest::Params(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            MarketRequest::Body(_) => None,
        }
    }

    /// Filter object named `key` when this is a body request.
    pub fn filter(&self, key: &str) -> Option<&Value> {
        match self {
            MarketRequest::Body(body) => body.get("filters").and_then(|f| f.get(key)),
            MarketRequest::Params(_) => None,
        }
    }
}

pub trait QueryBuilder: Send + Sync {
    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;

    fn build(&self, query: &PriceQuery, now: DateTime<Utc>) -> MarketRequest;
}
