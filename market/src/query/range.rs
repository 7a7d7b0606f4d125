use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use super::{MAX_RANGE_VALUE, MarketRequest, QueryBuilder};
use crate::types::{PriceQuery, SortMode, StationCategory};

/// Results requested per search; selection happens client-side.
pub const RESULT_SIZE: u32 = 10;

const DOCKABLE_TYPES: &[&str] = &[
    "Asteroid base",
    "Coriolis Starport",
    "Dodec Starport",
    "Mega ship",
    "Ocellus Starport",
    "Orbis Starport",
    "Space Construction Depot",
];
const SURFACE_TYPES: &[&str] = &[
    "Dockable Planet Station",
    "Outpost",
    "Planetary Construction Depot",
    "Planetary Port",
    "Settlement",
    "Surface Settlement",
];
const CARRIER_TYPES: &[&str] = &["Drake-Class carrier"];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Builder for backends that express numeric constraints as inclusive ranges
/// inside a JSON filter document.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangeQueryBuilder;

impl RangeQueryBuilder {
    fn station_types(query: &PriceQuery) -> Vec<&'static str> {
        query
            .filter
            .station_categories()
            .into_iter()
            .flat_map(|category| match category {
                StationCategory::Dockable => DOCKABLE_TYPES,
                StationCategory::Surface => SURFACE_TYPES,
                StationCategory::Carrier => CARRIER_TYPES,
            })
            .copied()
            .collect()
    }

    fn sort(query: &PriceQuery) -> Value {
        match query.filter.sort_mode {
            SortMode::BestPrice => json!([
                { "market_sell_price": [{ "name": query.commodity, "direction": "desc" }] },
                { "distance": { "direction": "asc" } },
            ]),
            SortMode::Nearest => json!([{ "distance": { "direction": "asc" } }]),
        }
    }
}

impl QueryBuilder for RangeQueryBuilder {
    fn backend(&self) -> &'static str {
        "range"
    }

    fn build(&self, query: &PriceQuery, now: DateTime<Utc>) -> MarketRequest {
        let filter = &query.filter;
        let cutoff = filter.freshness_cutoff(now);

        let mut filters = serde_json::Map::new();
        filters.insert("has_market".into(), json!({ "value": true }));
        filters.insert("type".into(), json!({ "value": Self::station_types(query) }));
        filters.insert(
            "market".into(),
            json!([{
                "name": query.commodity,
                "demand": {
                    "comparison": "<=>",
                    "value": [filter.min_demand, MAX_RANGE_VALUE],
                },
            }]),
        );
        filters.insert(
            "distance".into(),
            json!({ "min": 0.0, "max": filter.max_distance_ly }),
        );
        filters.insert(
            "market_updated_at".into(),
            json!({
                "comparison": "<=>",
                "value": [
                    cutoff.format(TIMESTAMP_FORMAT).to_string(),
                    now.format(TIMESTAMP_FORMAT).to_string(),
                ],
            }),
        );

        if filter.require_large_pad {
            filters.insert("has_large_pad".into(), json!({ "value": true }));
        }

        if let Some(ls) = filter.max_arrival_distance_ls {
            filters.insert(
                "distance_to_arrival".into(),
                json!({ "comparison": "<=>", "value": [0.0, ls] }),
            );
        }

        MarketRequest::Body(json!({
            "filters": filters,
            "reference_system": query.reference_system,
            "sort": Self::sort(query),
            "size": RESULT_SIZE,
            "page": 0,
        }))
    }
}
