use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::{MarketRequest, QueryBuilder};
use crate::commodity_ids::CommodityIds;
use crate::types::{PriceQuery, SortMode, StationCategory};

const SORT_BEST_PRICE: &str = "1";
const SORT_NEAREST: &str = "3";
const LARGE_PAD: &str = "3";

/// Builder for backends taking flat, positionally-named URL parameters.
///
/// Surface stations and carriers are exclusion flags on this backend:
/// `0` adds the category to the search, `1` leaves it out.
///
/// The backend searches by numeric commodity id. Names missing from the id
/// table are sent as-is; [`PositionalQueryBuilder::commodity_id`] lets a
/// client skip those instead.
#[derive(Debug, Clone, Default)]
pub struct PositionalQueryBuilder {
    ids: Arc<CommodityIds>,
}

impl PositionalQueryBuilder {
    pub fn new(ids: CommodityIds) -> Self {
        Self { ids: Arc::new(ids) }
    }

    pub fn commodity_id(&self, name: &str) -> Option<u32> {
        self.ids.get(name)
    }
}

impl QueryBuilder for PositionalQueryBuilder {
    fn backend(&self) -> &'static str {
        "positional"
    }

    fn build(&self, query: &PriceQuery, _now: DateTime<Utc>) -> MarketRequest {
        let filter = &query.filter;
        let categories = filter.station_categories();
        let excluded = |c: StationCategory| if categories.contains(&c) { "0" } else { "1" };

        let sort = match filter.sort_mode {
            SortMode::BestPrice => SORT_BEST_PRICE,
            SortMode::Nearest => SORT_NEAREST,
        };

        let commodity = match self.commodity_id(&query.commodity) {
            Some(id) => id.to_string(),
            None => query.commodity.clone(),
        };

        let mut params: Vec<(String, String)> = vec![
            ("formbrief".into(), "1".into()),
            ("pi1".into(), "2".into()),
            ("pa1[]".into(), commodity),
            ("ps1".into(), query.reference_system.clone()),
            ("pi10".into(), sort.into()),
            ("pi11".into(), (filter.max_distance_ly as u64).to_string()),
            ("pi4".into(), excluded(StationCategory::Surface).into()),
            ("pi8".into(), excluded(StationCategory::Carrier).into()),
            ("pi13".into(), "0".into()),
            ("pi12".into(), "0".into()),
            ("pi14".into(), "0".into()),
            ("ps3".into(), String::new()),
            ("pi7".into(), filter.min_demand.to_string()),
            ("pi5".into(), filter.max_age_hours().to_string()),
        ];

        if filter.require_large_pad {
            params.push(("pi3".into(), LARGE_PAD.into()));
        }

        if let Some(ls) = filter.max_arrival_distance_ls {
            params.push(("pi9".into(), (ls as u64).to_string()));
        }

        MarketRequest::Params(params)
    }
}
