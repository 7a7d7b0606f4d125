use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{PricingSource, base_url, http_client};
use crate::commodity_ids::CommodityIds;
use crate::errors::LookupError;
use crate::query::{MarketRequest, PositionalQueryBuilder, QueryBuilder};
use crate::types::{PriceCandidate, PriceQuery, parse_recorded_at};

pub const DEFAULT_BASE_URL: &str = "https://inara.cz/elite/commodities/";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RowsEnvelope {
    Wrapped { results: Vec<RowDto> },
    Bare(Vec<RowDto>),
}

#[derive(Debug, Deserialize)]
struct RowDto {
    #[serde(default, alias = "station")]
    station_name: Option<String>,
    #[serde(default, alias = "system")]
    system_name: Option<String>,
    #[serde(default, alias = "price")]
    sell_price: Option<f64>,
    #[serde(default, alias = "distance")]
    distance_ly: Option<f64>,
    #[serde(default, alias = "distance_to_arrival")]
    distance_to_arrival_ls: Option<f64>,
    #[serde(default)]
    demand: Option<f64>,
    #[serde(default, alias = "updated_at")]
    recorded_at: Option<String>,
}

impl RowDto {
    fn into_candidate(self) -> Option<PriceCandidate> {
        Some(PriceCandidate {
            sell_price: self.sell_price?,
            station_name: self.station_name.unwrap_or_default(),
            system_name: self.system_name.unwrap_or_default(),
            distance_ly: self.distance_ly,
            distance_to_arrival_ls: self.distance_to_arrival_ls,
            demand: self.demand,
            recorded_at: self.recorded_at.as_deref().and_then(parse_recorded_at),
        })
    }
}

/// Client for the positional-parameter commodity search backend.
#[derive(Clone)]
pub struct InaraClient {
    http: Client,
    endpoint: Url,
    builder: PositionalQueryBuilder,
}

impl InaraClient {
    pub fn new(base: &str, timeout: Duration, ids: CommodityIds) -> Result<Self, LookupError> {
        Ok(Self {
            http: http_client(timeout)?,
            endpoint: base_url(base)?,
            builder: PositionalQueryBuilder::new(ids),
        })
    }

    /// Full search URL for `query`, as it would be requested.
    pub fn search_url(&self, query: &PriceQuery) -> Url {
        let mut url = self.endpoint.clone();
        if let MarketRequest::Params(params) = self.builder.build(query, Utc::now()) {
            url.query_pairs_mut().extend_pairs(params);
        }
        url
    }
}

#[async_trait]
impl PricingSource for InaraClient {
    fn name(&self) -> &'static str {
        "inara"
    }

    #[instrument(
        skip(self, query),
        fields(commodity = %query.commodity, system = %query.reference_system),
        level = "debug"
    )]
    async fn search(&self, query: &PriceQuery) -> Result<Vec<PriceCandidate>, LookupError> {
        if self.builder.commodity_id(&query.commodity).is_none() {
            debug!("no commodity id for this name; nothing to search");
            return Ok(Vec::new());
        }

        let url = self.search_url(query);
        debug!(%url, "requesting commodity search");

        let resp = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let rows = match resp
            .json::<RowsEnvelope>()
            .await
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))?
        {
            RowsEnvelope::Wrapped { results } => results,
            RowsEnvelope::Bare(rows) => rows,
        };

        let raw_count = rows.len();
        let candidates: Vec<PriceCandidate> = rows
            .into_iter()
            .filter_map(RowDto::into_candidate)
            .collect();

        debug!(raw_count, priced = candidates.len(), "commodity search parsed");
        Ok(candidates)
    }
}
