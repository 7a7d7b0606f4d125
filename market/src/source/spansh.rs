use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::{PricingSource, base_url, http_client};
use crate::errors::LookupError;
use crate::query::{MarketRequest, QueryBuilder, RangeQueryBuilder};
use crate::types::{PriceCandidate, PriceQuery, parse_recorded_at};

pub const DEFAULT_BASE_URL: &str = "https://spansh.co.uk/api/";
const SEARCH_PATH: &str = "stations/search";
const SEARCH_REFERENCE_URL: &str = "https://spansh.co.uk/stations/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<StationDto>,
    #[serde(default)]
    search_reference: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StationDto {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    system_name: Option<String>,
    #[serde(default)]
    distance: Option<f64>,
    #[serde(default)]
    distance_to_arrival: Option<f64>,
    #[serde(default)]
    market_updated_at: Option<String>,
    #[serde(default)]
    market: Vec<MarketEntryDto>,
}

#[derive(Debug, Deserialize)]
struct MarketEntryDto {
    #[serde(default)]
    commodity: Option<String>,
    #[serde(default)]
    sell_price: Option<f64>,
    #[serde(default)]
    demand: Option<f64>,
}

impl StationDto {
    /// The station's offer for `commodity`, if it lists one with a price.
    fn into_candidate(self, commodity: &str) -> Option<PriceCandidate> {
        let entry = self.market.iter().find(|e| {
            e.commodity
                .as_deref()
                .is_some_and(|name| name.trim().eq_ignore_ascii_case(commodity))
        })?;
        let sell_price = entry.sell_price?;

        Some(PriceCandidate {
            sell_price,
            station_name: self.name.unwrap_or_default(),
            system_name: self.system_name.unwrap_or_default(),
            distance_ly: self.distance,
            distance_to_arrival_ls: self.distance_to_arrival,
            demand: entry.demand,
            recorded_at: self.market_updated_at.as_deref().and_then(parse_recorded_at),
        })
    }
}

/// Client for the range-filter station search backend.
#[derive(Clone)]
pub struct SpanshClient {
    http: Client,
    endpoint: Url,
    builder: RangeQueryBuilder,
}

impl SpanshClient {
    pub fn new(base: &str, timeout: Duration) -> Result<Self, LookupError> {
        let endpoint = base_url(base)?.join(SEARCH_PATH)?;
        Ok(Self {
            http: http_client(timeout)?,
            endpoint,
            builder: RangeQueryBuilder,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl PricingSource for SpanshClient {
    fn name(&self) -> &'static str {
        "spansh"
    }

    #[instrument(
        skip(self, query),
        fields(commodity = %query.commodity, system = %query.reference_system),
        level = "debug"
    )]
    async fn search(&self, query: &PriceQuery) -> Result<Vec<PriceCandidate>, LookupError> {
        let MarketRequest::Body(body) = self.builder.build(query, Utc::now()) else {
            return Err(LookupError::InvalidResponse(
                "range builder produced a parameter request".into(),
            ));
        };

        debug!(url = %self.endpoint, %body, "posting station search");

        let resp = self.http.post(self.endpoint.clone()).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| LookupError::InvalidResponse(e.to_string()))?;

        if let Some(reference) = parsed.search_reference.as_deref().filter(|r| !r.is_empty()) {
            debug!(
                results_url = %format!("{SEARCH_REFERENCE_URL}/{reference}/1"),
                "station search reference"
            );
        }

        let raw_count = parsed.results.len();
        let candidates: Vec<PriceCandidate> = parsed
            .results
            .into_iter()
            .filter_map(|station| station.into_candidate(&query.commodity))
            .collect();

        debug!(raw_count, priced = candidates.len(), "station search parsed");
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_under_base_without_trailing_slash() {
        let client = SpanshClient::new("https://example.test/api", Duration::from_secs(1)).unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "https://example.test/api/stations/search"
        );
    }

    #[test]
    fn station_payload_maps_to_candidate() {
        let raw = serde_json::json!({
            "results": [
                {
                    "name": "Jameson Memorial",
                    "system_name": "Shinrarta Dezhra",
                    "distance": 12.5,
                    "distance_to_arrival": 350.0,
                    "market_updated_at": "2025-06-01 10:00:00+00",
                    "market": [
                        { "commodity": "Gold", "sell_price": 9000.0 },
                        { "commodity": "platinum", "sell_price": 210000.0, "demand": 4200.0 }
                    ]
                },
                {
                    "name": "No Platinum Here",
                    "market": [{ "commodity": "Gold", "sell_price": 1.0 }]
                }
            ],
            "search_reference": "abc"
        });
        let parsed: SearchResponse = serde_json::from_value(raw).unwrap();
        let candidates: Vec<_> = parsed
            .results
            .into_iter()
            .filter_map(|s| s.into_candidate("Platinum"))
            .collect();

        assert_eq!(candidates.len(), 1);
        let c = &candidates[0];
        assert_eq!(c.sell_price, 210000.0);
        assert_eq!(c.station_name, "Jameson Memorial");
        assert_eq!(c.distance_ly, Some(12.5));
        assert_eq!(c.demand, Some(4200.0));
        assert!(c.recorded_at.is_some());
    }

    #[test]
    fn entry_without_price_is_skipped() {
        let station: StationDto = serde_json::from_value(serde_json::json!({
            "name": "Unpriced",
            "market": [{ "commodity": "Platinum" }]
        }))
        .unwrap();
        assert!(station.into_candidate("Platinum").is_none());
    }
}
