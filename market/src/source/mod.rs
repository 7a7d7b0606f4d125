pub mod inara;
pub mod spansh;

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::LookupError;
use crate::types::{PriceCandidate, PriceQuery};

pub use inara::InaraClient;
pub use spansh::SpanshClient;

/// Default per-request timeout applied by the HTTP clients.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// A pricing backend: one search for the stations buying a commodity.
///
/// Implementations return every candidate the backend produced, unfiltered;
/// freshness and selection are applied by the caller.
#[async_trait]
pub trait PricingSource: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &PriceQuery) -> Result<Vec<PriceCandidate>, LookupError>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, LookupError> {
    let http = reqwest::Client::builder()
        .user_agent(concat!("ore-tally/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(30))
        .tcp_keepalive(Duration::from_secs(30))
        .build()?;
    Ok(http)
}

/// Parses `base` and makes sure relative joins land beneath it.
pub(crate) fn base_url(base: &str) -> Result<reqwest::Url, LookupError> {
    let mut normalized = base.trim().to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Ok(reqwest::Url::parse(&normalized)?)
}
