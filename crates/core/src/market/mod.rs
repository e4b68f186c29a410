use crate::domain::performance::Period;
use crate::error::Result;
use serde::{Deserialize, Serialize};

pub mod http;

pub use http::HttpMarketDataProvider;

/// Raw prices for one symbol as returned by the market-data endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: String,
    pub current_price: f64,
    pub open_price: f64,
    #[serde(default)]
    pub price_1m: Option<f64>,
    #[serde(default)]
    pub price_1y: Option<f64>,
    #[serde(default)]
    pub price_5y: Option<f64>,
}

impl PriceQuote {
    pub fn historical(&self, period: Period) -> Option<f64> {
        match period {
            Period::OneMonth => self.price_1m,
            Period::OneYear => self.price_1y,
            Period::FiveYears => self.price_5y,
        }
    }
}

/// Fails with `UpstreamUnavailable` or `SymbolNotFound`. Implementations do not retry.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_performance(&self, symbol: &str) -> Result<PriceQuote>;
}
