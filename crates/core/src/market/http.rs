use crate::config::Settings;
use crate::error::{BotError, Result};
use crate::market::{MarketDataProvider, PriceQuote};
use anyhow::Context;
use reqwest::StatusCode;
use std::time::Duration;

/// Plain JSON-over-HTTP quote endpoint: `GET {base_url}{symbol}`.
#[derive(Debug, Clone)]
pub struct HttpMarketDataProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HttpMarketDataProvider {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let base_url = settings.require_stock_price_url()?.to_string();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.http_timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self { http, base_url })
    }

    fn url(&self, symbol: &str) -> String {
        format!("{}{}", self.base_url, symbol)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for HttpMarketDataProvider {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_performance(&self, symbol: &str) -> Result<PriceQuote> {
        let res = self
            .http
            .get(self.url(symbol))
            .send()
            .await
            .map_err(|e| BotError::UpstreamUnavailable(format!("request failed: {e}")))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| BotError::UpstreamUnavailable(format!("failed to read body: {e}")))?;

        check_status(symbol, status, &text)?;
        parse_quote(&text)
    }
}

fn check_status(symbol: &str, status: StatusCode, body: &str) -> Result<()> {
    if status == StatusCode::NOT_FOUND {
        return Err(BotError::SymbolNotFound(symbol.to_string()));
    }
    if !status.is_success() {
        return Err(BotError::UpstreamUnavailable(format!(
            "market data HTTP {status}: {body}"
        )));
    }
    Ok(())
}

fn parse_quote(body: &str) -> Result<PriceQuote> {
    let quote = serde_json::from_str::<PriceQuote>(body).map_err(|e| {
        BotError::UpstreamUnavailable(format!("unexpected market data payload ({e}): {body}"))
    })?;
    if !quote.current_price.is_finite() {
        return Err(BotError::UpstreamUnavailable(format!(
            "non-finite current price for {}",
            quote.symbol
        )));
    }
    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_expected_shape() {
        let body = json!({
            "symbol": "HINDUNILVR.NS",
            "current_price": 2450.5,
            "open_price": 2440.0,
            "price_1m": 2400.0,
            "price_1y": 2600.0,
            "price_5y": 1800.0
        })
        .to_string();

        let quote = parse_quote(&body).unwrap();
        assert_eq!(quote.symbol, "HINDUNILVR.NS");
        assert_eq!(quote.price_1m, Some(2400.0));
        assert_eq!(quote.price_5y, Some(1800.0));
    }

    #[test]
    fn missing_history_deserializes_as_none() {
        let body = json!({
            "symbol": "NEWIPO.NS",
            "current_price": 10.0,
            "open_price": 9.5
        })
        .to_string();

        let quote = parse_quote(&body).unwrap();
        assert_eq!(quote.price_1m, None);
        assert_eq!(quote.price_1y, None);
    }

    #[test]
    fn rejects_non_numeric_prices() {
        let body = json!({
            "symbol": "HUL.NS",
            "current_price": "2450.5",
            "open_price": 2440.0
        })
        .to_string();
        assert!(matches!(
            parse_quote(&body),
            Err(BotError::UpstreamUnavailable(_))
        ));
    }

    #[test]
    fn maps_status_codes() {
        assert!(matches!(
            check_status("ZZZ.NS", StatusCode::NOT_FOUND, ""),
            Err(BotError::SymbolNotFound(s)) if s == "ZZZ.NS"
        ));
        assert!(matches!(
            check_status("HUL.NS", StatusCode::BAD_GATEWAY, "oops"),
            Err(BotError::UpstreamUnavailable(_))
        ));
        assert!(check_status("HUL.NS", StatusCode::OK, "{}").is_ok());
    }

    #[test]
    fn builds_url_by_appending_symbol() {
        let settings = Settings {
            stock_price_url: Some("https://quotes.example.com/v1/quote/".into()),
            ..Settings::default()
        };
        let provider = HttpMarketDataProvider::from_settings(&settings).unwrap();
        assert_eq!(
            provider.url("TCS.NS"),
            "https://quotes.example.com/v1/quote/TCS.NS"
        );
    }
}
