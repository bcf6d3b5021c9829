//! # Market Price Oracle
//!
//! [`PriceOracle`] is the one-shot price lookup used by the price feed.
//! [`HttpPriceOracle`] implements it against a Binance-style 24h ticker endpoint.
//!
//! ## Response Format
//!
//! `GET {base}?symbol=DOTUSDT` returns (among other fields):
//!
//! ```json
//! { "symbol": "DOTUSDT", "lastPrice": "4.21300000", "priceChangePercent": "-1.752" }
//! ```
//!
//! Both values arrive as strings and are parsed into exact decimals; no float ever
//! touches a price.

use crate::error::{Result, StakingError};
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Latest market price and its 24h change percentage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub last_price: Decimal,
    pub change: Decimal,
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    /// Fetch the current quote for a market ticker such as `"DOTUSDT"`.
    async fn fetch_price(&self, ticker: &str) -> Result<PriceQuote>;
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TickerResponse {
    last_price: Decimal,
    price_change_percent: Decimal,
}

/// Parse a 24h ticker response body.
pub fn parse_ticker(body: &str) -> Result<PriceQuote> {
    let ticker: TickerResponse = serde_json::from_str(body)
        .map_err(|e| StakingError::Oracle(format!("Unexpected ticker response: {}", e)))?;

    if ticker.last_price.is_sign_negative() {
        return Err(StakingError::Oracle(format!(
            "Negative last price {}",
            ticker.last_price
        )));
    }

    Ok(PriceQuote {
        last_price: ticker.last_price,
        change: ticker.price_change_percent,
    })
}

/// HTTP client for the 24h ticker endpoint.
pub struct HttpPriceOracle {
    http: Client,
    base_url: String,
}

impl HttpPriceOracle {
    /// Create a new oracle client.
    ///
    /// # Arguments
    /// * `base_url` - Ticker endpoint, queried with `?symbol=<TICKER>`
    /// * `timeout` - Per-request timeout
    ///
    /// # Returns
    /// * `Ok(HttpPriceOracle)` - Client ready to use
    /// * `Err(StakingError::Oracle)` - The HTTP client could not be built
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StakingError::Oracle(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn fetch_price(&self, ticker: &str) -> Result<PriceQuote> {
        debug!(ticker, "Fetching ticker price");

        let response = self
            .http
            .get(&self.base_url)
            .query(&[("symbol", ticker)])
            .send()
            .await
            .map_err(|e| {
                warn!(ticker, "Ticker request failed: {}", e);
                StakingError::Oracle(format!("Request failed: {}", e))
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StakingError::Oracle(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(StakingError::Oracle(format!(
                "Ticker endpoint returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let quote = parse_ticker(&body)?;
        debug!(ticker, price = %quote.last_price, change = %quote.change, "Ticker price received");
        Ok(quote)
    }
}
