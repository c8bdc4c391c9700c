use crate::{error::SourceError, source::PriceSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_STATUS: &str = "error";

/// Body of the `/price` endpoint. Error responses reuse the same shape with
/// `status = "error"` and a `message`.
#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    price: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Twelve Data REST client for the latest spot price of a symbol.
#[derive(Debug, Clone)]
pub struct TwelveDataClient {
    http: reqwest::Client,
    base_url: Url,
    mic_code: Option<String>,
}

impl TwelveDataClient {
    /// Creates a client for the API rooted at `base_url`
    /// (e.g., `https://api.twelvedata.com`).
    pub fn new(base_url: &str, mic_code: Option<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .with_context(|| format!("Invalid Twelve Data base URL: {}", base_url))?;
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url,
            mic_code: mic_code.filter(|code| !code.is_empty()),
        })
    }

    fn price_url(&self, symbol: &str, api_key: &str) -> Result<Url> {
        let mut url = self
            .base_url
            .join("price")
            .context("Failed to build price URL")?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("symbol", symbol);
            query.append_pair("apikey", api_key);
            if let Some(mic_code) = &self.mic_code {
                query.append_pair("mic_code", mic_code);
            }
        }
        Ok(url)
    }

    async fn request(&self, symbol: &str, api_key: &str) -> Result<PriceResponse> {
        let url = self.price_url(symbol, api_key)?;
        // The body is parsed whatever the HTTP status: errors come back as JSON too.
        // The URL carries the API key, so it is stripped from every error.
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(reqwest::Error::without_url)
            .context("Price request failed")?;
        let status = response.status();
        response
            .json::<PriceResponse>()
            .await
            .map_err(reqwest::Error::without_url)
            .with_context(|| format!("Failed to parse price response (HTTP {})", status))
    }
}

#[async_trait]
impl PriceSource for TwelveDataClient {
    #[instrument(skip(self, api_key), level = "debug")]
    async fn fetch(&self, symbol: &str, api_key: &str) -> Result<String, SourceError> {
        let response = self
            .request(symbol, api_key)
            .await
            .map_err(SourceError::Fetch)?;

        if response.status == ERROR_STATUS {
            return Err(SourceError::Upstream(response.message));
        }

        debug!(price = %response.price, status = %response.status, "Received price from Twelve Data");
        Ok(response.price)
    }
}
