//! Google Shopping price lookup through SerpApi.

use super::{LookupError, PriceSource};
use crate::domain::{Credential, Decimal, ProductCode};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";

/// Marketplaces whose offers are not a realistic acquisition source.
pub const DEFAULT_EXCLUDED_SOURCES: [&str; 5] = ["ebay", "mercari", "poshmark", "amazon", "etsy"];

#[derive(Debug, Clone)]
pub struct SerpApiPriceSource {
    client: Client,
    base_url: String,
    excluded_sources: Vec<String>,
    max_retry: Duration,
}

impl SerpApiPriceSource {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            excluded_sources: DEFAULT_EXCLUDED_SOURCES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            max_retry: Duration::from_secs(30),
        }
    }

    pub fn default_url() -> Self {
        Self::new(DEFAULT_BASE_URL.to_string())
    }

    /// Replace the excluded marketplaces (matched case-insensitively).
    pub fn with_excluded_sources(mut self, sources: Vec<String>) -> Self {
        self.excluded_sources = sources.into_iter().map(|s| s.to_lowercase()).collect();
        self
    }

    /// Upper bound on time spent retrying rate limits and server errors.
    pub fn with_max_retry(mut self, max_retry: Duration) -> Self {
        self.max_retry = max_retry;
        self
    }

    async fn search(
        &self,
        query: &str,
        credential: &Credential,
        num: u32,
    ) -> Result<serde_json::Value, LookupError> {
        let url = format!("{}/search.json", self.base_url);
        let num = num.to_string();
        let params = [
            ("engine", "google_shopping"),
            ("q", query),
            ("api_key", credential.expose()),
            ("google_domain", "google.com"),
            ("gl", "us"),
            ("hl", "en"),
            ("num", num.as_str()),
        ];
        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(self.max_retry),
            ..Default::default()
        };

        retry(backoff, || async {
            self.fetch(&url, &params).await.map_err(|e| {
                if e.is_transient() {
                    warn!("SerpApi request failed, retrying: {}", e);
                    backoff::Error::transient(e)
                } else {
                    backoff::Error::permanent(e)
                }
            })
        })
        .await
    }

    async fn fetch(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<serde_json::Value, LookupError> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| LookupError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if status == 429 {
            return Err(LookupError::RateLimited);
        }
        if !status.is_success() {
            let message = if status.is_server_error() {
                "Server error"
            } else {
                "Client error"
            };
            return Err(LookupError::Http {
                status: status.as_u16(),
                message: message.to_string(),
            });
        }

        response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| LookupError::Parse(e.to_string()))
    }

    /// Probe the account with a one-result search; any 2xx means the key works.
    pub async fn verify_credential(&self, credential: &Credential) -> Result<(), LookupError> {
        debug!("Verifying credential {}", credential.prefix());
        self.search("test", credential, 1).await.map(|_| ())
    }
}

#[async_trait]
impl PriceSource for SerpApiPriceSource {
    async fn lowest_price(
        &self,
        code: &ProductCode,
        credential: &Credential,
    ) -> Result<Decimal, LookupError> {
        if code.is_empty() {
            return Err(LookupError::MissingProductCode);
        }
        debug!(
            "Searching shopping results for code={} key={}",
            code,
            credential.prefix()
        );

        let response = self.search(code.as_str(), credential, 5).await?;
        if let Some(message) = response.get("error").and_then(|v| v.as_str()) {
            // No-results searches come back 200 with an error message.
            debug!("SerpApi reported for code={}: {}", code, message);
            return Err(LookupError::NotFound);
        }
        lowest_offer(&response, &self.excluded_sources).ok_or(LookupError::NotFound)
    }
}

/// Cheapest non-zero offer whose store is not excluded.
fn lowest_offer(response: &serde_json::Value, excluded: &[String]) -> Option<Decimal> {
    let results = response.get("shopping_results")?.as_array()?;

    results
        .iter()
        .filter_map(|item| {
            let price = match parse_price(item.get("extracted_price")?) {
                Some(price) => price,
                None => {
                    warn!("Ignoring offer with unreadable price: {}", item);
                    return None;
                }
            };
            if !price.is_positive() {
                return None;
            }
            let store = item
                .get("source")
                .and_then(|v| v.as_str())
                .unwrap_or("Unknown")
                .to_lowercase();
            if excluded.iter().any(|x| store.contains(x.as_str())) {
                return None;
            }
            Some(price)
        })
        .min()
}

fn parse_price(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str_canonical(&n.to_string()).ok(),
        serde_json::Value::String(s) => Decimal::from_str_canonical(s).ok(),
        _ => None,
    }
}
