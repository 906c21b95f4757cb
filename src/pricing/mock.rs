//! Mock price source for testing without network calls.

use super::{LookupError, PriceSource};
use crate::domain::{Credential, Decimal, ProductCode};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Mock price source that returns predefined prices and counts invocations.
///
/// Codes with neither a price nor a scripted failure answer `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct MockPriceSource {
    prices: HashMap<String, Decimal>,
    failures: HashMap<String, LookupError>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `code` with `price`.
    pub fn with_price(mut self, code: &str, price: Decimal) -> Self {
        self.prices.insert(code.to_string(), price);
        self
    }

    /// Answer `code` with `error`.
    pub fn with_failure(mut self, code: &str, error: LookupError) -> Self {
        self.failures.insert(code.to_string(), error);
        self
    }

    /// Sleep this long before every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `lowest_price` has been invoked, shared across clones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceSource for MockPriceSource {
    async fn lowest_price(
        &self,
        code: &ProductCode,
        _credential: &Credential,
    ) -> Result<Decimal, LookupError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if code.is_empty() {
            return Err(LookupError::MissingProductCode);
        }
        if let Some(err) = self.failures.get(code.as_str()) {
            return Err(err.clone());
        }
        self.prices
            .get(code.as_str())
            .copied()
            .ok_or(LookupError::NotFound)
    }
}
