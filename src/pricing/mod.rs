//! Competitor price lookup: the source abstraction, its implementations, and
//! the credential-scoped cache every caller goes through.

use crate::domain::{Credential, Decimal, ProductCode};
use async_trait::async_trait;
use std::fmt;

pub mod cache;
pub mod mock;
pub mod serpapi;
pub mod simulated;
pub mod validation;

pub use cache::{CacheStats, PriceCache};
pub use mock::MockPriceSource;
pub use serpapi::SerpApiPriceSource;
pub use simulated::SimulatedPriceSource;
pub use validation::{validate_credential, KeyValidation};

/// External service that finds the lowest competitor price for a product.
///
/// Implementations may retry internally. They must not cache; that is the
/// job of [`PriceCache`].
#[async_trait]
pub trait PriceSource: Send + Sync + fmt::Debug {
    /// Lowest acceptable offer for `code`, authenticated with `credential`.
    ///
    /// An empty product code always fails with `MissingProductCode`.
    async fn lowest_price(
        &self,
        code: &ProductCode,
        credential: &Credential,
    ) -> Result<Decimal, LookupError>;
}

/// Error type for price lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The record carried no product code to search for
    MissingProductCode,
    /// The service answered but had no usable offer
    NotFound,
    /// Network error (e.g., connection timeout, DNS failure)
    Network(String),
    /// HTTP error (e.g., 401 bad key, 5xx server error)
    Http { status: u16, message: String },
    /// Invalid JSON or unexpected response shape
    Parse(String),
    RateLimited,
    /// The lookup did not finish within the configured limit
    Timeout,
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::MissingProductCode => write!(f, "Product not found or API error."),
            LookupError::NotFound => write!(f, "Product not found or API error."),
            LookupError::Network(msg) => write!(f, "Network error: {}", msg),
            LookupError::Http { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            LookupError::Parse(msg) => write!(f, "Parse error: {}", msg),
            LookupError::RateLimited => write!(f, "Rate limited"),
            LookupError::Timeout => write!(f, "Lookup timed out"),
        }
    }
}

impl std::error::Error for LookupError {}

impl LookupError {
    /// Whether the same lookup could succeed if asked again shortly.
    pub fn is_transient(&self) -> bool {
        match self {
            LookupError::Network(_) | LookupError::RateLimited | LookupError::Timeout => true,
            LookupError::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
