//! Listing records before and after enrichment.

use super::{Decimal, ItemId, ProductCode};
use serde::{Deserialize, Serialize};

/// One normalized row of the listings export. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputRecord {
    pub image: String,
    pub title: String,
    pub item_id: ItemId,
    pub product_code: ProductCode,
    pub selling_price: Decimal,
    pub platform_fees: Decimal,
}

/// Outcome of a competitor price lookup.
///
/// `error` set means "no usable price"; `price` is then zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupResult {
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LookupResult {
    pub fn ok(price: Decimal) -> Self {
        Self { price, error: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            price: Decimal::zero(),
            error: Some(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Success,
    Error,
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordStatus::Success => write!(f, "success"),
            RecordStatus::Error => write!(f, "error"),
        }
    }
}

/// An input record plus its acquisition cost and profitability metrics.
///
/// When `status` is `Error` the metrics are the zero sentinel and carry no
/// meaning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub record: InputRecord,
    pub acquisition_cost: Decimal,
    pub net_profit: Decimal,
    pub roi: Decimal,
    pub status: RecordStatus,
}

impl EnrichedRecord {
    pub fn is_profitable(&self) -> bool {
        self.net_profit.is_positive()
    }
}
