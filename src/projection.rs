//! Read-side views over enriched records: search/filter and CSV export.

use crate::domain::EnrichedRecord;
use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

pub const EXPORT_FILE_NAME: &str = "arbitrage-profit-master-export.csv";

const EXPORT_HEADERS: [&str; 9] = [
    "ASIN",
    "Title",
    "Image",
    "Product Codes: UPC",
    "Buy Box Price",
    "FBA Fees",
    "competitorPrice",
    "netProfit",
    "roi",
];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub profitable_only: bool,
}

impl ProductFilter {
    /// Case-insensitive substring match on title, item id or product code.
    pub fn matches(&self, record: &EnrichedRecord) -> bool {
        if self.profitable_only && !record.is_profitable() {
            return false;
        }
        let term = self.search.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        [
            record.record.title.as_str(),
            record.record.item_id.as_str(),
            record.record.product_code.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }

    /// Matching records, input order preserved.
    pub fn apply<'a>(&self, records: &'a [EnrichedRecord]) -> Vec<&'a EnrichedRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("csv write error: {0}")]
    Csv(#[from] csv::Error),
    #[error("csv output error: {0}")]
    Output(String),
}

/// Render records as CSV with a header row.
///
/// Returns `None` (and logs a warning) when there is nothing to export.
pub fn export_csv<'a, I>(records: I) -> Result<Option<String>, ExportError>
where
    I: IntoIterator<Item = &'a EnrichedRecord>,
{
    let mut records = records.into_iter().peekable();
    if records.peek().is_none() {
        warn!("No products to export.");
        return Ok(None);
    }

    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(EXPORT_HEADERS)?;
    for r in records {
        writer.write_record([
            r.record.item_id.as_str(),
            r.record.title.as_str(),
            r.record.image.as_str(),
            r.record.product_code.as_str(),
            r.record.selling_price.to_canonical_string().as_str(),
            r.record.platform_fees.to_canonical_string().as_str(),
            r.acquisition_cost.to_canonical_string().as_str(),
            r.net_profit.to_fixed(2).as_str(),
            r.roi.to_fixed(2).as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::Output(e.to_string()))?;
    String::from_utf8(bytes)
        .map(Some)
        .map_err(|e| ExportError::Output(e.to_string()))
}
