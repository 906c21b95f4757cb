//! Normalizes a Keepa CSV export into typed input records.

use crate::domain::{Decimal, InputRecord, ItemId, ProductCode};
use csv::StringRecord;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

pub const COL_IMAGE: &str = "Image";
pub const COL_TITLE: &str = "Title";
pub const COL_ITEM_ID: &str = "ASIN";
pub const COL_PRODUCT_CODE: &str = "Product Codes: UPC";
pub const COL_SELLING_PRICE: &str = "Buy Box Price";
pub const COL_PLATFORM_FEES: &str = "FBA Fees";

/// Largest accepted price or fee (one trillion).
pub fn max_amount() -> Decimal {
    Decimal::from_cents(100_000_000_000_000)
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV file must have a header and at least one data row.")]
    Empty,
    #[error("Missing required column in CSV: {0}")]
    MissingColumn(String),
    #[error("Failed to read the file: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv parse error: {0}")]
    Csv(String),
}

/// Positions of the required columns within the header row.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    image: usize,
    title: usize,
    item_id: usize,
    product_code: usize,
    selling_price: usize,
    platform_fees: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Result<Self, IngestError> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().trim_matches('"') == name)
                .ok_or_else(|| IngestError::MissingColumn(name.to_string()))
        };

        Ok(Self {
            image: find(COL_IMAGE)?,
            title: find(COL_TITLE)?,
            item_id: find(COL_ITEM_ID)?,
            product_code: find(COL_PRODUCT_CODE)?,
            selling_price: find(COL_SELLING_PRICE)?,
            platform_fees: find(COL_PLATFORM_FEES)?,
        })
    }
}

/// Parse CSV bytes into input records, in file order.
///
/// A missing required column fails the whole input. Individual malformed rows
/// are dropped with a warning.
pub fn normalize(bytes: &[u8]) -> Result<Vec<InputRecord>, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|e| IngestError::Csv(e.to_string()))?
        .clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestError::Empty);
    }
    let columns = ColumnIndex::from_headers(&headers)?;

    let mut records = Vec::new();
    let mut data_rows = 0usize;
    for (i, row) in reader.records().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping unreadable row {}: {}", line, e);
                continue;
            }
        };
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        data_rows += 1;

        match parse_row(&row, &columns) {
            Ok(record) => records.push(record),
            Err(reason) => warn!("Skipping malformed row {}: {}", line, reason),
        }
    }

    if data_rows == 0 {
        return Err(IngestError::Empty);
    }

    debug!("Normalized {} of {} data rows", records.len(), data_rows);
    Ok(records)
}

/// Read and normalize a CSV file from disk.
pub fn normalize_path(path: impl AsRef<Path>) -> Result<Vec<InputRecord>, IngestError> {
    let bytes = std::fs::read(path)?;
    normalize(&bytes)
}

fn parse_row(row: &StringRecord, columns: &ColumnIndex) -> Result<InputRecord, String> {
    let cell = |idx: usize, name: &str| {
        row.get(idx)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| format!("missing {} value", name))
    };

    let image = cell(columns.image, COL_IMAGE)?;
    let image = image.split(';').next().unwrap_or_default().trim().to_string();

    Ok(InputRecord {
        image,
        title: cell(columns.title, COL_TITLE)?,
        item_id: ItemId::new(cell(columns.item_id, COL_ITEM_ID)?),
        product_code: ProductCode::new(cell(columns.product_code, COL_PRODUCT_CODE)?),
        selling_price: parse_amount(
            &cell(columns.selling_price, COL_SELLING_PRICE)?,
            COL_SELLING_PRICE,
        )?,
        platform_fees: parse_amount(
            &cell(columns.platform_fees, COL_PLATFORM_FEES)?,
            COL_PLATFORM_FEES,
        )?,
    })
}

/// Blank cells count as zero; anything else must be a non-negative number no
/// larger than [`max_amount`].
fn parse_amount(raw: &str, name: &str) -> Result<Decimal, String> {
    if raw.is_empty() {
        return Ok(Decimal::zero());
    }
    let value = Decimal::from_str_canonical(raw)
        .map_err(|e| format!("invalid {} '{}': {}", name, raw, e))?;
    if value.is_negative() {
        return Err(format!("negative {} '{}'", name, raw));
    }
    if value > max_amount() {
        return Err(format!("{} '{}' exceeds {}", name, raw, max_amount()));
    }
    Ok(value)
}
