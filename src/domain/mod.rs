//! Domain types for listing enrichment.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Identifier primitives and the redacting Credential type
//! - Input, lookup and enriched record types

pub mod decimal;
pub mod primitives;
pub mod product;

pub use decimal::Decimal;
pub use primitives::{Credential, ItemId, ProductCode};
pub use product::{EnrichedRecord, InputRecord, LookupResult, RecordStatus};
