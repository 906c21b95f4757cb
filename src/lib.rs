pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod orchestration;
pub mod pricing;
pub mod projection;

pub use config::Config;
pub use domain::{
    Credential, Decimal, EnrichedRecord, InputRecord, ItemId, LookupResult, ProductCode,
    RecordStatus,
};
pub use engine::{compute_metrics, Metrics};
pub use error::AppError;
pub use orchestration::{Batch, BatchError, BatchReport, BatchState, Orchestrator};
pub use pricing::{MockPriceSource, PriceCache, PriceSource, SimulatedPriceSource};
