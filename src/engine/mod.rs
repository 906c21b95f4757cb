//! Pure computation for listing profitability.

pub mod metrics;

pub use metrics::{buffer_fee_rate, compute_metrics, Metrics, MetricsError};
