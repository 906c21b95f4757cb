use super::{BatchObserver, BatchState};
use crate::domain::{Credential, EnrichedRecord, InputRecord, RecordStatus};
use crate::engine::{compute_metrics, Metrics};
use crate::ingest::{self, IngestError};
use crate::pricing::PriceCache;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Parameters of one batch submission.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: Uuid,
    pub credential: Credential,
}

impl Batch {
    pub fn new(credential: Credential) -> Self {
        Self {
            id: Uuid::new_v4(),
            credential,
        }
    }
}

/// Final output of a completed batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub records: Vec<EnrichedRecord>,
    pub succeeded: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.records.len()
    }
}

/// Batch-fatal errors. Per-record lookup failures never surface here.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Please enter your SerpApi Key to start research.")]
    MissingCredential,
    #[error("Please upload a CSV file with at least one product to start research.")]
    NoRecords,
    #[error("Failed to process file: {0}")]
    Ingest(#[from] IngestError),
}

/// Drives the enrichment loop: one record at a time, in input order.
///
/// Owns the price cache, so exclusive access (`&mut self`) is what keeps a
/// second batch from running alongside the first.
#[derive(Debug)]
pub struct Orchestrator {
    cache: PriceCache,
}

impl Orchestrator {
    pub fn new(cache: PriceCache) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// Normalize a CSV export and enrich its rows.
    ///
    /// Rejected input goes straight to `Failed` without entering `Running`.
    pub async fn run_csv(
        &mut self,
        batch: &Batch,
        csv: &[u8],
        observer: &mut dyn BatchObserver,
    ) -> Result<BatchReport, BatchError> {
        if batch.credential.is_empty() {
            return Err(fail(observer, BatchError::MissingCredential));
        }

        let records = match ingest::normalize(csv) {
            Ok(records) => records,
            Err(e) => return Err(fail(observer, e.into())),
        };
        self.run_batch(batch, records, observer).await
    }

    /// Enrich already-normalized records.
    pub async fn run_batch(
        &mut self,
        batch: &Batch,
        records: Vec<InputRecord>,
        observer: &mut dyn BatchObserver,
    ) -> Result<BatchReport, BatchError> {
        if batch.credential.is_empty() {
            return Err(fail(observer, BatchError::MissingCredential));
        }
        if records.is_empty() {
            return Err(fail(observer, BatchError::NoRecords));
        }

        let started_at = Utc::now();
        observer.on_state(&BatchState::Running);
        observer.on_progress(0.0);

        Ok(self.enrich_all(batch, records, started_at, observer).await)
    }

    async fn enrich_all(
        &mut self,
        batch: &Batch,
        records: Vec<InputRecord>,
        started_at: DateTime<Utc>,
        observer: &mut dyn BatchObserver,
    ) -> BatchReport {
        let total = records.len();
        info!(
            "Batch {} started: {} records, key={}",
            batch.id,
            total,
            batch.credential.prefix()
        );

        let mut enriched: Vec<EnrichedRecord> = Vec::with_capacity(total);
        let mut failed = 0usize;

        for (i, record) in records.into_iter().enumerate() {
            let lookup = self
                .cache
                .lookup(&record.product_code, &batch.credential)
                .await;

            let acquisition_cost = lookup.price;
            let computed =
                compute_metrics(record.selling_price, record.platform_fees, acquisition_cost);

            let (metrics, status) = match (&lookup.error, computed) {
                (Some(message), _) => {
                    warn!("API Error for {}: {}", record.item_id, message);
                    (Metrics::default(), RecordStatus::Error)
                }
                (None, Err(e)) => {
                    warn!("Metrics for {} not computed: {}", record.item_id, e);
                    (Metrics::default(), RecordStatus::Error)
                }
                (None, Ok(metrics)) => (metrics, RecordStatus::Success),
            };
            if status == RecordStatus::Error {
                failed += 1;
            }

            enriched.push(EnrichedRecord {
                record,
                acquisition_cost,
                net_profit: metrics.net_profit,
                roi: metrics.roi,
                status,
            });
            observer.on_records(&enriched);
            observer.on_progress((i + 1) as f64 / total as f64);
        }

        observer.on_state(&BatchState::Completed);

        let stats = self.cache.stats();
        info!(
            "Batch {} completed: {} ok, {} errors (cache hits={}, misses={})",
            batch.id,
            total - failed,
            failed,
            stats.hits,
            stats.misses
        );

        BatchReport {
            batch_id: batch.id,
            records: enriched,
            succeeded: total - failed,
            failed,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

fn fail(observer: &mut dyn BatchObserver, err: BatchError) -> BatchError {
    error!("Batch failed: {}", err);
    observer.on_state(&BatchState::Failed(err.to_string()));
    err
}
