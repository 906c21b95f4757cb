//! Observers receiving the incremental output of an enrichment batch.

use super::BatchState;
use crate::domain::EnrichedRecord;
use std::sync::Arc;
use tokio::sync::watch;

/// Receives every publish of a running batch.
///
/// `on_records` always gets the complete collection so far, in input order.
/// A `Running` state marks the start of a new batch and discards whatever a
/// previous batch published.
pub trait BatchObserver: Send {
    fn on_state(&mut self, _state: &BatchState) {}

    fn on_records(&mut self, records: &[EnrichedRecord]);

    /// Fraction of the batch processed, in `[0, 1]`.
    fn on_progress(&mut self, progress: f64);
}

/// Keeps every publish; handy for assertions.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    pub states: Vec<BatchState>,
    pub snapshots: Vec<Vec<EnrichedRecord>>,
    pub progress: Vec<f64>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_state(&self) -> Option<&BatchState> {
        self.states.last()
    }
}

impl BatchObserver for RecordingObserver {
    fn on_state(&mut self, state: &BatchState) {
        self.states.push(state.clone());
    }

    fn on_records(&mut self, records: &[EnrichedRecord]) {
        self.snapshots.push(records.to_vec());
    }

    fn on_progress(&mut self, progress: f64) {
        self.progress.push(progress);
    }
}

/// Latest batch output as seen by readers of a [`WatchObserver`].
#[derive(Debug, Clone)]
pub struct BatchView {
    state: watch::Receiver<BatchState>,
    records: watch::Receiver<Arc<Vec<EnrichedRecord>>>,
    progress: watch::Receiver<f64>,
}

impl BatchView {
    pub fn state(&self) -> BatchState {
        self.state.borrow().clone()
    }

    pub fn records(&self) -> Arc<Vec<EnrichedRecord>> {
        self.records.borrow().clone()
    }

    pub fn progress(&self) -> f64 {
        *self.progress.borrow()
    }

    /// Wait until the batch leaves `Running`.
    pub async fn finished(&mut self) -> BatchState {
        loop {
            let current = self.state.borrow_and_update().clone();
            if current.is_terminal() {
                return current;
            }
            if self.state.changed().await.is_err() {
                return self.state.borrow().clone();
            }
        }
    }
}

/// Publishes into `tokio::sync::watch` channels so any number of readers can
/// poll the latest state without blocking the batch.
#[derive(Debug)]
pub struct WatchObserver {
    state: watch::Sender<BatchState>,
    records: watch::Sender<Arc<Vec<EnrichedRecord>>>,
    progress: watch::Sender<f64>,
}

impl WatchObserver {
    pub fn channel() -> (Self, BatchView) {
        let (state_tx, state_rx) = watch::channel(BatchState::Idle);
        let (records_tx, records_rx) = watch::channel(Arc::new(Vec::new()));
        let (progress_tx, progress_rx) = watch::channel(0.0);
        (
            Self {
                state: state_tx,
                records: records_tx,
                progress: progress_tx,
            },
            BatchView {
                state: state_rx,
                records: records_rx,
                progress: progress_rx,
            },
        )
    }
}

impl BatchObserver for WatchObserver {
    fn on_state(&mut self, state: &BatchState) {
        if *state == BatchState::Running {
            self.records.send_replace(Arc::new(Vec::new()));
            self.progress.send_replace(0.0);
        }
        self.state.send_replace(state.clone());
    }

    fn on_records(&mut self, records: &[EnrichedRecord]) {
        self.records.send_replace(Arc::new(records.to_vec()));
    }

    fn on_progress(&mut self, progress: f64) {
        self.progress.send_replace(progress);
    }
}
