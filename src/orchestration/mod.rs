pub mod observer;
pub mod orchestrator;

pub use observer::{BatchObserver, BatchView, RecordingObserver, WatchObserver};
pub use orchestrator::{Batch, BatchError, BatchReport, Orchestrator};

/// Lifecycle of one enrichment batch: `Idle -> Running -> {Completed, Failed}`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Idle,
    Running,
    Completed,
    /// Structural failure, with the user-facing message.
    Failed(String),
}

impl BatchState {
    pub fn name(&self) -> &'static str {
        match self {
            BatchState::Idle => "idle",
            BatchState::Running => "running",
            BatchState::Completed => "completed",
            BatchState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BatchState::Completed | BatchState::Failed(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BatchState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}
