use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use futures::FutureExt;
use serde::Serialize;
use std::panic::AssertUnwindSafe;
use tokio::sync::OwnedMutexGuard;
use tracing::{error, info};

use super::{AppState, Session};
use crate::domain::Credential;
use crate::error::AppError;
use crate::orchestration::{Batch, BatchObserver, BatchState};

pub const API_KEY_HEADER: &str = "x-api-key";

pub const BATCH_ABORTED: &str = "Research stopped unexpectedly. Please try again.";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub batch_id: String,
    pub state: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStatusResponse {
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Percentage in `[0, 100]`.
    pub progress: f64,
    pub processed: usize,
}

/// Start enriching the CSV in the request body.
///
/// Returns immediately; progress is read from `GET /v1/batches/current`.
pub async fn submit_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let credential = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(Credential::new)
        .ok_or_else(|| {
            AppError::BadRequest(
                "Please enter your SerpApi Key in the sidebar to start research.".into(),
            )
        })?;
    if body.is_empty() {
        return Err(AppError::BadRequest(
            "Please upload a CSV file to start research.".into(),
        ));
    }

    let mut session = state
        .session
        .clone()
        .try_lock_owned()
        .map_err(|_| AppError::Conflict("A batch is already running".into()))?;

    let batch = Batch::new(credential);
    let batch_id = batch.id;
    session.observer.on_state(&BatchState::Running);
    info!("Accepted batch {} ({} bytes)", batch_id, body.len());

    tokio::spawn(run_detached(session, batch, body));

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitResponse {
            batch_id: batch_id.to_string(),
            state: BatchState::Running.name().to_string(),
        }),
    ))
}

/// Run a batch to a terminal state while holding the session lock.
///
/// A panic inside the batch is caught and published as `Failed`, so readers
/// never see a batch stuck in `Running`.
async fn run_detached(mut session: OwnedMutexGuard<Session>, batch: Batch, body: Bytes) {
    let session = &mut *session;
    let outcome = AssertUnwindSafe(session.orchestrator.run_csv(
        &batch,
        &body,
        &mut session.observer,
    ))
    .catch_unwind()
    .await;

    match outcome {
        Ok(Ok(report)) => info!(
            "Batch {} finished: {} of {} records enriched",
            batch.id,
            report.succeeded,
            report.total()
        ),
        Ok(Err(e)) => error!("Batch {} failed: {}", batch.id, e),
        Err(_) => {
            error!("Batch {} aborted by a panic", batch.id);
            session
                .observer
                .on_state(&BatchState::Failed(BATCH_ABORTED.to_string()));
        }
    }
}

pub async fn current_batch(State(state): State<AppState>) -> Json<BatchStatusResponse> {
    let batch_state = state.view.state();
    Json(BatchStatusResponse {
        state: batch_state.name().to_string(),
        error: batch_state.error().map(str::to_string),
        progress: state.view.progress() * 100.0,
        processed: state.view.records().len(),
    })
}
