use std::sync::Arc;
use std::time::Duration;

use crate::runtime::progress::ProgressItem;
use crate::runtime::progress_tracker::{ProgressState, ProgressTracker};
use crate::{AppError, AppState};

const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Allocate a job id for work driven from outside the registry (sidecar
/// processes, webview-side jobs).
#[tauri::command]
pub fn start_job(state: tauri::State<'_, AppState>) -> String {
    state.progress.start_job()
}

#[tauri::command]
pub fn report_progress(
    state: tauri::State<'_, AppState>,
    id: String,
    progress: f64,
    finished: bool,
) -> Result<ProgressItem, AppError> {
    Ok(state.progress.report(&id, progress, finished)?)
}

#[tauri::command]
pub fn get_progress(state: tauri::State<'_, AppState>, id: String) -> Option<ProgressItem> {
    state.progress.get(&id)
}

#[tauri::command]
pub fn clear_progress(state: tauri::State<'_, AppState>, id: String) -> bool {
    let removed = state.progress.clear(&id);
    state.hub.reset(&id);
    removed
}

#[tauri::command]
pub fn list_progress(state: tauri::State<'_, AppState>) -> Vec<ProgressItem> {
    state.progress.list()
}

/// Resolve once job `id` reports finished, or with the last known state when
/// `timeout_ms` elapses first.
#[tauri::command]
pub async fn wait_for_progress(
    state: tauri::State<'_, AppState>,
    id: String,
    timeout_ms: Option<u64>,
) -> Result<Option<ProgressState>, AppError> {
    let source = Arc::clone(&state.progress);
    let mut tracker = ProgressTracker::subscribe(id, &state.hub, source).await?;
    let timeout = Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS));

    if tokio::time::timeout(timeout, settle(&mut tracker)).await.is_err() {
        tracing::debug!("wait for {} timed out", tracker.id());
    }
    Ok(tracker.state())
}

/// Wait for a batch of jobs one after another with a single tracker. The
/// timeout covers the whole batch; jobs not reached before it elapses are
/// reported as `None`.
#[tauri::command]
pub async fn wait_for_jobs(
    state: tauri::State<'_, AppState>,
    ids: Vec<String>,
    timeout_ms: Option<u64>,
) -> Result<Vec<Option<ProgressState>>, AppError> {
    let Some(first) = ids.first() else {
        return Ok(Vec::new());
    };
    let source = Arc::clone(&state.progress);
    let mut tracker = ProgressTracker::subscribe(first.clone(), &state.hub, source).await?;
    let deadline = tokio::time::Instant::now()
        + Duration::from_millis(timeout_ms.unwrap_or(DEFAULT_WAIT_TIMEOUT_MS));

    let mut results = Vec::with_capacity(ids.len());
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            tracker.switch_to(id.clone()).await?;
        }
        if tokio::time::timeout_at(deadline, settle(&mut tracker)).await.is_err() {
            tracing::debug!("wait for batch timed out at {id}");
            results.push(tracker.state());
            break;
        }
        results.push(tracker.state());
    }
    results.resize(ids.len(), None);
    Ok(results)
}

/// Returns once the tracked job is known and finished.
async fn settle(tracker: &mut ProgressTracker) {
    while tracker.is_active() || tracker.state().is_none() {
        tracker.changed().await;
    }
}
