//! Backup API endpoints.

use axum::{extract::State, Json};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{BackupInfo, Dataset, RestoreBackupRequest, SweepReport};
use crate::AppState;

/// GET /api/backups - List retained backups, newest first.
pub async fn list_backups(State(state): State<AppState>) -> ApiResult<Vec<BackupInfo>> {
    let version = state.store.get_current().await?.version;
    let backups = state.store.list_backups().await?;
    success(backups, version)
}

/// POST /api/backups/restore - Make a backup the current dataset.
pub async fn restore_backup(
    State(state): State<AppState>,
    Json(request): Json<RestoreBackupRequest>,
) -> ApiResult<Dataset> {
    if request.key.trim().is_empty() {
        return Err(AppError::BadRequest("Invalid key".to_string()));
    }

    let restored = state.store.restore_backup(&request.key).await?;
    let version = restored.version;
    success(restored, version)
}

/// POST /api/backups/sweep - Run the retention sweep now.
pub async fn sweep_backups(State(state): State<AppState>) -> ApiResult<SweepReport> {
    let report = state.store.sweep_backups().await?;
    let version = state.store.get_current().await?.version;
    success(report, version)
}
