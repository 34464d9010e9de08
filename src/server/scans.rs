use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};

use super::auth::CurrentUser;
use super::AppState;
use crate::analysis::schema::HEALTH_SCORE;
use crate::analysis::{parse, HealthGrade, Schema, Sections};
use crate::error::AppError;
use crate::storage::{Scan, ScanSummary};

/// A stored scan with its text already split into sections.
#[derive(Debug, Serialize)]
pub struct ScanDetail {
    #[serde(flatten)]
    pub scan: Scan,
    pub sections: Sections,
    pub health_grade: Option<HealthGrade>,
}

impl From<Scan> for ScanDetail {
    fn from(scan: Scan) -> Self {
        // Stored scans don't record their mode
        let sections = parse(&scan.analysis_result, &Schema::any());
        let health_grade = sections.get(&HEALTH_SCORE).and_then(HealthGrade::parse);
        Self {
            scan,
            sections,
            health_grade,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub message: String,
}

/// `GET /scans`
pub async fn list_scans(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<ScanSummary>>, AppError> {
    let scans = state.store.list_for_user(&user_id).await?;
    Ok(Json(scans.iter().map(ScanSummary::from).collect()))
}

/// `GET /scan/{id}`. Another user's scan reads as missing.
pub async fn get_scan(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<ScanDetail>, AppError> {
    match state.store.get(&id).await? {
        Some(scan) if scan.is_owned_by(&user_id) => Ok(Json(ScanDetail::from(scan))),
        _ => Err(AppError::NotFound),
    }
}

/// `DELETE /scan/{id}`
pub async fn delete_scan(
    State(state): State<Arc<AppState>>,
    CurrentUser(user_id): CurrentUser,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    let scan = state.store.get(&id).await?.ok_or(AppError::NotFound)?;

    if !scan.is_owned_by(&user_id) {
        warn!(scan_id = %id, user = %user_id, "refused to delete scan owned by another user");
        return Err(AppError::Forbidden);
    }

    if !state.store.delete(&id).await? {
        // Gone between the lookup and the delete
        return Err(AppError::NotFound);
    }
    info!(scan_id = %id, user = %user_id, "scan deleted");

    Ok(Json(DeleteResponse {
        success: true,
        message: "Scan deleted successfully".to_string(),
    }))
}
