//! REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use vitrine_core::{Exhibit, ExhibitStatus};

use crate::state::AppState;

/// One exhibit plus its live status
#[derive(Debug, Clone, Serialize)]
pub struct ExhibitReport {
    pub mount: String,
    pub label: String,
    pub model: String,
    pub targets: Vec<String>,
    pub status: ExhibitStatus,
}

/// Viewer settings the gallery page needs
#[derive(Debug, Clone, Serialize)]
pub struct PageConfig {
    pub embed_script: String,
}

async fn report(state: &AppState, exhibit: &Exhibit) -> ExhibitReport {
    ExhibitReport {
        mount: exhibit.mount.to_string(),
        label: exhibit.label.clone(),
        model: exhibit.model_uid.to_string(),
        targets: exhibit.targets.clone(),
        status: state.status_of(&exhibit.mount).await,
    }
}

/// GET /api/exhibits - all configured exhibits with status
pub async fn list_exhibits(State(state): State<Arc<AppState>>) -> Json<Vec<ExhibitReport>> {
    let mut reports = Vec::new();
    for exhibit in state.exhibits() {
        reports.push(report(&state, exhibit).await);
    }
    Json(reports)
}

/// GET /api/exhibits/{mount} - one exhibit with status
pub async fn get_exhibit(
    Path(mount): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ExhibitReport>, StatusCode> {
    match state.exhibit_for_mount(&mount) {
        Some(exhibit) => Ok(Json(report(&state, &exhibit).await)),
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// GET /api/config - page-facing configuration
pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<PageConfig> {
    Json(PageConfig {
        embed_script: state.config.viewer.embed_script.clone(),
    })
}
