//! HTTP routes.
//!
//! Handlers share an [`AppState`] with the sheets and the log behind
//! `tokio::sync::RwLock`s.

use crate::audit::{AuditLog, LogEntry, LogFilter, NewLogEntry};
use crate::error::{ApiError, ApiResult};
use crate::sheets::{in_bounds, SheetStore, SheetSummary};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sheet_sync::{CellEdit, ManagerId, SaveCellRequest, REPLAY_HEADER, ROLE_HEADER};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Role allowed to edit cells
pub const ADMIN_ROLE: &str = "admin";

/// Shared server state
#[derive(Debug)]
pub struct AppState {
    pub sheets: RwLock<SheetStore>,
    pub logs: RwLock<AuditLog>,
}

impl AppState {
    /// State seeded with the starter sheet and an empty log
    pub fn new() -> Self {
        Self::with_sheets(SheetStore::with_default_managers())
    }

    pub fn with_sheets(sheets: SheetStore) -> Self {
        Self {
            sheets: RwLock::new(sheets),
            logs: RwLock::new(AuditLog::new()),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SaveResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LogAdded {
    pub message: String,
    pub id: u64,
}

/// Body of `POST /api/managers`
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NewManager {
    /// Next free numeric id when absent
    pub id: Option<ManagerId>,
    pub name: String,
    pub instructions: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CellsResponse {
    pub id: ManagerId,
    pub name: String,
    pub instructions: String,
    pub rows: Vec<Vec<String>>,
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/save-cell", post(save_cell))
        .route("/api/managers", get(list_managers).post(create_manager))
        .route("/api/managers/:id/cells", get(get_cells))
        .route("/api/logs", get(get_logs).post(add_log))
        .with_state(state)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn require_admin(headers: &HeaderMap) -> ApiResult<()> {
    match header_str(headers, ROLE_HEADER) {
        Some(ADMIN_ROLE) => Ok(()),
        _ => Err(ApiError::Forbidden),
    }
}

async fn save_cell(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<SaveCellRequest>,
) -> ApiResult<Json<SaveResponse>> {
    let role = header_str(&headers, ROLE_HEADER).unwrap_or_default();
    if role != ADMIN_ROLE {
        tracing::warn!(
            "Rejected save of {}:{}:{} for role '{}'",
            payload.manager_id,
            payload.row,
            payload.col,
            role
        );
        return Err(ApiError::Forbidden);
    }
    if !in_bounds(payload.row, payload.col) {
        return Err(ApiError::BadRequest(format!(
            "cell {}:{} is out of range",
            payload.row, payload.col
        )));
    }

    let is_replay = header_str(&headers, REPLAY_HEADER)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false);

    let edit = CellEdit::new(
        payload.manager_id,
        payload.row,
        payload.col,
        payload.value,
        role,
    );

    state
        .sheets
        .write()
        .await
        .save_cell(&edit.manager_id, edit.row, edit.col, edit.value.as_str());
    state.logs.write().await.record_cell_save(&edit, is_replay);

    tracing::debug!(
        "Saved {} for manager {}{}",
        edit.cell_ref(),
        edit.manager_id,
        if is_replay { " (replay)" } else { "" }
    );

    Ok(Json(SaveResponse {
        status: "saved".to_string(),
    }))
}

async fn list_managers(State(state): State<Arc<AppState>>) -> Json<Vec<SheetSummary>> {
    Json(state.sheets.read().await.list())
}

async fn create_manager(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<NewManager>,
) -> ApiResult<(StatusCode, Json<SheetSummary>)> {
    require_admin(&headers)?;
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name is required".to_string()));
    }

    let mut sheets = state.sheets.write().await;
    let id = match payload.id {
        Some(id) if sheets.get(&id).is_some() => {
            return Err(ApiError::ManagerExists(id.to_string()));
        }
        Some(id) => id,
        None => sheets.next_id(),
    };

    let sheet = sheets.add_manager(id, name);
    sheet.instructions = payload.instructions;
    tracing::info!("Added manager {} ({})", sheet.id, sheet.name);

    Ok((StatusCode::CREATED, Json(sheet.summary())))
}

async fn get_cells(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<CellsResponse>> {
    let id = ManagerId::new(id);
    let sheets = state.sheets.read().await;
    let sheet = sheets
        .get(&id)
        .ok_or_else(|| ApiError::ManagerNotFound(id.to_string()))?;

    Ok(Json(CellsResponse {
        id: sheet.id.clone(),
        name: sheet.name.clone(),
        instructions: sheet.instructions.clone(),
        rows: sheet.rows.clone(),
    }))
}

async fn get_logs(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<LogFilter>,
) -> Json<Vec<LogEntry>> {
    Json(state.logs.read().await.filtered(&filter))
}

async fn add_log(
    State(state): State<Arc<AppState>>,
    Json(row): Json<NewLogEntry>,
) -> ApiResult<Json<LogAdded>> {
    if row.user.trim().is_empty() {
        return Err(ApiError::BadRequest("user is required".to_string()));
    }
    let id = state.logs.write().await.append(row);
    Ok(Json(LogAdded {
        message: "Log added".to_string(),
        id,
    }))
}
