//! Generic CRUD handlers over the flat-file store
//!
//! Transactions, notifications, goals and jars share the same shape:
//! list, get by id, create with a generated id, shallow-merge update and
//! delete returning the removed record.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use jars_core::Record;

use super::json_body;
use crate::{AppError, AppState};

/// Response for GET /api/test
#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// GET /api/test - Liveness check
pub async fn api_test() -> Json<MessageResponse> {
    Json(MessageResponse {
        message: "API is working!".to_string(),
    })
}

/// GET /api/{resource} - List all records
pub async fn list_records<R: Record>(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<R>>, AppError> {
    let records = state.store.list::<R>().map_err(AppError::from_core)?;
    Ok(Json(records))
}

/// GET /api/{resource}/:id - Get one record
pub async fn get_record<R: Record>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<R>, AppError> {
    let record = state.store.get::<R>(&id).map_err(AppError::from_core)?;
    Ok(Json(record))
}

/// POST /api/{resource} - Create a record with a generated id
pub async fn create_record<R: Record>(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<R>), AppError> {
    let body = json_body(&body)?;
    let record = state.store.create::<R>(body).map_err(AppError::from_core)?;
    info!(kind = R::KIND, id = record.id(), "Created record");
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/{resource}/:id - Merge the body over an existing record
pub async fn update_record<R: Record>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<R>, AppError> {
    let patch: Value = json_body(&body)?;
    let record = state
        .store
        .update::<R>(&id, patch)
        .map_err(AppError::from_core)?;
    Ok(Json(record))
}

/// DELETE /api/{resource}/:id - Remove a record and return it
pub async fn delete_record<R: Record>(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<R>, AppError> {
    let removed = state.store.remove::<R>(&id).map_err(AppError::from_core)?;
    info!(kind = R::KIND, id = %id, "Deleted record");
    Ok(Json(removed))
}
