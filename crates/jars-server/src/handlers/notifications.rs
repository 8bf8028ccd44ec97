//! Notification status handler

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use jars_core::models::{STATUS_READ, STATUS_UNREAD};
use jars_core::Notification;

use super::typed_body;
use crate::{AppError, AppState};

/// Request body for PATCH /api/notifications/:id/status
#[derive(Debug, Deserialize)]
pub struct NotificationStatusRequest {
    /// `0` unread, `1` read
    pub status: u8,
}

/// PATCH /api/notifications/:id/status - Mark a notification read or unread
pub async fn update_notification_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Notification>, AppError> {
    let req: NotificationStatusRequest = typed_body(&body)?;
    if req.status != STATUS_UNREAD && req.status != STATUS_READ {
        return Err(AppError::bad_request("Status must be 0 (unread) or 1 (read)"));
    }

    let notification = state
        .store
        .modify::<Notification>(&id, |n| n.status = req.status)
        .map_err(AppError::from_core)?;
    Ok(Json(notification))
}
