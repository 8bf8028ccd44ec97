//! User handlers
//!
//! Same CRUD shape as the other resources, except that a plain `password`
//! in the body is hashed before storing and hashes never leave the server.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;
use tracing::info;

use jars_core::User;

use super::{email_available, json_body};
use crate::{auth, AppError, AppState};

/// Replace a plain `password` field with `password_hash`
async fn hash_password_field(body: &mut Value) -> Result<(), AppError> {
    let Some(fields) = body.as_object_mut() else {
        return Ok(());
    };
    fields.remove("password_hash");
    if let Some(password) = fields.remove("password") {
        let password = password
            .as_str()
            .filter(|p| !p.is_empty())
            .ok_or_else(|| AppError::bad_request("Password must be a non-empty string"))?
            .to_string();
        let hash = auth::hash_password_blocking(password)
            .await
            .map_err(|e| AppError::internal(&e))?;
        fields.insert("password_hash".to_string(), Value::String(hash));
    }
    Ok(())
}

/// GET /api/users - List users
pub async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<User>>, AppError> {
    let users = state.store.list::<User>().map_err(AppError::from_core)?;
    Ok(Json(users.iter().map(User::redacted).collect()))
}

/// GET /api/users/:id - Get one user
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = state.store.get::<User>(&id).map_err(AppError::from_core)?;
    Ok(Json(user.redacted()))
}

/// POST /api/users - Create a user
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<User>), AppError> {
    let mut body = json_body(&body)?;
    hash_password_field(&mut body).await?;

    let user = state
        .store
        .create_checked::<User>(body, email_available)
        .map_err(AppError::from_core)?;
    info!(id = %user.user_id, "Created user");
    Ok((StatusCode::CREATED, Json(user.redacted())))
}

/// PUT /api/users/:id - Update a user
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<User>, AppError> {
    let mut body = json_body(&body)?;
    hash_password_field(&mut body).await?;
    let user = state
        .store
        .update::<User>(&id, body)
        .map_err(AppError::from_core)?;
    Ok(Json(user.redacted()))
}

/// DELETE /api/users/:id - Remove a user
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<User>, AppError> {
    let user = state.store.remove::<User>(&id).map_err(AppError::from_core)?;
    info!(id = %id, "Deleted user");
    Ok(Json(user.redacted()))
}
