//! Authentication-related handlers

use std::sync::Arc;

use axum::{body::Bytes, extract::State, http::StatusCode, Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use jars_core::{store::generate_id, User};

use super::typed_body;
use crate::{auth, AppError, AppState, Claims, SuccessResponse};

/// Request body for POST /api/auth/register
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

/// Request body for POST /api/auth/login
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token and user returned by login and register
#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Uniqueness rule for user emails, checked under the store lock
pub(crate) fn email_available(users: &[User], user: &User) -> jars_core::Result<()> {
    let email = user.email.trim();
    if !email.is_empty() && users.iter().any(|u| u.email.trim().eq_ignore_ascii_case(email)) {
        return Err(jars_core::Error::Validation("User already exists".into()));
    }
    Ok(())
}

/// POST /api/auth/register - Create a local user and issue a token
pub async fn register(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let req: RegisterRequest = typed_body(&body)?;
    let email = req.email.trim().to_string();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let password_hash = auth::hash_password_blocking(req.password)
        .await
        .map_err(|e| AppError::internal(&e))?;
    let now = Utc::now();
    let user = User {
        user_id: generate_id("user"),
        email,
        full_name: req.name,
        is_active: true,
        password_hash: Some(password_hash),
        created_at: Some(now),
        updated_at: Some(now),
        ..Default::default()
    };
    let user = state
        .store
        .insert_checked(user, email_available)
        .map_err(AppError::from_core)?;

    let token = auth::issue_token(&user, &state.jwt_secret).map_err(|e| AppError::internal(&e))?;
    info!(user = %user.user_id, "Registered user");

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.redacted(),
        }),
    ))
}

/// POST /api/auth/login - Check credentials and issue a token
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<AuthResponse>, AppError> {
    let req: LoginRequest = typed_body(&body)?;

    let user = state
        .store
        .read(|db| {
            db.users
                .iter()
                .find(|u| u.email.eq_ignore_ascii_case(req.email.trim()))
                .cloned()
        })
        .map_err(AppError::from_core)?;

    let verified = match &user {
        Some(user) if user.is_active => match user.password_hash.clone() {
            Some(hash) => auth::verify_password_blocking(req.password, hash).await,
            None => false,
        },
        _ => false,
    };
    let user = match user {
        Some(user) if verified => user,
        _ => {
            warn!("Failed login attempt");
            return Err(AppError::unauthorized("Invalid email or password"));
        }
    };

    let token = auth::issue_token(&user, &state.jwt_secret).map_err(|e| AppError::internal(&e))?;
    info!(user = %user.user_id, "Login successful");

    Ok(Json(AuthResponse {
        token,
        user: user.redacted(),
    }))
}

/// POST /api/auth/logout - Tokens are stateless; the client discards its copy
pub async fn logout() -> Json<SuccessResponse> {
    Json(SuccessResponse { success: true })
}

/// GET /api/auth/me - The user behind the bearer token
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    claims: Option<Extension<Claims>>,
) -> Result<Json<User>, AppError> {
    let Some(Extension(claims)) = claims else {
        return Err(AppError::unauthorized("Authentication required"));
    };
    let user = state
        .store
        .get::<User>(&claims.sub)
        .map_err(AppError::from_core)?;
    Ok(Json(user.redacted()))
}
