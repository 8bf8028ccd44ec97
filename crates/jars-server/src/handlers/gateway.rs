//! `/api/v1` relay handlers
//!
//! Each handler reshapes the request body, injects the caller's `user_id`,
//! forwards the caller's bearer token and relays the upstream status and
//! JSON body unchanged.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path, Query, State},
    http::{header, request::Parts, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info};

use jars_core::{GatewayClient, GatewayResponse, JarCode};

use super::json_body;
use crate::{auth, AppError, AppState, Claims};

/// Who is calling a relay route
#[derive(Debug, Clone, Default)]
pub struct Caller {
    /// Raw bearer token, forwarded upstream as-is
    pub token: Option<String>,
    /// From validated local claims, else read from the token unverified
    pub user_id: Option<String>,
}

impl Caller {
    fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn user_id(&self) -> Value {
        self.user_id.clone().map(Value::String).unwrap_or(Value::Null)
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(auth::bearer_token)
            .map(String::from);

        let user_id = match parts.extensions.get::<Claims>() {
            Some(claims) => Some(claims.sub.clone()),
            None => token.as_deref().and_then(auth::peek_subject),
        };

        Ok(Self { token, user_id })
    }
}

fn gateway(state: &AppState) -> Result<&GatewayClient, AppError> {
    state
        .gateway
        .as_ref()
        .ok_or_else(|| AppError::service_unavailable("API Gateway not configured"))
}

/// Turn an upstream result into the relayed response
fn relay(route: &str, result: jars_core::Result<GatewayResponse>) -> Result<Response, AppError> {
    match result {
        Ok(resp) => {
            info!(route, status = resp.status, "Relayed to API Gateway");
            let status = StatusCode::from_u16(resp.status).unwrap_or(StatusCode::BAD_GATEWAY);
            Ok((status, Json(resp.body)).into_response())
        }
        Err(jars_core::Error::Validation(msg)) => Err(AppError::bad_request(&msg)),
        Err(e) => {
            error!(route, error = %e, "API Gateway request failed");
            Err(AppError::bad_gateway("API Gateway unavailable"))
        }
    }
}

/// Copy the named fields of a request body (missing ones become null)
fn pick(body: &Value, fields: &[&str]) -> Map<String, Value> {
    fields
        .iter()
        .map(|field| {
            (
                field.to_string(),
                body.get(*field).cloned().unwrap_or(Value::Null),
            )
        })
        .collect()
}

/// The whole request body with extra fields set over it
fn merged(body: Value, extra: &[(&str, Value)]) -> Value {
    let mut map = match body {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in extra {
        map.insert(key.to_string(), value.clone());
    }
    Value::Object(map)
}

/// Whether a value reads as a number: a JSON number or a numeric string
fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

/// Search bodies need `pagination.page_size` and `pagination.current`
///
/// Both may be numbers or numeric strings. `filters`, when present, must be
/// an object.
fn validate_pagination(body: &Value) -> Result<(), AppError> {
    if body.get("filters").is_some_and(|f| !f.is_object()) {
        return Err(AppError::bad_request("filters must be an object"));
    }
    let pagination = body.get("pagination").filter(|p| !p.is_null());
    if pagination.is_some_and(|p| !p.is_object()) {
        return Err(AppError::bad_request("pagination must be an object"));
    }
    for field in ["page_size", "current"] {
        match pagination.and_then(|p| p.get(field)) {
            None | Some(Value::Null) => {
                return Err(AppError::bad_request(&format!(
                    "pagination.{} is a required field",
                    field
                )))
            }
            Some(v) if !is_numeric(v) => {
                return Err(AppError::bad_request(&format!(
                    "pagination.{} must be a number",
                    field
                )))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn search_body(caller: &Caller, body: &Value, with_text: bool) -> Value {
    let mut fields = vec!["pagination", "filters"];
    if with_text {
        fields.push("search_text");
    }
    let mut map = pick(body, &fields);
    map.insert("user_id".into(), caller.user_id());
    Value::Object(map)
}

// ========== Notification ==========

/// POST /api/v1/notification/search
pub async fn relay_notification_search(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let body = json_body(&body)?;
    validate_pagination(&body)?;
    let upstream = search_body(&caller, &body, false);
    relay(
        "notification/search",
        gw.notification_search(&upstream, caller.token()).await,
    )
}

/// POST /api/v1/notification/create
pub async fn relay_notification_create(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let body = json_body(&body)?;
    let mut map = pick(
        &body,
        &[
            "title",
            "message",
            "notification_type",
            "severity",
            "object_code",
            "object_id",
        ],
    );
    map.insert("user_id".into(), caller.user_id());
    relay(
        "notification/create",
        gw.notification_create(&Value::Object(map), caller.token()).await,
    )
}

/// PATCH /api/v1/notification/:id/status
pub async fn relay_notification_status(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let body = json_body(&body)?;
    let upstream = json!({
        "user_id": caller.user_id(),
        "id": id,
        "status": body.get("status").cloned().unwrap_or(Value::Null),
    });
    relay(
        "notification/status",
        gw.notification_mark_read(&id, &upstream, caller.token()).await,
    )
}

// ========== Transaction ==========

/// POST /api/v1/transaction/search
pub async fn relay_transaction_search(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let body = json_body(&body)?;
    validate_pagination(&body)?;
    let upstream = search_body(&caller, &body, true);
    relay(
        "transaction/search",
        gw.transaction_search(&upstream, caller.token()).await,
    )
}

/// POST /api/v1/transaction/create
pub async fn relay_transaction_create(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let upstream = merged(json_body(&body)?, &[("user_id", caller.user_id())]);
    relay(
        "transaction/create",
        gw.transaction_create(&upstream, caller.token()).await,
    )
}

/// PATCH /api/v1/transaction/:id/classify
pub async fn relay_transaction_classify(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let body = json_body(&body)?;
    let label = body
        .get("category_label")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::bad_request("category_label is required"))?;
    let jar: JarCode = label.parse().map_err(|e: String| AppError::bad_request(&e))?;

    let upstream = json!({
        "user_id": caller.user_id(),
        "id": id,
        "category_label": jar,
    });
    relay(
        "transaction/classify",
        gw.transaction_classify(&id, &upstream, caller.token()).await,
    )
}

// ========== Jar ==========

#[derive(Debug, Deserialize)]
pub struct JarQuery {
    pub year_month: Option<String>,
}

/// GET /api/v1/jar/:id
pub async fn relay_jar_get(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    Query(query): Query<JarQuery>,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    relay(
        "jar/get",
        gw.jar_get(
            &id,
            caller.user_id.as_deref(),
            query.year_month.as_deref(),
            caller.token(),
        )
        .await,
    )
}

/// POST /api/v1/jar/initialize
pub async fn relay_jar_initialize(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let body = json_body(&body)?;
    let mut map = pick(&body, &["income"]);
    map.insert("user_id".into(), caller.user_id());
    relay(
        "jar/initialize",
        gw.jar_initialize(&Value::Object(map), caller.token()).await,
    )
}

/// PUT /api/v1/jar/percent
pub async fn relay_jar_percent(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let body = json_body(&body)?;
    let mut map = pick(&body, &["year_month", "jars"]);
    map.insert("user_id".into(), caller.user_id());
    relay(
        "jar/percent",
        gw.jar_update_percent(&Value::Object(map), caller.token()).await,
    )
}

// ========== Goal ==========

/// POST /api/v1/goal/search
pub async fn relay_goal_search(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let body = json_body(&body)?;
    validate_pagination(&body)?;
    let upstream = search_body(&caller, &body, true);
    relay("goal/search", gw.goal_search(&upstream, caller.token()).await)
}

/// POST /api/v1/goal/create
pub async fn relay_goal_create(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let upstream = merged(json_body(&body)?, &[("user_id", caller.user_id())]);
    relay("goal/create", gw.goal_create(&upstream, caller.token()).await)
}

/// PUT /api/v1/goal/:id
pub async fn relay_goal_update(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let upstream = merged(
        json_body(&body)?,
        &[("user_id", caller.user_id()), ("id", Value::String(id.clone()))],
    );
    relay(
        "goal/update",
        gw.goal_update(&id, &upstream, caller.token()).await,
    )
}

/// DELETE /api/v1/goal/:id
pub async fn relay_goal_delete(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let upstream = json!({ "user_id": caller.user_id(), "id": id });
    relay(
        "goal/delete",
        gw.goal_remove(&id, &upstream, caller.token()).await,
    )
}

// ========== AI ==========

/// POST /api/v1/ai/transaction/classify
pub async fn relay_ai_transaction_classify(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let upstream = merged(json_body(&body)?, &[("user_id", caller.user_id())]);
    relay(
        "ai/transaction/classify",
        gw.ai_transaction_classify(&upstream, caller.token()).await,
    )
}

/// POST /api/v1/ai/jar/coaching
pub async fn relay_ai_jar_coaching(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    relay(
        "ai/jar/coaching",
        gw.ai_jar_coaching(caller.user_id.as_deref(), caller.token())
            .await,
    )
}

/// POST /api/v1/ai/goal/coaching
pub async fn relay_ai_goal_coaching(
    State(state): State<Arc<AppState>>,
    caller: Caller,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    relay(
        "ai/goal/coaching",
        gw.ai_goal_coaching(caller.user_id.as_deref(), caller.token())
            .await,
    )
}

// ========== QnA ==========

/// POST /api/v1/qna/session
pub async fn relay_qna_session(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let body = json_body(&body)?;
    let mut map = pick(&body, &["history", "prompt"]);
    map.insert("user_id".into(), caller.user_id());
    relay(
        "qna/session",
        gw.qna_session(&Value::Object(map), caller.token()).await,
    )
}

// ========== Auth ==========

/// GET /api/v1/auth/:id
pub async fn relay_auth_get(
    State(state): State<Arc<AppState>>,
    caller: Caller,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    relay("auth/get", gw.auth_get_by_id(&id, caller.token()).await)
}

/// POST /api/v1/auth/login
pub async fn relay_auth_login(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, AppError> {
    let gw = gateway(&state)?;
    let body = json_body(&body)?;
    let upstream = Value::Object(pick(&body, &["username", "password", "by"]));
    relay("auth/login", gw.auth_login(&upstream, None).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_pagination() {
        assert!(validate_pagination(&json!({ "pagination": { "page_size": 10, "current": 1 } })).is_ok());
        assert!(validate_pagination(&json!({
            "pagination": { "page_size": 10, "current": 1 },
            "filters": { "status": 0 }
        }))
        .is_ok());
        assert!(validate_pagination(&json!({ "pagination": { "page_size": 10 } })).is_err());
        assert!(validate_pagination(&json!({ "pagination": { "page_size": "ten", "current": 1 } })).is_err());
        assert!(validate_pagination(&json!({ "pagination": { "page_size": true, "current": 1 } })).is_err());
        assert!(validate_pagination(&json!({ "pagination": 5 })).is_err());
        assert!(validate_pagination(&json!({
            "pagination": { "page_size": 10, "current": 1 },
            "filters": "x"
        }))
        .is_err());
    }

    #[test]
    fn test_pagination_accepts_numeric_strings() {
        assert!(validate_pagination(&json!({ "pagination": { "page_size": "10", "current": " 2 " } })).is_ok());
        assert!(validate_pagination(&json!({ "pagination": { "page_size": "", "current": 1 } })).is_err());
    }

    #[test]
    fn test_pagination_is_required() {
        assert!(validate_pagination(&json!({})).is_err());
        assert!(validate_pagination(&json!({ "pagination": null })).is_err());
        assert!(validate_pagination(&json!({ "filters": {} })).is_err());
    }

    #[test]
    fn test_filters_checked_without_pagination() {
        let err = validate_pagination(&json!({ "filters": "x" })).unwrap_err();
        assert_eq!(err.message(), "filters must be an object");
    }

    #[test]
    fn test_pick_and_merged() {
        let body = json!({ "title": "t", "ignored": 1 });
        let picked = pick(&body, &["title", "message"]);
        assert_eq!(picked["title"], "t");
        assert!(picked["message"].is_null());
        assert!(!picked.contains_key("ignored"));

        let out = merged(json!({ "amount": 5, "user_id": "spoofed" }), &[("user_id", json!("u1"))]);
        assert_eq!(out["amount"], 5);
        assert_eq!(out["user_id"], "u1");
    }
}
