//! Jars Web Server
//!
//! Axum-based REST API for the Jars budgeting service.
//!
//! Two groups of routes share the `/api` prefix:
//! - local routes backed by the flat-file store (CRUD, classification,
//!   budget summary, goal progress, auth)
//! - `/api/v1` relay routes forwarding to the API Gateway
//!
//! Security features:
//! - Bearer token authentication on local routes (use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post, put},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use jars_core::{
    Classifier, GatewayClient, Goal, Jar, JarSettings, Notification, Store, Transaction,
};

pub mod auth;
mod handlers;

pub use auth::Claims;

/// Default listen port
pub const DEFAULT_PORT: u16 = 5001;

/// Maximum request body accepted under /api (1 MB)
pub const MAX_BODY_SIZE: usize = 1024 * 1024;

/// Authorization header for bearer tokens
const AUTHORIZATION_HEADER: &str = "authorization";

/// Local routes reachable without a token
const PUBLIC_PATHS: &[&str] = &[
    "/api/test",
    "/api/auth/login",
    "/api/auth/register",
    "/api/auth/logout",
];

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether local routes require a bearer token (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// HS256 signing secret for local tokens; random per process when unset
    pub jwt_secret: Option<String>,
    /// API Gateway base URL for `/api/v1` relay routes
    pub gateway_base: Option<String>,
    /// Jar percents, extra keywords and fallback
    pub settings: JarSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            jwt_secret: None,
            gateway_base: None,
            settings: JarSettings::default(),
        }
    }
}

/// Shared application state
pub struct AppState {
    pub store: Store,
    pub config: ServerConfig,
    pub gateway: Option<GatewayClient>,
    pub classifier: Classifier,
    /// Resolved token signing secret
    pub jwt_secret: String,
}

/// Authentication middleware - validates local bearer tokens
///
/// A valid token's [`Claims`] are attached to the request either way so
/// handlers like `/api/auth/me` can see the caller. When auth is required,
/// local routes other than [`PUBLIC_PATHS`] reject requests without a valid
/// token. Relay routes under `/api/v1` are never blocked here: the caller's
/// token is forwarded and the gateway decides.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let token = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(auth::bearer_token)
        .map(String::from);

    let claims = token
        .as_deref()
        .map(|t| auth::verify_token(t, &state.jwt_secret));

    match claims {
        Some(Ok(claims)) => {
            debug!(user = %claims.sub, path = %path, "Authenticated via bearer token");
            request.extensions_mut().insert(claims);
            return next.run(request).await;
        }
        Some(Err(e)) if !path.starts_with("/api/v1/") => {
            debug!(error = %e, path = %path, "Rejected bearer token");
        }
        _ => {}
    }

    if !state.config.require_auth
        || path.starts_with("/api/v1/")
        || !path.starts_with("/api/")
        || PUBLIC_PATHS.contains(&path.as_str())
    {
        return next.run(request).await;
    }

    warn!(path = %path, "Unauthorized request - no valid token");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router
pub fn create_router(store: Store, static_dir: Option<&str>, config: ServerConfig) -> Router {
    let gateway = config.gateway_base.as_deref().map(GatewayClient::new);
    if let Some(ref client) = gateway {
        info!("API Gateway configured: {}", client.base_url());
    } else {
        info!("ℹ️  API Gateway not configured (set API_GATEWAY_BASE to enable /api/v1 routes)");
    }
    create_router_with_gateway(store, static_dir, config, gateway)
}

/// Create the application router with an explicit gateway client (for testing)
pub fn create_router_with_gateway(
    store: Store,
    static_dir: Option<&str>,
    config: ServerConfig,
    gateway: Option<GatewayClient>,
) -> Router {
    let jwt_secret = match config.jwt_secret.clone().filter(|s| !s.is_empty()) {
        Some(secret) => secret,
        None => {
            warn!("JWT_SECRET not set; tokens will not survive a restart");
            uuid::Uuid::new_v4().simple().to_string()
        }
    };

    let state = Arc::new(AppState {
        store,
        classifier: Classifier::from_settings(&config.settings),
        config: config.clone(),
        gateway,
        jwt_secret,
    });

    let api_routes = Router::new()
        .route("/test", get(handlers::api_test))
        // Auth
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/me", get(handlers::get_me))
        // Users
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route(
            "/users/:id",
            get(handlers::get_user)
                .put(handlers::update_user)
                .delete(handlers::delete_user),
        )
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_records::<Transaction>).post(handlers::create_record::<Transaction>),
        )
        .route(
            "/transactions/:id",
            get(handlers::get_record::<Transaction>)
                .put(handlers::update_record::<Transaction>)
                .delete(handlers::delete_record::<Transaction>),
        )
        .route("/transactions/:id/classify", patch(handlers::classify_transaction))
        .route("/classify", post(handlers::classify_description))
        // Notifications
        .route(
            "/notifications",
            get(handlers::list_records::<Notification>)
                .post(handlers::create_record::<Notification>),
        )
        .route(
            "/notifications/:id",
            get(handlers::get_record::<Notification>)
                .put(handlers::update_record::<Notification>)
                .delete(handlers::delete_record::<Notification>),
        )
        .route(
            "/notifications/:id/status",
            patch(handlers::update_notification_status),
        )
        // Goals
        .route(
            "/goals",
            get(handlers::list_records::<Goal>).post(handlers::create_record::<Goal>),
        )
        .route("/goals/progress", get(handlers::list_goal_progress))
        .route(
            "/goals/:id",
            get(handlers::get_record::<Goal>)
                .put(handlers::update_record::<Goal>)
                .delete(handlers::delete_record::<Goal>),
        )
        // Jars
        .route(
            "/jars",
            get(handlers::list_records::<Jar>).post(handlers::create_record::<Jar>),
        )
        .route("/jars/summary", get(handlers::get_jar_summary))
        .route(
            "/jars/:id",
            get(handlers::get_record::<Jar>)
                .put(handlers::update_record::<Jar>)
                .delete(handlers::delete_record::<Jar>),
        )
        // Gateway relay
        .nest("/v1", relay_routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        // Allow specified origins
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    // Security headers
    // CSP: restrict scripts to same-origin, allow inline styles, allow data: for images
    let csp_value = HeaderValue::from_static(
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; img-src 'self' blob: data:; font-src 'self'; connect-src 'self'; frame-ancestors 'none'"
    );

    let mut app = Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            csp_value,
        ));

    // Serve static files if directory provided
    if let Some(dir) = static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// `/api/v1` routes relayed to the API Gateway
fn relay_routes() -> Router<Arc<AppState>> {
    Router::new()
        // Notification
        .route("/notification/search", post(handlers::relay_notification_search))
        .route("/notification/create", post(handlers::relay_notification_create))
        .route(
            "/notification/:id/status",
            patch(handlers::relay_notification_status),
        )
        // Transaction
        .route("/transaction/search", post(handlers::relay_transaction_search))
        .route("/transaction/create", post(handlers::relay_transaction_create))
        .route(
            "/transaction/:id/classify",
            patch(handlers::relay_transaction_classify),
        )
        // Jar
        .route("/jar/initialize", post(handlers::relay_jar_initialize))
        .route("/jar/percent", put(handlers::relay_jar_percent))
        .route("/jar/:id", get(handlers::relay_jar_get))
        // Goal
        .route("/goal/search", post(handlers::relay_goal_search))
        .route("/goal/create", post(handlers::relay_goal_create))
        .route(
            "/goal/:id",
            put(handlers::relay_goal_update).delete(handlers::relay_goal_delete),
        )
        // AI
        .route(
            "/ai/transaction/classify",
            post(handlers::relay_ai_transaction_classify),
        )
        .route("/ai/jar/coaching", post(handlers::relay_ai_jar_coaching))
        .route("/ai/goal/coaching", post(handlers::relay_ai_goal_coaching))
        // QnA
        .route("/qna/session", post(handlers::relay_qna_session))
        // Auth
        .route("/auth/login", post(handlers::relay_auth_login))
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/:id", get(handlers::relay_auth_get))
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    store: Store,
    host: &str,
    port: u16,
    static_dir: Option<&str>,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    }
    if !config.settings.is_balanced() {
        warn!(
            "⚠️  Jar percents sum to {} instead of 100",
            config.settings.total_percent()
        );
    }

    check_gateway_connection(config.gateway_base.as_deref()).await;

    let app = create_router(store, static_dir, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);
    info!("Test the API at: http://{}/api/test", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log API Gateway connection status
async fn check_gateway_connection(base: Option<&str>) {
    match base.map(GatewayClient::new) {
        Some(client) => {
            if client.health_check().await {
                info!("✅ API Gateway reachable: {}", client.base_url());
            } else {
                warn!(
                    "⚠️  API Gateway configured but not responding: {}",
                    client.base_url()
                );
            }
        }
        None => {
            info!("ℹ️  API Gateway not configured (set API_GATEWAY_BASE to enable relay)");
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn unauthorized(msg: &str) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_gateway(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_GATEWAY,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Map a core error to its HTTP status
    pub fn from_core(err: jars_core::Error) -> Self {
        use jars_core::Error;
        match err {
            Error::NotFound(_) => Self::not_found("Not found"),
            Error::Validation(msg) => Self::bad_request(&msg),
            Error::Auth(msg) => Self::unauthorized(&msg),
            Error::Gateway(msg) => {
                error!(error = %msg, "Gateway request failed");
                Self::bad_gateway("API Gateway unavailable")
            }
            other => Self::from(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
