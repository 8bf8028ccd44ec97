//! API Gateway client
//!
//! HTTP client for the upstream service that owns the real jar, goal,
//! transaction, notification and AI logic. Responses are not interpreted:
//! every call returns the upstream status code with the JSON body so the
//! server can relay both unchanged.

use reqwest::{Client, Method, Url};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Upstream status and body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayResponse {
    pub status: u16,
    pub body: Value,
}

impl GatewayResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Client for the API Gateway
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http_client: Client,
    base_url: String,
}

impl GatewayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create from `API_GATEWAY_BASE`, if set and non-empty
    pub fn from_env() -> Option<Self> {
        let base = std::env::var("API_GATEWAY_BASE").ok()?;
        if base.trim().is_empty() {
            return None;
        }
        Some(Self::new(&base))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upstream URL for a path given as segments
    ///
    /// Each segment is percent-encoded on its own, so an id can never add
    /// path levels. Empty and dot segments are rejected.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(Error::Validation(format!("Invalid path segment: {:?}", bad)));
        }
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::Gateway(format!("Invalid gateway URL {}: {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| Error::Gateway(format!("Gateway URL cannot be a base: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and capture the upstream response
    ///
    /// Only transport failures are errors; any HTTP status is returned.
    pub async fn send(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<GatewayResponse> {
        let url = self.endpoint(segments)?;
        let path = url.path().to_string();
        let mut request = self.http_client.request(method.clone(), url.clone());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            warn!("Gateway {} {} failed: {}", method, url, e);
            Error::Gateway(format!("{} {}: {}", method, path, e))
        })?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        debug!(%method, path = %path, status, "Gateway response");

        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };
        Ok(GatewayResponse { status, body })
    }

    /// Reachability check against the base URL
    pub async fn health_check(&self) -> bool {
        match self.http_client.get(&self.base_url).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!("Gateway health check failed: {}", e);
                false
            }
        }
    }

    async fn post(&self, segments: &[&str], body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.send(Method::POST, segments, &[], Some(body), token).await
    }

    // ========== Notification ==========

    pub async fn notification_search(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["notification", "search"], body, token).await
    }

    pub async fn notification_create(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["notification", "create"], body, token).await
    }

    pub async fn notification_mark_read(
        &self,
        id: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Result<GatewayResponse> {
        self.send(Method::PATCH, &["notification", id, "status"], &[], Some(body), token)
            .await
    }

    // ========== Transaction ==========

    pub async fn transaction_search(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["transaction", "search"], body, token).await
    }

    pub async fn transaction_create(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["transaction", "create"], body, token).await
    }

    pub async fn transaction_classify(
        &self,
        id: &str,
        body: &Value,
        token: Option<&str>,
    ) -> Result<GatewayResponse> {
        self.send(Method::PATCH, &["transaction", id, "classify"], &[], Some(body), token)
            .await
    }

    // ========== Jar ==========

    pub async fn jar_get(
        &self,
        id: &str,
        user_id: Option<&str>,
        year_month: Option<&str>,
        token: Option<&str>,
    ) -> Result<GatewayResponse> {
        let mut query = Vec::new();
        if let Some(year_month) = year_month {
            query.push(("year_month", year_month.to_string()));
        }
        if let Some(user_id) = user_id {
            query.push(("user_id", user_id.to_string()));
        }
        self.send(Method::GET, &["jar", id], &query, None, token).await
    }

    pub async fn jar_initialize(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["jar", "initialize"], body, token).await
    }

    pub async fn jar_update_percent(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.send(Method::PUT, &["jar", "percent"], &[], Some(body), token)
            .await
    }

    // ========== Goal ==========

    pub async fn goal_search(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["goal", "search"], body, token).await
    }

    pub async fn goal_create(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["goal", "create"], body, token).await
    }

    pub async fn goal_update(&self, id: &str, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.send(Method::PUT, &["goal", id], &[], Some(body), token).await
    }

    pub async fn goal_remove(&self, id: &str, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.send(Method::DELETE, &["goal", id], &[], Some(body), token).await
    }

    // ========== AI ==========

    pub async fn ai_transaction_classify(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["ai", "transaction", "classify"], body, token).await
    }

    pub async fn ai_jar_coaching(&self, user_id: Option<&str>, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["ai", "jar", "coaching"], &json!({ "user_id": user_id }), token)
            .await
    }

    pub async fn ai_goal_coaching(&self, user_id: Option<&str>, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["ai", "goal", "coaching"], &json!({ "user_id": user_id }), token)
            .await
    }

    // ========== QnA ==========

    pub async fn qna_session(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["qna", "session"], body, token).await
    }

    // ========== Auth ==========

    pub async fn auth_get_by_id(&self, id: &str, token: Option<&str>) -> Result<GatewayResponse> {
        self.send(Method::GET, &["auth", id], &[], None, token).await
    }

    pub async fn auth_login(&self, body: &Value, token: Option<&str>) -> Result<GatewayResponse> {
        self.post(&["auth", "login"], body, token).await
    }
}
