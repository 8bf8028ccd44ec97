//! HTTP client for the Jars REST API
//!
//! Talks to the server's `/api` routes (`JARS_API_URL`, default
//! `http://localhost:5001/api`). The bearer token comes from a
//! [`CredentialProvider`], so the same client works for the CLI (token
//! file), tests (in-memory) and scripts (static token).

mod state;

pub use state::{ChatHistory, ChatTurn, ClientState};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::classify::Classification;
use crate::credentials::CredentialProvider;
use crate::error::{Error, Result};
use crate::models::{Goal, Jar, JarCode, Notification, Transaction, User};
use crate::poller::NotificationSource;

pub const DEFAULT_API_URL: &str = "http://localhost:5001/api";

/// Successful login or registration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// Client for the Jars REST API
#[derive(Clone)]
pub struct ApiClient {
    http_client: Client,
    base_url: String,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    /// Create from `JARS_API_URL`, falling back to the local default
    pub fn from_env(credentials: Arc<dyn CredentialProvider>) -> Self {
        let url = std::env::var("JARS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        Self::new(&url, credentials)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut request = self.http_client.request(method.clone(), &url);
        if let Some(token) = self.credentials.token()? {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "API response");

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let message = error_message(&text).unwrap_or_else(|| status.to_string());
        Err(match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(message),
            StatusCode::NOT_FOUND => Error::NotFound(message),
            StatusCode::BAD_REQUEST => Error::Validation(message),
            _ => Error::Gateway(format!("{} {}: {}", method, path, message)),
        })
    }

    // ========== Auth ==========

    /// Log in and remember the token
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse> {
        let auth: AuthResponse = self
            .request(
                Method::POST,
                "auth/login",
                Some(&json!({ "email": email, "password": password })),
            )
            .await?;
        self.credentials.store(&auth.token)?;
        Ok(auth)
    }

    /// Register and remember the token
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<AuthResponse> {
        let auth: AuthResponse = self
            .request(
                Method::POST,
                "auth/register",
                Some(&json!({ "email": email, "password": password, "name": name })),
            )
            .await?;
        self.credentials.store(&auth.token)?;
        Ok(auth)
    }

    /// Forget the token; the server call is best effort
    pub async fn logout(&self) -> Result<()> {
        if let Err(e) = self
            .request::<Value>(Method::POST, "auth/logout", None)
            .await
        {
            warn!("Logout request failed: {}", e);
        }
        self.credentials.clear()
    }

    pub async fn me(&self) -> Result<User> {
        self.request(Method::GET, "auth/me", None).await
    }

    // ========== Resources ==========

    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        self.request(Method::GET, "transactions", None).await
    }

    pub async fn create_transaction(&self, tx: &Transaction) -> Result<Transaction> {
        let body = serde_json::to_value(tx)?;
        self.request(Method::POST, "transactions", Some(&body)).await
    }

    /// Override a transaction's jar
    pub async fn classify_transaction(&self, id: &str, jar: JarCode) -> Result<Transaction> {
        let path = format!("transactions/{}/classify", id);
        self.request(
            Method::PATCH,
            &path,
            Some(&json!({ "category_label": jar })),
        )
        .await
    }

    pub async fn list_jars(&self) -> Result<Vec<Jar>> {
        self.request(Method::GET, "jars", None).await
    }

    pub async fn list_goals(&self) -> Result<Vec<Goal>> {
        self.request(Method::GET, "goals", None).await
    }

    pub async fn list_notifications(&self) -> Result<Vec<Notification>> {
        self.request(Method::GET, "notifications", None).await
    }

    pub async fn set_notification_read(&self, id: &str, read: bool) -> Result<Notification> {
        let path = format!("notifications/{}/status", id);
        let status = if read { 1 } else { 0 };
        self.request(Method::PATCH, &path, Some(&json!({ "status": status })))
            .await
    }

    /// Server-side keyword classification of a description
    pub async fn classify_description(&self, description: &str) -> Result<Classification> {
        self.request(
            Method::POST,
            "classify",
            Some(&json!({ "description": description })),
        )
        .await
    }

    /// Ask the assistant through the gateway relay
    pub async fn qna_session(&self, history: &ChatHistory, prompt: &str) -> Result<Value> {
        self.request(
            Method::POST,
            "v1/qna/session",
            Some(&json!({ "history": history, "prompt": prompt })),
        )
        .await
    }

    // ========== State ==========

    /// Fetch everything into the client state
    pub async fn refresh(&self, state: &mut ClientState) -> Result<()> {
        state.begin_load();
        let result = self.fetch_all().await;
        state.finish_load(&result);
        let (jars, transactions, goals, notifications) = result?;
        state.jars = jars;
        state.transactions = transactions;
        state.goals = goals;
        state.notifications = notifications;
        Ok(())
    }

    async fn fetch_all(
        &self,
    ) -> Result<(Vec<Jar>, Vec<Transaction>, Vec<Goal>, Vec<Notification>)> {
        tokio::try_join!(
            self.list_jars(),
            self.list_transactions(),
            self.list_goals(),
            self.list_notifications(),
        )
    }

    /// Mark a notification read, rolling back the local change on failure
    pub async fn mark_read(&self, state: &mut ClientState, id: &str) -> Result<()> {
        let Some(previous) = state.mark_read(id, true) else {
            return Err(Error::NotFound(format!("notifications {}", id)));
        };
        if let Err(e) = self.set_notification_read(id, true).await {
            state.restore_notification_status(id, previous);
            state.error = Some(e.to_string());
            return Err(e);
        }
        Ok(())
    }

    /// Override a transaction's jar, rolling back the local change on failure
    pub async fn override_category(
        &self,
        state: &mut ClientState,
        id: &str,
        jar: JarCode,
    ) -> Result<()> {
        let Some(previous) = state.override_category(id, jar) else {
            return Err(Error::NotFound(format!("transactions {}", id)));
        };
        match self.classify_transaction(id, jar).await {
            Ok(saved) => {
                state.restore_transaction(saved);
                Ok(())
            }
            Err(e) => {
                state.restore_transaction(previous);
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Add a transaction optimistically, replacing it with the saved copy
    pub async fn add_transaction(&self, state: &mut ClientState, tx: Transaction) -> Result<Transaction> {
        let temp_id = state.add_pending_transaction(tx.clone());
        match self.create_transaction(&tx).await {
            Ok(saved) => {
                state.settle_pending_transaction(&temp_id, Some(saved.clone()));
                Ok(saved)
            }
            Err(e) => {
                state.settle_pending_transaction(&temp_id, None);
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Send a prompt and record the answer in the chat history
    pub async fn ask(&self, state: &mut ClientState, prompt: &str) -> Result<String> {
        let history = state.chat.clone();
        state.chat.push_prompt(prompt);
        match self.qna_session(&history, prompt).await {
            Ok(reply) => {
                let answer = answer_text(&reply);
                let tools = reply
                    .get("used_tools")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                state.chat.record_answer(&answer, tools);
                Ok(answer)
            }
            Err(e) => {
                state.chat.discard_pending();
                state.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

#[async_trait]
impl NotificationSource for ApiClient {
    async fn fetch_notifications(&self) -> Result<Vec<Notification>> {
        self.list_notifications().await
    }
}

/// `error` or `message` field of an error body
fn error_message(text: &str) -> Option<String> {
    let body: Value = serde_json::from_str(text).ok()?;
    body.get("error")
        .or_else(|| body.get("message"))
        .and_then(Value::as_str)
        .map(String::from)
}

/// Answer text from a QnA reply, which may be a bare string or an object
fn answer_text(reply: &Value) -> String {
    match reply {
        Value::String(s) => s.clone(),
        _ => ["ai_answer", "answer", "response"]
            .iter()
            .find_map(|key| reply.get(*key).and_then(Value::as_str))
            .map(String::from)
            .unwrap_or_else(|| reply.to_string()),
    }
}
