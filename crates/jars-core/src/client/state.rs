//! Cached client-side view of the user's data
//!
//! Mutations are applied optimistically: the local copy changes first and
//! the caller keeps the returned previous value to roll back if the server
//! rejects the change.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::budget::{compute_budget, compute_month_budget, months, BudgetReport, YearMonth};
use crate::classify::Classifier;
use crate::config::JarSettings;
use crate::goals::{goal_progress, GoalProgress};
use crate::models::{Goal, Jar, JarCode, Notification, Transaction, STATUS_READ, STATUS_UNREAD};

/// One exchange with the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ChatTurn {
    #[serde(default)]
    pub user_prompt: String,
    #[serde(default)]
    pub ai_answer: String,
    #[serde(default)]
    pub used_tools: Vec<Value>,
    /// Milliseconds since the Unix epoch
    #[serde(default)]
    pub user_time: Option<i64>,
    #[serde(default)]
    pub ai_time: Option<i64>,
}

/// Ordered conversation with the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ChatHistory {
    turns: Vec<ChatTurn>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Start a turn for a prompt; the answer is filled in later
    pub fn push_prompt(&mut self, prompt: &str) {
        self.turns.push(ChatTurn {
            user_prompt: prompt.to_string(),
            user_time: Some(Utc::now().timestamp_millis()),
            ..Default::default()
        });
    }

    /// Complete the latest turn with the assistant's answer
    pub fn record_answer(&mut self, answer: &str, used_tools: Vec<Value>) {
        let now = Utc::now().timestamp_millis();
        match self.turns.last_mut() {
            Some(turn) if turn.ai_time.is_none() => {
                turn.ai_answer = answer.to_string();
                turn.used_tools = used_tools;
                turn.ai_time = Some(now);
            }
            _ => self.turns.push(ChatTurn {
                ai_answer: answer.to_string(),
                used_tools,
                ai_time: Some(now),
                ..Default::default()
            }),
        }
    }

    /// Drop a turn that never got an answer
    pub fn discard_pending(&mut self) {
        if self.turns.last().is_some_and(|t| t.ai_time.is_none()) {
            self.turns.pop();
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }
}

/// Client application state
#[derive(Debug, Clone, Default)]
pub struct ClientState {
    pub jars: Vec<Jar>,
    pub transactions: Vec<Transaction>,
    pub goals: Vec<Goal>,
    pub notifications: Vec<Notification>,
    pub chat: ChatHistory,
    pub loading: bool,
    pub error: Option<String>,
}

impl ClientState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a fetch as started
    pub fn begin_load(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Mark a fetch as finished, keeping its error message if it failed
    pub fn finish_load<T, E: std::fmt::Display>(&mut self, result: &Result<T, E>) {
        self.loading = false;
        self.error = result.as_ref().err().map(|e| e.to_string());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_notifications(&mut self, notifications: Vec<Notification>) {
        self.notifications = notifications;
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read()).count()
    }

    /// Set a notification's read flag locally, returning the previous status
    pub fn mark_read(&mut self, id: &str, read: bool) -> Option<u8> {
        let notification = self
            .notifications
            .iter_mut()
            .find(|n| n.notification_id == id)?;
        let previous = notification.status;
        notification.status = if read { STATUS_READ } else { STATUS_UNREAD };
        Some(previous)
    }

    pub fn restore_notification_status(&mut self, id: &str, status: u8) {
        if let Some(n) = self.notifications.iter_mut().find(|n| n.notification_id == id) {
            n.status = status;
        }
    }

    /// Override a transaction's jar locally, returning the previous record
    pub fn override_category(&mut self, id: &str, jar: JarCode) -> Option<Transaction> {
        let tx = self
            .transactions
            .iter_mut()
            .find(|t| t.transaction_id == id)?;
        let previous = tx.clone();
        tx.override_category(jar);
        Some(previous)
    }

    /// Put back a transaction saved before an optimistic change
    pub fn restore_transaction(&mut self, previous: Transaction) {
        if let Some(tx) = self
            .transactions
            .iter_mut()
            .find(|t| t.transaction_id == previous.transaction_id)
        {
            *tx = previous;
        }
    }

    /// Add a transaction locally under a temporary id
    pub fn add_pending_transaction(&mut self, mut tx: Transaction) -> String {
        let temp_id = format!("pending-{}", uuid::Uuid::new_v4().simple());
        tx.transaction_id = temp_id.clone();
        self.transactions.insert(0, tx);
        temp_id
    }

    /// Replace a pending transaction with the server's copy, or drop it on failure
    pub fn settle_pending_transaction(&mut self, temp_id: &str, saved: Option<Transaction>) {
        let idx = self
            .transactions
            .iter()
            .position(|t| t.transaction_id == temp_id);
        match (idx, saved) {
            (Some(i), Some(tx)) => self.transactions[i] = tx,
            (Some(i), None) => {
                self.transactions.remove(i);
            }
            (None, Some(tx)) => self.transactions.insert(0, tx),
            (None, None) => {}
        }
    }

    /// Months present in the cached transactions, oldest first
    pub fn months(&self) -> Vec<YearMonth> {
        months(&self.transactions)
    }

    /// Budget over the cached transactions, using stored jar percents
    pub fn budget(
        &self,
        settings: &JarSettings,
        classifier: &Classifier,
        month: Option<YearMonth>,
    ) -> BudgetReport {
        let settings = settings.clone().with_jars(&self.jars);
        match month {
            Some(month) => compute_month_budget(&self.transactions, month, &settings, classifier),
            None => compute_budget(&self.transactions, &settings, classifier),
        }
    }

    pub fn goal_progress(&self) -> Vec<GoalProgress> {
        self.goals.iter().map(goal_progress).collect()
    }
}
