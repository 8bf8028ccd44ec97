//! Jars Core Library
//!
//! Shared functionality for the Jars "6 jars" budgeting service:
//! - Domain models for transactions, jars, goals, notifications and users
//! - Keyword classifier assigning transactions to jars
//! - Per-jar budget and exceedance calculator
//! - Goal progress
//! - Jar settings config (percents, extra keywords, fallback)
//! - Flat-file JSON store
//! - API Gateway client for the upstream service
//! - REST API client, credential storage and notification poller

pub mod budget;
pub mod classify;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod goals;
pub mod models;
pub mod poller;
pub mod store;

/// Test utilities including mock API Gateway server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use budget::{
    allocate_income, compute_budget, compute_month_budget, round2, BudgetReport, JarAllocation,
    JarBudget, YearMonth,
};
pub use classify::{Classification, ClassificationSource, Classifier, Fallback, KeywordRule};
pub use client::{ApiClient, AuthResponse, ChatHistory, ChatTurn, ClientState};
pub use config::JarSettings;
pub use credentials::{CredentialProvider, FileCredentials, MemoryCredentials, StaticToken};
pub use error::{Error, Result};
pub use gateway::{GatewayClient, GatewayResponse};
pub use goals::{goal_progress, progress_from_transactions, progress_percent, GoalProgress};
pub use models::{Goal, Jar, JarCode, Notification, Severity, Transaction, User};
pub use poller::{start_notification_poller, NotificationSource, PollerConfig, PollerHandle};
pub use store::{Database, Record, Store};
