//! Domain models for Jars

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One of the six fixed budget jars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum JarCode {
    /// Necessities
    Nec,
    /// Financial Freedom
    Ffa,
    /// Long-term Savings
    Ltss,
    /// Education
    Edu,
    /// Play
    Ply,
    /// Give
    Giv,
}

impl JarCode {
    pub const ALL: [JarCode; 6] = [
        Self::Nec,
        Self::Ffa,
        Self::Ltss,
        Self::Edu,
        Self::Ply,
        Self::Giv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nec => "NEC",
            Self::Ffa => "FFA",
            Self::Ltss => "LTSS",
            Self::Edu => "EDU",
            Self::Ply => "PLY",
            Self::Giv => "GIV",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Nec => "Necessities",
            Self::Ffa => "Financial Freedom",
            Self::Ltss => "Long-term Savings",
            Self::Edu => "Education",
            Self::Ply => "Play",
            Self::Giv => "Give",
        }
    }

    /// Display colour used by the dashboard charts
    pub fn color(&self) -> &'static str {
        match self {
            Self::Nec => "#FF6B6B",
            Self::Ffa => "#4ECDC4",
            Self::Ltss => "#45B7D1",
            Self::Edu => "#96CEB4",
            Self::Ply => "#FFEAA7",
            Self::Giv => "#DDA0DD",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Nec => "Basic needs like food, housing, utilities",
            Self::Ffa => "Investments and passive income",
            Self::Ltss => "Emergency fund and big purchases",
            Self::Edu => "Learning and personal development",
            Self::Ply => "Entertainment and fun activities",
            Self::Giv => "Charity and helping others",
        }
    }
}

impl std::str::FromStr for JarCode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "nec" | "necessities" => Ok(Self::Nec),
            "ffa" | "financial freedom" | "financial_freedom" => Ok(Self::Ffa),
            "ltss" | "long-term savings" | "long_term_savings" => Ok(Self::Ltss),
            "edu" | "education" => Ok(Self::Edu),
            "ply" | "play" => Ok(Self::Ply),
            "giv" | "give" => Ok(Self::Giv),
            _ => Err(format!("Unknown jar: {}", s)),
        }
    }
}

impl TryFrom<String> for JarCode {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<JarCode> for &'static str {
    fn from(code: JarCode) -> Self {
        code.as_str()
    }
}

impl std::fmt::Display for JarCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Transaction types that carry money into the account
pub const INCOME_TYPES: &[&str] = &[
    "income",
    "transfer_in",
    "interest",
    "refund",
    "salary",
    "cashback",
    "openaccumulation",
];

/// Transaction types that carry money out of the account
pub const EXPENSE_TYPES: &[&str] = &[
    "expense",
    "transfer_out",
    "qrcode_payment",
    "atm_withdrawal",
    "service_fee",
    "loan_repayment",
    "stock",
    "bill_payment",
    "mobile_topup",
];

/// Direction of money flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Direction implied by a transaction type, if the type is known
    pub fn from_type(tranx_type: &str) -> Option<Self> {
        let t = tranx_type.trim().to_lowercase();
        if INCOME_TYPES.contains(&t.as_str()) {
            Some(Self::In)
        } else if EXPENSE_TYPES.contains(&t.as_str()) {
            Some(Self::Out)
        } else {
            None
        }
    }
}

/// A bank transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Transaction {
    #[serde(default)]
    pub transaction_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub amount: f64,
    /// RFC 3339 timestamp or plain `YYYY-MM-DD` date
    #[serde(default, alias = "date", skip_serializing_if = "Option::is_none")]
    pub txn_time: Option<String>,
    #[serde(default, alias = "description")]
    pub msg_content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tranx_type: Option<String>,
    /// Assigned jar; set by classification or user override
    #[serde(default, alias = "jar", skip_serializing_if = "Option::is_none")]
    pub category_label: Option<JarCode>,
    #[serde(default)]
    pub is_manual_override: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Fields the server does not interpret, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    /// Amount with the sign implied by `tranx_type`; unknown types keep the stored sign
    pub fn signed_amount(&self) -> f64 {
        match self.tranx_type.as_deref().and_then(Direction::from_type) {
            Some(Direction::In) => self.amount.abs(),
            Some(Direction::Out) => -self.amount.abs(),
            None => self.amount,
        }
    }

    pub fn is_expense(&self) -> bool {
        self.signed_amount() < 0.0
    }

    pub fn is_income(&self) -> bool {
        self.signed_amount() > 0.0
    }

    /// Calendar date of the transaction, if the timestamp parses
    pub fn date(&self) -> Option<NaiveDate> {
        let raw = self.txn_time.as_deref()?.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc).date_naive());
        }
        NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d").ok()
    }

    /// Record a user's explicit jar choice
    pub fn override_category(&mut self, jar: JarCode) {
        self.category_label = Some(jar);
        self.is_manual_override = true;
    }
}

/// A budget jar belonging to a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Jar {
    /// Record key; normally a jar code such as `NEC`
    #[serde(default)]
    pub jar_code: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub name: String,
    /// Allocated percent of income
    #[serde(default)]
    pub percent: f64,
    #[serde(default)]
    pub current_balance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_budget_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Jar {
    /// The fixed jar this record stands for, if its key is a jar code
    pub fn code(&self) -> Option<JarCode> {
        self.jar_code.parse().ok()
    }
}

/// A savings goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Goal {
    #[serde(default)]
    pub goal_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, alias = "goal_name")]
    pub name: String,
    #[serde(default, alias = "target")]
    pub target_amount: f64,
    #[serde(default, alias = "current")]
    pub current_amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, alias = "deadline", skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// `in_progress`, `paused`, `completed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, alias = "priority", skip_serializing_if = "Option::is_none")]
    pub priority_level: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

/// Read status stored on notifications (`0` unread, `1` read)
pub const STATUS_UNREAD: u8 = 0;
pub const STATUS_READ: u8 = 1;

/// A user-facing notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Notification {
    #[serde(default)]
    pub notification_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, alias = "type", skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, alias = "content")]
    pub message: String,
    #[serde(default)]
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    #[serde(default)]
    pub status: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.status != STATUS_UNREAD
    }
}

/// An application user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct User {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, alias = "name")]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Argon2 PHC string; stripped before leaving the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl User {
    /// Copy safe to return to API clients
    pub fn redacted(&self) -> Self {
        let mut user = self.clone();
        user.password_hash = None;
        user.extra.remove("password");
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jar_code_parses_codes_and_names() {
        assert_eq!("NEC".parse::<JarCode>().unwrap(), JarCode::Nec);
        assert_eq!("ltss".parse::<JarCode>().unwrap(), JarCode::Ltss);
        assert_eq!("Education".parse::<JarCode>().unwrap(), JarCode::Edu);
        assert_eq!("Financial Freedom".parse::<JarCode>().unwrap(), JarCode::Ffa);
        assert!("Rent".parse::<JarCode>().is_err());
    }

    #[test]
    fn test_jar_code_serializes_as_code() {
        let json = serde_json::to_string(&JarCode::Ply).unwrap();
        assert_eq!(json, "\"PLY\"");
        let back: JarCode = serde_json::from_str("\"Play\"").unwrap();
        assert_eq!(back, JarCode::Ply);
    }

    #[test]
    fn test_signed_amount_follows_type() {
        let tx = Transaction {
            amount: 150000.0,
            tranx_type: Some("expense".into()),
            ..Default::default()
        };
        assert_eq!(tx.signed_amount(), -150000.0);
        assert!(tx.is_expense());

        let tx = Transaction {
            amount: -2000.0,
            tranx_type: Some("transfer_in".into()),
            ..Default::default()
        };
        assert_eq!(tx.signed_amount(), 2000.0);

        let tx = Transaction {
            amount: -50.0,
            ..Default::default()
        };
        assert_eq!(tx.signed_amount(), -50.0);
    }

    #[test]
    fn test_transaction_accepts_dashboard_shape() {
        let tx: Transaction = serde_json::from_value(serde_json::json!({
            "description": "Groceries",
            "amount": -1200000,
            "date": "2024-01-26",
            "bank_ref": "abc"
        }))
        .unwrap();
        assert_eq!(tx.msg_content, "Groceries");
        assert_eq!(tx.date(), NaiveDate::from_ymd_opt(2024, 1, 26));
        assert_eq!(tx.extra.get("bank_ref"), Some(&Value::from("abc")));
    }

    #[test]
    fn test_transaction_date_from_rfc3339() {
        let tx = Transaction {
            txn_time: Some("2024-06-20T10:30:00Z".into()),
            ..Default::default()
        };
        assert_eq!(tx.date(), NaiveDate::from_ymd_opt(2024, 6, 20));
    }

    #[test]
    fn test_override_category_marks_manual() {
        let mut tx = Transaction::default();
        tx.override_category(JarCode::Edu);
        assert_eq!(tx.category_label, Some(JarCode::Edu));
        assert!(tx.is_manual_override);
    }

    #[test]
    fn test_user_redacted_drops_hash() {
        let user = User {
            email: "a@example.com".into(),
            password_hash: Some("$argon2id$...".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(user.redacted()).unwrap();
        assert!(json.get("password_hash").is_none());
    }
}
