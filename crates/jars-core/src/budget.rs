//! Jar budget and exceedance calculation
//!
//! For a set of transactions and per-jar percent settings, computes how much
//! each jar spent, its share of total spending, the amount its percent
//! allows, and by how much it went over.
//!
//! All arithmetic is done at full `f64` precision; every reported figure is
//! rounded half away from zero to two decimals at the end. Division by a
//! zero total yields 0.

use std::collections::BTreeSet;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::classify::Classifier;
use crate::config::JarSettings;
use crate::models::{JarCode, Transaction};

/// Round half away from zero to two decimals
pub fn round2(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 100.0).round() / 100.0
}

/// A calendar month, written `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl std::str::FromStr for YearMonth {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (y, m) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("Invalid month (expected YYYY-MM): {}", s))?;
        let year: i32 = y
            .parse()
            .map_err(|_| format!("Invalid month (expected YYYY-MM): {}", s))?;
        let month: u32 = m
            .parse()
            .map_err(|_| format!("Invalid month (expected YYYY-MM): {}", s))?;
        Self::new(year, month).ok_or_else(|| format!("Invalid month: {}", s))
    }
}

impl TryFrom<String> for YearMonth {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<YearMonth> for String {
    fn from(ym: YearMonth) -> Self {
        ym.to_string()
    }
}

impl std::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Transactions falling in a month; undated transactions are excluded
pub fn filter_by_month(transactions: &[Transaction], month: YearMonth) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|tx| tx.date().is_some_and(|d| month.contains(d)))
        .cloned()
        .collect()
}

/// Distinct months present in the transactions, oldest first
pub fn months(transactions: &[Transaction]) -> Vec<YearMonth> {
    transactions
        .iter()
        .filter_map(Transaction::date)
        .map(YearMonth::of)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Budget figures for one jar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JarBudget {
    pub jar: JarCode,
    pub name: &'static str,
    pub color: &'static str,
    /// Sum of expense magnitudes assigned to this jar
    pub spent: f64,
    /// Share of total expense, in percent
    pub actual_percent: f64,
    /// Configured percent of income
    pub set_percent: f64,
    /// Total expense times the configured percent
    pub allowed: f64,
    /// Spend beyond the allowed amount
    pub exceeded: f64,
    /// Allowed amount not yet spent
    pub remaining: f64,
}

impl JarBudget {
    pub fn is_exceeded(&self) -> bool {
        self.exceeded > 0.0
    }
}

/// Budget figures for all six jars
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<YearMonth>,
    pub jars: Vec<JarBudget>,
    pub total_expense: f64,
    pub total_income: f64,
    /// Sum of signed amounts
    pub balance: f64,
    /// Sum of configured percents
    pub percent_total: f64,
    /// Whether configured percents sum to 100
    pub percent_balanced: bool,
}

impl BudgetReport {
    pub fn jar(&self, jar: JarCode) -> Option<&JarBudget> {
        self.jars.iter().find(|b| b.jar == jar)
    }

    /// Jars whose spending exceeded their allowance
    pub fn exceeded(&self) -> impl Iterator<Item = &JarBudget> {
        self.jars.iter().filter(|b| b.is_exceeded())
    }
}

/// Compute per-jar budgets over the given transactions
pub fn compute_budget(
    transactions: &[Transaction],
    settings: &JarSettings,
    classifier: &Classifier,
) -> BudgetReport {
    let mut spent = [0.0_f64; 6];
    let mut total_income = 0.0;
    let mut balance = 0.0;

    for tx in transactions {
        let amount = tx.signed_amount();
        if !amount.is_finite() {
            continue;
        }
        balance += amount;
        if amount < 0.0 {
            let jar = classifier.jar_for(tx);
            spent[slot(jar)] += amount.abs();
        } else {
            total_income += amount;
        }
    }

    let total_expense: f64 = spent.iter().sum();

    let jars = JarCode::ALL
        .iter()
        .map(|jar| {
            let jar_spent = spent[slot(*jar)];
            let set_percent = settings.percent(*jar);
            let actual_percent = if total_expense > 0.0 {
                jar_spent / total_expense * 100.0
            } else {
                0.0
            };
            let allowed = total_expense * set_percent / 100.0;
            JarBudget {
                jar: *jar,
                name: jar.name(),
                color: jar.color(),
                spent: round2(jar_spent),
                actual_percent: round2(actual_percent),
                set_percent: round2(set_percent),
                allowed: round2(allowed),
                exceeded: round2((jar_spent - allowed).max(0.0)),
                remaining: round2((allowed - jar_spent).max(0.0)),
            }
        })
        .collect();

    BudgetReport {
        month: None,
        jars,
        total_expense: round2(total_expense),
        total_income: round2(total_income),
        balance: round2(balance),
        percent_total: round2(settings.total_percent()),
        percent_balanced: settings.is_balanced(),
    }
}

/// Compute budgets for one month of transactions
pub fn compute_month_budget(
    transactions: &[Transaction],
    month: YearMonth,
    settings: &JarSettings,
    classifier: &Classifier,
) -> BudgetReport {
    let in_month = filter_by_month(transactions, month);
    let mut report = compute_budget(&in_month, settings, classifier);
    report.month = Some(month);
    report
}

/// Share of an income amount assigned to a jar
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JarAllocation {
    pub jar: JarCode,
    pub percent: f64,
    pub amount: f64,
}

/// Split an income amount across jars by their configured percent
pub fn allocate_income(income: f64, settings: &JarSettings) -> Vec<JarAllocation> {
    JarCode::ALL
        .iter()
        .map(|jar| {
            let percent = settings.percent(*jar);
            JarAllocation {
                jar: *jar,
                percent: round2(percent),
                amount: round2(income * percent / 100.0),
            }
        })
        .collect()
}

fn slot(jar: JarCode) -> usize {
    match jar {
        JarCode::Nec => 0,
        JarCode::Ffa => 1,
        JarCode::Ltss => 2,
        JarCode::Edu => 3,
        JarCode::Ply => 4,
        JarCode::Giv => 5,
    }
}
