//! Savings goal progress

use std::collections::BTreeSet;

use serde::Serialize;

use crate::budget::{round2, YearMonth};
use crate::models::{Goal, Transaction};

/// Keyword marking a transaction as a savings deposit
pub const SAVINGS_KEYWORD: &str = "tiết kiệm";

/// Percent of `target` reached by `current`, clamped to 0..=100
///
/// A non-positive target has no meaningful progress and reports 0.
pub fn progress_percent(current: f64, target: f64) -> f64 {
    if target.is_nan() || target <= 0.0 || !current.is_finite() {
        return 0.0;
    }
    round2((current / target * 100.0).clamp(0.0, 100.0))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProgress {
    pub goal_id: String,
    pub name: String,
    pub target: f64,
    pub saved: f64,
    pub percent: f64,
    pub remaining: f64,
    /// Months to reach the target at the average monthly saving rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta_months: Option<u32>,
}

impl GoalProgress {
    fn new(goal: &Goal, saved: f64, eta_months: Option<u32>) -> Self {
        Self {
            goal_id: goal.goal_id.clone(),
            name: goal.name.clone(),
            target: round2(goal.target_amount),
            saved: round2(saved),
            percent: progress_percent(saved, goal.target_amount),
            remaining: round2((goal.target_amount - saved).max(0.0)),
            eta_months,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.percent >= 100.0
    }
}

/// Progress from the goal's stored current amount
pub fn goal_progress(goal: &Goal) -> GoalProgress {
    GoalProgress::new(goal, goal.current_amount, None)
}

/// Progress derived from deposits found in the transactions
///
/// Transactions whose description mentions the goal name or the savings
/// keyword belong to the goal. Only their positive amounts count as saved,
/// but every month with a matching transaction, withdrawals included, is in
/// the average used for the ETA.
pub fn progress_from_transactions(goal: &Goal, transactions: &[Transaction]) -> GoalProgress {
    let name = goal.name.trim().to_lowercase();
    let matched: Vec<&Transaction> = transactions
        .iter()
        .filter(|tx| {
            let desc = tx.msg_content.to_lowercase();
            (!name.is_empty() && desc.contains(&name)) || desc.contains(SAVINGS_KEYWORD)
        })
        .collect();

    let saved: f64 = matched
        .iter()
        .map(|tx| tx.signed_amount())
        .filter(|amount| *amount > 0.0)
        .sum();
    let months: BTreeSet<YearMonth> = matched
        .iter()
        .filter_map(|tx| tx.date())
        .map(YearMonth::of)
        .collect();

    let avg_per_month = if months.is_empty() {
        0.0
    } else {
        saved / months.len() as f64
    };
    let eta_months = if avg_per_month > 0.0 {
        let left = (goal.target_amount - saved).max(0.0);
        Some((left / avg_per_month).ceil() as u32)
    } else {
        None
    };

    GoalProgress::new(goal, saved, eta_months)
}
