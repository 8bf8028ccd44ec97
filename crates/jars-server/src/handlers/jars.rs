//! Jar budget summary handler

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use jars_core::{compute_budget, compute_month_budget, BudgetReport, YearMonth};

use crate::{AppError, AppState};

/// Query parameters for GET /api/jars/summary
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// `YYYY-MM`; all transactions when absent
    pub month: Option<String>,
}

/// GET /api/jars/summary - Per-jar spend, allowance and exceedance
///
/// Percents come from the stored jar records, falling back to the
/// configured settings for jars without a record.
pub async fn get_jar_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<BudgetReport>, AppError> {
    let month: Option<YearMonth> = match query.month.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            raw.parse()
                .map_err(|e: String| AppError::bad_request(&e))?,
        ),
        _ => None,
    };

    let (transactions, jars) = state
        .store
        .read(|db| (db.transactions.clone(), db.jars.clone()))
        .map_err(AppError::from_core)?;
    let settings = state.config.settings.clone().with_jars(&jars);

    let report = match month {
        Some(month) => compute_month_budget(&transactions, month, &settings, &state.classifier),
        None => compute_budget(&transactions, &settings, &state.classifier),
    };
    Ok(Json(report))
}
