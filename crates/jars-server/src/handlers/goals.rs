//! Goal progress handler

use std::sync::Arc;

use axum::{extract::State, Json};

use jars_core::{goal_progress, GoalProgress};

use crate::{AppError, AppState};

/// GET /api/goals/progress - Progress for every stored goal
pub async fn list_goal_progress(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GoalProgress>>, AppError> {
    let progress = state
        .store
        .read(|db| db.goals.iter().map(goal_progress).collect())
        .map_err(AppError::from_core)?;
    Ok(Json(progress))
}
