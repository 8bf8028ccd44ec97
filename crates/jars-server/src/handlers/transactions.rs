//! Transaction classification handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use jars_core::{Classification, JarCode, Transaction};

use super::typed_body;
use crate::{AppError, AppState};

/// Request body for PATCH /api/transactions/:id/classify
#[derive(Debug, Deserialize)]
pub struct ClassifyTransactionRequest {
    pub category_label: String,
}

/// PATCH /api/transactions/:id/classify - User override of a transaction's jar
pub async fn classify_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<Transaction>, AppError> {
    let req: ClassifyTransactionRequest = typed_body(&body)?;
    let jar: JarCode = req
        .category_label
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;

    let tx = state
        .store
        .modify::<Transaction>(&id, |tx| tx.override_category(jar))
        .map_err(AppError::from_core)?;

    info!(id = %id, jar = %jar, "Transaction classified by user");
    Ok(Json(tx))
}

/// Request body for POST /api/classify
#[derive(Debug, Deserialize)]
pub struct ClassifyRequest {
    #[serde(alias = "msg_content")]
    pub description: String,
}

/// Response for POST /api/classify
#[derive(Serialize)]
pub struct ClassifyResponse {
    #[serde(flatten)]
    pub classification: Classification,
    pub name: &'static str,
    pub color: &'static str,
}

/// POST /api/classify - Keyword classification of a description
pub async fn classify_description(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ClassifyResponse>, AppError> {
    let req: ClassifyRequest = typed_body(&body)?;
    let classification = state.classifier.explain(&req.description);
    Ok(Json(ClassifyResponse {
        name: classification.jar.name(),
        color: classification.jar.color(),
        classification,
    }))
}
