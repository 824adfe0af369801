use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    auth::AuthInfo,
    error::AppError,
    history::{AnalysisRecord, HistoryStore, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryPage {
    pub analyses: Vec<AnalysisRecord>,
    /// All analyses stored for the calling key
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

/// GET /api/analyses?limit=&offset=
///
/// Past analyses of the calling API key, newest first. `limit` defaults to
/// 10 and is clamped to 1..=100.
pub async fn list_analyses(
    State(history): State<Arc<HistoryStore>>,
    Extension(auth): Extension<AuthInfo>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<Json<HistoryPage>, AppError> {
    let Query(query) = query.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0);

    let analyses = history.list(&auth.api_key_name, limit, offset).await?;
    let total = history.count(&auth.api_key_name).await?;

    tracing::debug!(
        api_key = %auth.api_key_name,
        returned = analyses.len(),
        total,
        "Listed analysis history"
    );

    Ok(Json(HistoryPage {
        analyses,
        total,
        limit,
        offset,
    }))
}
