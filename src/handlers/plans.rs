use axum::Json;

use crate::analysis::{catalog, PlanInfo};

/// GET /api/subscription/plans
pub async fn list_plans() -> Json<Vec<PlanInfo>> {
    Json(catalog())
}
