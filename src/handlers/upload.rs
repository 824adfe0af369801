use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use serde::Serialize;

use super::{record_history, AppState};
use crate::{
    analysis::{CostAnalysisInput, CostAnalysisResult, WorkloadType},
    auth::AuthInfo,
    billing::{self, BillingFormat, DecodedBill},
    error::{error_type_name, AppError},
    metrics,
};

/// Multipart field carrying the billing file
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub bill: DecodedBill,
    pub analysis: CostAnalysisResult,
}

/// POST /api/upload-billing
///
/// Decodes the uploaded billing export and analyzes its total and services.
/// The whole file is rejected on any decoding error.
pub async fn upload_billing(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let result = process_upload(&state, &auth, multipart).await;
    if let Err(err) = &result {
        metrics::record_error(error_type_name(err));
        tracing::warn!(api_key = %auth.api_key_name, error = %err, "Billing upload rejected");
    }
    result.map(Json)
}

async fn process_upload(
    state: &AppState,
    auth: &AuthInfo,
    mut multipart: Multipart,
) -> Result<UploadResponse, AppError> {
    let (filename, content) = read_file_field(&mut multipart).await?;

    // Extension allow-list before any bytes are inspected
    let format = BillingFormat::from_filename(&filename)?;

    let name = filename.clone();
    let bill = tokio::task::spawn_blocking(move || billing::decode_billing_file(&content, &name))
        .await
        .map_err(|e| AppError::InternalError(format!("decoder task failed: {}", e)))??;
    metrics::record_upload(format.as_str());

    tracing::debug!(
        filename = %filename,
        source = ?bill.source,
        services = bill.services.len(),
        total = %bill.total_cost,
        "Decoded billing file"
    );

    let input = CostAnalysisInput::new(bill.total_cost, bill.service_names())
        .with_workload(WorkloadType::Other)
        .with_plan(auth.plan);
    let analysis = state.estimator.load().estimate(&input)?;

    metrics::record_analysis(
        format.as_str(),
        input.workload_type.as_str(),
        auth.plan.as_str(),
        analysis.current_bill,
        analysis.potential_savings,
    );
    tracing::info!(
        api_key = %auth.api_key_name,
        plan = %auth.plan,
        filename = %filename,
        bill = %analysis.current_bill,
        potential_savings = %analysis.potential_savings,
        "Completed billing file analysis"
    );

    record_history(state, auth, format.as_str(), Some(filename.as_str()), &analysis).await;

    Ok(UploadResponse {
        filename,
        bill,
        analysis,
    })
}

async fn read_file_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("Uploaded file has no filename".to_string()))?;
        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read uploaded file: {}", e)))?;

        return Ok((filename, content.to_vec()));
    }

    Err(AppError::BadRequest(format!(
        "Missing multipart field '{}'",
        FILE_FIELD
    )))
}
