use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::{record_history, AppState};
use crate::{
    analysis::{
        parse_bill, CostAnalysisInput, CostAnalysisResult, SubscriptionPlan, WorkloadType,
    },
    auth::AuthInfo,
    error::{error_type_name, AppError, ValidationError},
    history::MANUAL_SOURCE,
    metrics,
};

/// Body of POST /api/analyze
///
/// `monthly_bill` accepts a JSON number or a numeric string.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub monthly_bill: Option<Value>,
    #[serde(default)]
    pub services: Vec<String>,
    pub region: Option<String>,
    pub workload_type: Option<String>,
}

impl AnalyzeRequest {
    pub fn into_input(self, plan: SubscriptionPlan) -> Result<CostAnalysisInput, ValidationError> {
        let bill = bill_from_value(self.monthly_bill.as_ref())?;
        let services = self
            .services
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let mut input = CostAnalysisInput::new(bill, services)
            .with_workload(
                self.workload_type
                    .as_deref()
                    .map(WorkloadType::from_name)
                    .unwrap_or_default(),
            )
            .with_plan(plan);
        if let Some(region) = self.region {
            input = input.with_region(region);
        }
        Ok(input)
    }
}

fn bill_from_value(value: Option<&Value>) -> Result<Decimal, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::Blank {
            field: "monthly_bill",
        }),
        Some(Value::Number(number)) => parse_bill(&number.to_string()),
        Some(Value::String(text)) => parse_bill(text),
        Some(other) => Err(ValidationError::InvalidAmount {
            field: "monthly_bill",
            value: other.to_string(),
        }),
    }
}

/// POST /api/analyze
///
/// Runs the estimator on a manually entered bill, using the plan bound to the
/// caller's API key.
pub async fn analyze_costs(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthInfo>,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<CostAnalysisResult>, AppError> {
    match run_analysis(&state, &auth, payload) {
        Ok(result) => {
            record_history(&state, &auth, MANUAL_SOURCE, None, &result).await;
            Ok(Json(result))
        }
        Err(err) => {
            metrics::record_error(error_type_name(&err));
            tracing::warn!(api_key = %auth.api_key_name, error = %err, "Cost analysis rejected");
            Err(err)
        }
    }
}

fn run_analysis(
    state: &AppState,
    auth: &AuthInfo,
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<CostAnalysisResult, AppError> {
    let Json(request) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    let input = request.into_input(auth.plan)?;

    let estimator = state.estimator.load();
    let result = estimator.estimate(&input)?;

    metrics::record_analysis(
        MANUAL_SOURCE,
        input.workload_type.as_str(),
        auth.plan.as_str(),
        result.current_bill,
        result.potential_savings,
    );
    tracing::info!(
        api_key = %auth.api_key_name,
        plan = %auth.plan,
        workload = %input.workload_type,
        services = input.services.len(),
        bill = %result.current_bill,
        potential_savings = %result.potential_savings,
        "Completed cost analysis"
    );

    Ok(result)
}
