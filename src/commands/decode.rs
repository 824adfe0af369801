use anyhow::{Context, Result};
use aws_cost_advisor::analysis::{
    CostAnalysisInput, CostAnalysisResult, CostEstimator, SubscriptionPlan, WorkloadType,
};
use aws_cost_advisor::billing::{decode_billing_file, DecodedBill};
use serde::Serialize;
use std::path::Path;

use super::offline_estimator;

#[derive(Debug, Serialize)]
struct DecodeReport {
    bill: DecodedBill,
    analysis: CostAnalysisResult,
}

/// Execute the decode command
///
/// Decodes the billing file, analyzes it as a mixed workload and prints both
/// as pretty JSON
pub fn execute(config_path: &Path, file: &Path, plan: &str) -> Result<()> {
    let plan: SubscriptionPlan = plan.parse()?;
    let content =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Invalid file name: {}", file.display()))?;

    let estimator = offline_estimator(config_path)?;
    let report = run(&estimator, &content, filename, plan)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run(
    estimator: &CostEstimator,
    content: &[u8],
    filename: &str,
    plan: SubscriptionPlan,
) -> Result<DecodeReport> {
    let bill = decode_billing_file(content, filename)?;
    let input = CostAnalysisInput::new(bill.total_cost, bill.service_names())
        .with_workload(WorkloadType::Other)
        .with_plan(plan);
    let analysis = estimator.estimate(&input)?;

    Ok(DecodeReport { bill, analysis })
}
