use anyhow::Result;
use aws_cost_advisor::analysis::{
    parse_bill, CostAnalysisInput, CostAnalysisResult, CostEstimator, SubscriptionPlan,
    WorkloadType,
};
use std::path::Path;

use super::offline_estimator;

/// Arguments of the analyze command, as typed on the command line
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    pub bill: String,
    pub services: Vec<String>,
    pub region: Option<String>,
    pub workload: String,
    pub plan: String,
}

/// Execute the analyze command
///
/// Prints the full analysis as pretty JSON on stdout
pub fn execute(config_path: &Path, args: AnalyzeArgs) -> Result<()> {
    let estimator = offline_estimator(config_path)?;
    let result = run(&estimator, args)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run(estimator: &CostEstimator, args: AnalyzeArgs) -> Result<CostAnalysisResult> {
    let bill = parse_bill(&args.bill)?;
    let plan: SubscriptionPlan = args.plan.parse()?;
    let services = args
        .services
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let mut input = CostAnalysisInput::new(bill, services)
        .with_workload(WorkloadType::from_name(&args.workload))
        .with_plan(plan);
    if let Some(region) = args.region {
        input = input.with_region(region);
    }

    Ok(estimator.estimate(&input)?)
}
