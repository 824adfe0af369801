use rust_decimal::Decimal;

use super::models::{
    round_cents, Category, CostAnalysisInput, ImplementationEffort, Priority, Recommendation,
    WorkloadType,
};
use super::rules::EstimatorConfig;

const COMPUTE_KEYWORDS: &[&str] = &["ec2", "compute"];
const STORAGE_KEYWORDS: &[&str] = &["s3", "storage"];
const DATABASE_KEYWORDS: &[&str] = &["rds", "database"];

/// Build the ranked recommendation list for one analysis.
///
/// Baseline recommendations are always present, service-specific ones are
/// appended per declared service, plan-specific ones last. The list is then
/// sorted by savings (stable, so ties keep generation order) and truncated.
pub fn generate(
    config: &EstimatorConfig,
    input: &CostAnalysisInput,
    region: &str,
) -> Vec<Recommendation> {
    let bill = input.monthly_bill;
    let rates = &config.recommendation_rates;
    let mut recommendations = vec![
        build(
            "Reserved Instances",
            "Switch to 1-year Reserved Instances for steady-state workloads".to_string(),
            bill,
            rates.reserved_instances,
            Priority::High,
            ImplementationEffort::Medium,
            Category::Compute,
        ),
        build(
            "Right-size EC2 Instances",
            "Your instances are over-provisioned. Downsize to save costs".to_string(),
            bill,
            rates.rightsizing,
            Priority::High,
            ImplementationEffort::Easy,
            Category::Compute,
        ),
        build(
            "S3 Storage Optimization",
            "Move infrequently accessed data to cheaper storage classes".to_string(),
            bill,
            rates.storage_class,
            Priority::Medium,
            ImplementationEffort::Easy,
            Category::Storage,
        ),
    ];

    for service in &input.services {
        let service_lower = service.to_lowercase();

        if matches_any(&service_lower, COMPUTE_KEYWORDS)
            && input.workload_type == WorkloadType::Compute
        {
            recommendations.push(build(
                "Spot Instances",
                format!(
                    "Use Spot Instances for fault-tolerant {} workloads in {}",
                    input.workload_type, region
                ),
                bill,
                rates.spot_instances,
                Priority::High,
                ImplementationEffort::Complex,
                Category::Compute,
            ));
        }

        if matches_any(&service_lower, STORAGE_KEYWORDS) {
            recommendations.push(build(
                "S3 Lifecycle Policies",
                "Implement lifecycle policies to automatically move old data".to_string(),
                bill,
                rates.lifecycle_policies,
                Priority::Medium,
                ImplementationEffort::Easy,
                Category::Storage,
            ));
        }

        if matches_any(&service_lower, DATABASE_KEYWORDS) {
            recommendations.push(build(
                "RDS Reserved Instances",
                "Purchase Reserved Instances for your database workloads".to_string(),
                bill,
                rates.database_reserved_instances,
                Priority::High,
                ImplementationEffort::Medium,
                Category::Database,
            ));
        }
    }

    if input.subscription_plan.is_advanced() {
        recommendations.push(build(
            "Auto Scaling Groups",
            format!("Implement auto scaling in {} to match demand", region),
            bill,
            rates.auto_scaling,
            Priority::Medium,
            ImplementationEffort::Complex,
            Category::Compute,
        ));
    }

    recommendations.sort_by(|a, b| b.potential_savings.cmp(&a.potential_savings));
    recommendations.truncate(config.max_recommendations);
    recommendations
}

fn matches_any(service_lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| service_lower.contains(k))
}

fn build(
    title: &str,
    description: String,
    bill: Decimal,
    rate: Decimal,
    priority: Priority,
    implementation_effort: ImplementationEffort,
    category: Category,
) -> Recommendation {
    Recommendation {
        title: title.to_string(),
        description,
        potential_savings: round_cents(bill * rate),
        priority,
        implementation_effort,
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::models::SubscriptionPlan;
    use rust_decimal_macros::dec;

    fn titles(recs: &[Recommendation]) -> Vec<&str> {
        recs.iter().map(|r| r.title.as_str()).collect()
    }

    #[test]
    fn test_baseline_only_for_unknown_services() {
        let input = CostAnalysisInput::new(dec!(1000), vec!["Route53".to_string()]);
        let recs = generate(&EstimatorConfig::default(), &input, "us-east-1");
        assert_eq!(
            titles(&recs),
            vec!["Reserved Instances", "Right-size EC2 Instances", "S3 Storage Optimization"]
        );
        assert_eq!(recs[0].potential_savings, dec!(150));
        assert_eq!(recs[1].potential_savings, dec!(120));
        assert_eq!(recs[2].potential_savings, dec!(80));
    }

    #[test]
    fn test_spot_requires_compute_workload() {
        let input = CostAnalysisInput::new(dec!(1000), vec!["EC2".to_string()]);
        let recs = generate(&EstimatorConfig::default(), &input, "us-east-1");
        assert!(!titles(&recs).contains(&"Spot Instances"));

        let input = input.with_workload(WorkloadType::Compute);
        let recs = generate(&EstimatorConfig::default(), &input, "eu-west-1");
        let spot = recs.iter().find(|r| r.title == "Spot Instances").unwrap();
        assert_eq!(spot.potential_savings, dec!(200));
        assert!(spot.description.contains("eu-west-1"));
        assert_eq!(recs[0].title, "Spot Instances");
    }

    #[test]
    fn test_keyword_matching_is_substring_and_case_insensitive() {
        let input = CostAnalysisInput::new(
            dec!(1000),
            vec!["Amazon Simple Storage".to_string(), "Aurora Database".to_string()],
        );
        let recs = generate(&EstimatorConfig::default(), &input, "us-east-1");
        let names = titles(&recs);
        assert!(names.contains(&"S3 Lifecycle Policies"));
        assert!(names.contains(&"RDS Reserved Instances"));
    }

    #[test]
    fn test_auto_scaling_only_for_advanced_plans() {
        let base = CostAnalysisInput::new(dec!(1000), vec![]);
        for (plan, expected) in [
            (SubscriptionPlan::Starter, false),
            (SubscriptionPlan::Professional, true),
            (SubscriptionPlan::Enterprise, true),
        ] {
            let recs = generate(
                &EstimatorConfig::default(),
                &base.clone().with_plan(plan),
                "us-east-1",
            );
            assert_eq!(titles(&recs).contains(&"Auto Scaling Groups"), expected);
        }
    }

    #[test]
    fn test_truncates_to_configured_cap() {
        let services: Vec<String> = (0..8).map(|i| format!("s3 bucket {}", i)).collect();
        let input = CostAnalysisInput::new(dec!(1000), services).with_plan(SubscriptionPlan::Enterprise);

        let recs = generate(&EstimatorConfig::default(), &input, "us-east-1");
        assert_eq!(recs.len(), 10);

        let config = EstimatorConfig {
            max_recommendations: 2,
            ..Default::default()
        };
        let recs = generate(&config, &input, "us-east-1");
        assert_eq!(titles(&recs), vec!["Reserved Instances", "Right-size EC2 Instances"]);
    }

    #[test]
    fn test_sorted_descending() {
        let input = CostAnalysisInput::new(
            dec!(777.77),
            vec!["EC2".to_string(), "S3".to_string(), "RDS".to_string()],
        )
        .with_workload(WorkloadType::Compute)
        .with_plan(SubscriptionPlan::Professional);
        let recs = generate(&EstimatorConfig::default(), &input, "us-east-1");
        assert!(recs
            .windows(2)
            .all(|pair| pair[0].potential_savings >= pair[1].potential_savings));
    }
}
