//! Cost analysis engine: savings estimate, ranked recommendations,
//! confidence score and service breakdown from a monthly bill.

pub mod breakdown;
pub mod catalog;
pub mod estimator;
pub mod models;
pub mod recommendations;
pub mod rules;

pub use catalog::{catalog, PlanInfo};
pub use estimator::CostEstimator;
pub use models::{
    parse_bill, Category, CostAnalysisInput, CostAnalysisResult, ImplementationEffort, Priority,
    Recommendation, SubscriptionPlan, WorkloadType,
};
pub use rules::{EstimatorConfig, ServiceWeight};
