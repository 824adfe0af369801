//! Heuristic rule tables driving the estimator.
//!
//! Everything here is plain data. The estimator receives one immutable
//! [`EstimatorConfig`] at construction; the `[estimator]` section of the
//! config file may override any field, and omitted fields keep the defaults
//! below.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::models::{SubscriptionPlan, WorkloadType};

/// A service name paired with a numeric weight (multiplier or bill fraction)
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServiceWeight {
    pub service: String,
    pub weight: Decimal,
}

impl ServiceWeight {
    fn new(service: &str, weight: Decimal) -> Self {
        Self {
            service: service.to_string(),
            weight,
        }
    }
}

/// One value per workload type
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkloadTable {
    pub web: Decimal,
    pub data: Decimal,
    pub ml: Decimal,
    pub storage: Decimal,
    pub compute: Decimal,
    pub other: Decimal,
}

impl WorkloadTable {
    pub fn get(&self, workload: WorkloadType) -> Decimal {
        match workload {
            WorkloadType::Web => self.web,
            WorkloadType::Data => self.data,
            WorkloadType::Ml => self.ml,
            WorkloadType::Storage => self.storage,
            WorkloadType::Compute => self.compute,
            WorkloadType::Other => self.other,
        }
    }

    fn values(&self) -> [Decimal; 6] {
        [self.web, self.data, self.ml, self.storage, self.compute, self.other]
    }
}

/// One value per subscription plan
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlanTable {
    pub starter: Decimal,
    pub professional: Decimal,
    pub enterprise: Decimal,
}

impl PlanTable {
    pub fn get(&self, plan: SubscriptionPlan) -> Decimal {
        match plan {
            SubscriptionPlan::Starter => self.starter,
            SubscriptionPlan::Professional => self.professional,
            SubscriptionPlan::Enterprise => self.enterprise,
        }
    }
}

/// Fraction of the monthly bill each recommendation is worth
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecommendationRates {
    pub reserved_instances: Decimal,
    pub rightsizing: Decimal,
    pub storage_class: Decimal,
    pub spot_instances: Decimal,
    pub lifecycle_policies: Decimal,
    pub database_reserved_instances: Decimal,
    pub auto_scaling: Decimal,
}

impl Default for RecommendationRates {
    fn default() -> Self {
        Self {
            reserved_instances: dec!(0.15),
            rightsizing: dec!(0.12),
            storage_class: dec!(0.08),
            spot_instances: dec!(0.20),
            lifecycle_policies: dec!(0.10),
            database_reserved_instances: dec!(0.18),
            auto_scaling: dec!(0.10),
        }
    }
}

/// Immutable configuration for [`super::CostEstimator`]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Savings rate before any multiplier is applied
    pub base_savings_rate: Decimal,
    /// Upper bound on the compound service x workload multiplier
    pub multiplier_cap: Decimal,
    /// Ranked recommendations kept per analysis
    pub max_recommendations: usize,
    /// Region used when the caller omits one
    pub default_region: String,
    /// Industry-average share of a bill considered wasted
    pub wasted_spend_rate: Decimal,

    pub confidence_base: Decimal,
    pub confidence_ceiling: Decimal,
    /// Confidence added per declared service
    pub confidence_per_service: Decimal,
    /// Cap on the per-service confidence bonus
    pub confidence_service_cap: Decimal,
    pub workload_confidence_bonus: WorkloadTable,
    pub plan_confidence_bonus: PlanTable,

    pub service_multipliers: Vec<ServiceWeight>,
    pub workload_multipliers: WorkloadTable,
    pub recommendation_rates: RecommendationRates,

    /// Share of the bill attributed to each known service
    pub service_distribution: Vec<ServiceWeight>,
    /// Split used when no services were declared
    pub default_distribution: Vec<ServiceWeight>,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            base_savings_rate: dec!(0.25),
            multiplier_cap: dec!(1.5),
            max_recommendations: 10,
            default_region: "us-east-1".to_string(),
            wasted_spend_rate: dec!(0.22),

            confidence_base: dec!(0.7),
            confidence_ceiling: dec!(0.95),
            confidence_per_service: dec!(0.05),
            confidence_service_cap: dec!(0.2),
            workload_confidence_bonus: WorkloadTable {
                web: dec!(0.10),
                data: dec!(0.15),
                ml: dec!(0.05),
                storage: dec!(0.10),
                compute: dec!(0.15),
                other: dec!(0.05),
            },
            plan_confidence_bonus: PlanTable {
                starter: dec!(0),
                professional: dec!(0.10),
                enterprise: dec!(0.15),
            },

            service_multipliers: vec![
                ServiceWeight::new("EC2", dec!(1.2)),
                ServiceWeight::new("S3", dec!(1.1)),
                ServiceWeight::new("RDS", dec!(1.3)),
                ServiceWeight::new("Lambda", dec!(0.8)),
                ServiceWeight::new("CloudFront", dec!(1.0)),
            ],
            workload_multipliers: WorkloadTable {
                web: dec!(1.0),
                data: dec!(1.2),
                ml: dec!(1.1),
                storage: dec!(1.3),
                compute: dec!(1.4),
                other: dec!(1.0),
            },
            recommendation_rates: RecommendationRates::default(),

            service_distribution: vec![
                ServiceWeight::new("EC2", dec!(0.40)),
                ServiceWeight::new("S3", dec!(0.20)),
                ServiceWeight::new("RDS", dec!(0.15)),
                ServiceWeight::new("Lambda", dec!(0.10)),
                ServiceWeight::new("CloudFront", dec!(0.10)),
                ServiceWeight::new("DynamoDB", dec!(0.08)),
                ServiceWeight::new("EBS", dec!(0.12)),
                ServiceWeight::new("ELB", dec!(0.05)),
                ServiceWeight::new("Route53", dec!(0.02)),
                ServiceWeight::new("CloudWatch", dec!(0.03)),
            ],
            default_distribution: vec![
                ServiceWeight::new("EC2", dec!(0.40)),
                ServiceWeight::new("S3", dec!(0.20)),
                ServiceWeight::new("RDS", dec!(0.15)),
                ServiceWeight::new("Lambda", dec!(0.10)),
                ServiceWeight::new("CloudFront", dec!(0.10)),
                ServiceWeight::new("Other", dec!(0.05)),
            ],
        }
    }
}

impl EstimatorConfig {
    /// Check that the tables cannot produce a savings figure above the bill
    /// or a confidence outside (0, 1]
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_savings_rate <= Decimal::ZERO || self.base_savings_rate >= Decimal::ONE {
            anyhow::bail!("estimator.base_savings_rate must be between 0 and 1 (exclusive)");
        }
        if self.multiplier_cap <= Decimal::ZERO {
            anyhow::bail!("estimator.multiplier_cap must be positive");
        }
        if self.base_savings_rate * self.multiplier_cap >= Decimal::ONE {
            anyhow::bail!(
                "estimator.base_savings_rate * estimator.multiplier_cap must stay below 1 (got {})",
                self.base_savings_rate * self.multiplier_cap
            );
        }
        if self.max_recommendations == 0 {
            anyhow::bail!("estimator.max_recommendations must be at least 1");
        }
        if self.default_region.trim().is_empty() {
            anyhow::bail!("estimator.default_region cannot be empty");
        }
        if self.confidence_ceiling <= Decimal::ZERO || self.confidence_ceiling > Decimal::ONE {
            anyhow::bail!("estimator.confidence_ceiling must be in (0, 1]");
        }
        if self.confidence_base <= Decimal::ZERO || self.confidence_base > self.confidence_ceiling {
            anyhow::bail!("estimator.confidence_base must be positive and not above the ceiling");
        }
        if self.wasted_spend_rate < Decimal::ZERO || self.wasted_spend_rate > Decimal::ONE {
            anyhow::bail!("estimator.wasted_spend_rate must be in [0, 1]");
        }

        let rates = &self.recommendation_rates;
        for (name, rate) in [
            ("reserved_instances", rates.reserved_instances),
            ("rightsizing", rates.rightsizing),
            ("storage_class", rates.storage_class),
            ("spot_instances", rates.spot_instances),
            ("lifecycle_policies", rates.lifecycle_policies),
            ("database_reserved_instances", rates.database_reserved_instances),
            ("auto_scaling", rates.auto_scaling),
        ] {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                anyhow::bail!("estimator.recommendation_rates.{} must be in [0, 1]", name);
            }
        }

        for value in self
            .workload_multipliers
            .values()
            .into_iter()
            .chain(self.workload_confidence_bonus.values())
        {
            if value < Decimal::ZERO {
                anyhow::bail!("estimator workload tables cannot contain negative values");
            }
        }

        validate_weights(&self.service_multipliers, "service_multipliers")?;
        validate_weights(&self.service_distribution, "service_distribution")?;
        validate_weights(&self.default_distribution, "default_distribution")?;

        let default_total: Decimal = self.default_distribution.iter().map(|w| w.weight).sum();
        if default_total > Decimal::ONE {
            anyhow::bail!(
                "estimator.default_distribution fractions sum to {}, which exceeds 1",
                default_total
            );
        }

        Ok(())
    }
}

fn validate_weights(weights: &[ServiceWeight], table: &str) -> anyhow::Result<()> {
    let mut seen = std::collections::HashSet::new();
    for entry in weights {
        if entry.service.trim().is_empty() {
            anyhow::bail!("estimator.{} contains an entry with an empty service name", table);
        }
        if entry.weight < Decimal::ZERO {
            anyhow::bail!(
                "estimator.{}: weight for '{}' cannot be negative",
                table,
                entry.service
            );
        }
        if !seen.insert(entry.service.to_uppercase()) {
            anyhow::bail!("estimator.{}: '{}' is duplicated", table, entry.service);
        }
    }
    Ok(())
}
