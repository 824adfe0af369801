use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::debug;

use super::breakdown;
use super::models::{
    round_cents, service_key, CostAnalysisInput, CostAnalysisResult, SubscriptionPlan,
    WorkloadType,
};
use super::recommendations;
use super::rules::{EstimatorConfig, ServiceWeight};
use crate::error::ValidationError;

/// Deterministic cost-savings estimator.
///
/// Holds only immutable rule tables, so one instance can be shared across
/// threads and called concurrently.
#[derive(Debug, Clone)]
pub struct CostEstimator {
    config: EstimatorConfig,
    service_multipliers: HashMap<String, Decimal>,
    service_distribution: HashMap<String, Decimal>,
}

impl CostEstimator {
    /// Create an estimator from its rule tables
    pub fn new(config: EstimatorConfig) -> Self {
        let service_multipliers = index_by_key(&config.service_multipliers);
        let service_distribution = index_by_key(&config.service_distribution);

        Self {
            config,
            service_multipliers,
            service_distribution,
        }
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Run an analysis stamped with the current time
    pub fn estimate(&self, input: &CostAnalysisInput) -> Result<CostAnalysisResult, ValidationError> {
        self.estimate_at(input, Utc::now())
    }

    /// Run an analysis with an explicit `analysis_date`
    pub fn estimate_at(
        &self,
        input: &CostAnalysisInput,
        analysis_date: DateTime<Utc>,
    ) -> Result<CostAnalysisResult, ValidationError> {
        let bill = input.monthly_bill;
        if bill <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveBill);
        }

        let region = match input.region.as_deref().map(str::trim) {
            Some(region) if !region.is_empty() => region.to_string(),
            _ => self.config.default_region.clone(),
        };

        let rate = self.savings_rate(&input.services, input.workload_type);
        let potential_savings = round_cents(bill * rate);
        let optimized_bill = bill - potential_savings;

        let recommendations = recommendations::generate(&self.config, input, &region);
        let confidence_score = self.confidence_score(
            input.services.len(),
            input.workload_type,
            input.subscription_plan,
        );
        let service_breakdown = breakdown::apportion(
            bill,
            &input.services,
            &self.service_distribution,
            &self.config.default_distribution,
        );

        debug!(
            bill = %bill,
            rate = %rate,
            potential_savings = %potential_savings,
            recommendations = recommendations.len(),
            confidence = %confidence_score,
            "Cost analysis computed"
        );

        Ok(CostAnalysisResult {
            current_bill: bill,
            potential_savings,
            optimized_bill,
            wasted_spend: round_cents(bill * self.config.wasted_spend_rate),
            recommendations,
            service_breakdown,
            confidence_score,
            analysis_date,
            region,
            workload_type: input.workload_type,
        })
    }

    /// Effective savings rate: base rate times the capped compound multiplier
    pub fn savings_rate(&self, services: &[String], workload: WorkloadType) -> Decimal {
        let mut multiplier = Decimal::ONE;
        for service in services {
            if let Some(factor) = service_key(service).and_then(|key| self.service_multipliers.get(&key)) {
                // Saturate instead of panicking on absurdly long service lists
                multiplier = multiplier.checked_mul(*factor).unwrap_or(Decimal::MAX);
            }
        }

        multiplier = multiplier
            .checked_mul(self.config.workload_multipliers.get(workload))
            .unwrap_or(Decimal::MAX);

        self.config.base_savings_rate * multiplier.min(self.config.multiplier_cap)
    }

    /// Heuristic confidence in the estimate, capped at the configured ceiling
    pub fn confidence_score(
        &self,
        service_count: usize,
        workload: WorkloadType,
        plan: SubscriptionPlan,
    ) -> Decimal {
        let cfg = &self.config;
        let service_bonus = Decimal::from(service_count.min(1_000))
            .checked_mul(cfg.confidence_per_service)
            .unwrap_or(cfg.confidence_service_cap)
            .min(cfg.confidence_service_cap);

        let score = cfg.confidence_base
            + service_bonus
            + cfg.workload_confidence_bonus.get(workload)
            + cfg.plan_confidence_bonus.get(plan);

        score.min(cfg.confidence_ceiling)
    }
}

impl Default for CostEstimator {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

fn index_by_key(weights: &[ServiceWeight]) -> HashMap<String, Decimal> {
    weights
        .iter()
        .filter_map(|w| service_key(&w.service).map(|key| (key, w.weight)))
        .collect()
}
