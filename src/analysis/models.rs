use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Coarse classification of a cloud usage pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadType {
    #[default]
    Web,
    Data,
    Ml,
    Storage,
    Compute,
    /// Anything unrecognized, including mixed workloads from uploaded files
    #[serde(other)]
    Other,
}

impl WorkloadType {
    /// Parse leniently: unknown names fall back to `Other`, blank to the default
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "" | "web" => Self::Web,
            "data" => Self::Data,
            "ml" => Self::Ml,
            "storage" => Self::Storage,
            "compute" => Self::Compute,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Web => "web",
            Self::Data => "data",
            Self::Ml => "ml",
            Self::Storage => "storage",
            Self::Compute => "compute",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for WorkloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionPlan {
    #[default]
    Starter,
    Professional,
    Enterprise,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Starter => "starter",
            Self::Professional => "professional",
            Self::Enterprise => "enterprise",
        }
    }

    /// Plans that unlock the advanced recommendation set
    pub fn is_advanced(&self) -> bool {
        matches!(self, Self::Professional | Self::Enterprise)
    }
}

impl FromStr for SubscriptionPlan {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" => Err(ValidationError::Blank {
                field: "subscription_plan",
            }),
            "starter" => Ok(Self::Starter),
            "professional" => Ok(Self::Professional),
            "enterprise" => Ok(Self::Enterprise),
            _ => Err(ValidationError::UnknownPlan(s.to_string())),
        }
    }
}

impl fmt::Display for SubscriptionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImplementationEffort {
    Easy,
    Medium,
    Complex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Compute,
    Storage,
    Network,
    Database,
}

/// A single optimization suggestion with its estimated monthly savings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    pub potential_savings: Decimal,
    pub priority: Priority,
    pub implementation_effort: ImplementationEffort,
    pub category: Category,
}

/// Input to a single analysis
#[derive(Debug, Clone, PartialEq)]
pub struct CostAnalysisInput {
    pub monthly_bill: Decimal,
    pub services: Vec<String>,
    /// `None` uses the estimator's default region
    pub region: Option<String>,
    pub workload_type: WorkloadType,
    pub subscription_plan: SubscriptionPlan,
}

impl CostAnalysisInput {
    pub fn new(monthly_bill: Decimal, services: Vec<String>) -> Self {
        Self {
            monthly_bill,
            services,
            region: None,
            workload_type: WorkloadType::default(),
            subscription_plan: SubscriptionPlan::default(),
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_workload(mut self, workload_type: WorkloadType) -> Self {
        self.workload_type = workload_type;
        self
    }

    pub fn with_plan(mut self, subscription_plan: SubscriptionPlan) -> Self {
        self.subscription_plan = subscription_plan;
        self
    }
}

/// Outcome of an analysis. Every field is always present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostAnalysisResult {
    pub current_bill: Decimal,
    pub potential_savings: Decimal,
    pub optimized_bill: Decimal,
    pub wasted_spend: Decimal,
    pub recommendations: Vec<Recommendation>,
    pub service_breakdown: BTreeMap<String, Decimal>,
    pub confidence_score: Decimal,
    pub analysis_date: DateTime<Utc>,
    pub region: String,
    pub workload_type: WorkloadType,
}

/// Round a currency amount to cents, half away from zero
pub(crate) fn round_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a currency amount down to cents, so shares never exceed their total
pub(crate) fn floor_cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

/// Parse a caller-supplied bill amount. Sign is not checked here; the
/// estimator rejects non-positive bills.
pub fn parse_bill(raw: &str) -> Result<Decimal, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Blank {
            field: "monthly_bill",
        });
    }
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ValidationError::InvalidAmount {
            field: "monthly_bill",
            value: raw.to_string(),
        })
}

/// Normalized lookup key for a free-text service name: the first
/// whitespace-delimited token, uppercased
pub fn service_key(name: &str) -> Option<String> {
    name.split_whitespace().next().map(str::to_uppercase)
}
