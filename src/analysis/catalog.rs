use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::models::SubscriptionPlan;

/// Public description of a subscription plan
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanInfo {
    pub id: SubscriptionPlan,
    pub name: &'static str,
    pub price: Decimal,
    pub currency: &'static str,
    pub interval: &'static str,
    pub features: Vec<&'static str>,
}

impl SubscriptionPlan {
    pub const ALL: [SubscriptionPlan; 3] = [
        SubscriptionPlan::Starter,
        SubscriptionPlan::Professional,
        SubscriptionPlan::Enterprise,
    ];

    pub fn info(&self) -> PlanInfo {
        let (name, price, features) = match self {
            SubscriptionPlan::Starter => (
                "Starter",
                dec!(29),
                vec![
                    "Monthly cost analysis",
                    "Basic recommendations",
                    "Email support",
                    "Up to 5 AWS accounts",
                ],
            ),
            SubscriptionPlan::Professional => (
                "Professional",
                dec!(99),
                vec![
                    "Real-time monitoring",
                    "Advanced optimization",
                    "Custom alerts",
                    "Priority support",
                    "Up to 20 AWS accounts",
                ],
            ),
            SubscriptionPlan::Enterprise => (
                "Enterprise",
                dec!(299),
                vec![
                    "Unlimited AWS accounts",
                    "Custom integrations",
                    "Dedicated support",
                    "Advanced reporting",
                    "API access",
                ],
            ),
        };

        PlanInfo {
            id: *self,
            name,
            price,
            currency: "usd",
            interval: "month",
            features,
        }
    }
}

/// All plans, cheapest first
pub fn catalog() -> Vec<PlanInfo> {
    SubscriptionPlan::ALL.iter().map(SubscriptionPlan::info).collect()
}
