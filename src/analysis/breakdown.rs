use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

use super::models::{floor_cents, service_key};
use super::rules::ServiceWeight;

/// Bucket receiving whatever the distribution table does not claim
pub const OTHER_SERVICES: &str = "Other Services";

/// Apportion the bill across services.
///
/// With no declared services the fixed default split is returned. Otherwise
/// each declared service found in `distribution` (keyed by [`service_key`])
/// gets its fraction of the bill and the positive remainder lands in
/// [`OTHER_SERVICES`]. When the matched fractions add up to more than the
/// whole bill they are rescaled to sum to exactly 1 and no remainder bucket is
/// emitted, so the breakdown never exceeds the bill and never goes negative.
pub fn apportion(
    bill: Decimal,
    services: &[String],
    distribution: &HashMap<String, Decimal>,
    defaults: &[ServiceWeight],
) -> BTreeMap<String, Decimal> {
    if services.is_empty() {
        return defaults
            .iter()
            .map(|w| (w.service.clone(), floor_cents(bill * w.weight)))
            .collect();
    }

    let mut shares: Vec<(&str, Decimal)> = Vec::new();
    for service in services {
        if shares.iter().any(|(name, _)| *name == service.as_str()) {
            continue;
        }
        if let Some(fraction) = service_key(service).and_then(|key| distribution.get(&key)) {
            shares.push((service.as_str(), *fraction));
        }
    }

    let claimed: Decimal = shares.iter().map(|(_, fraction)| *fraction).sum();
    let scale = if claimed > Decimal::ONE {
        tracing::debug!(
            claimed = %claimed,
            "Service distribution over-allocates the bill, rescaling shares"
        );
        claimed
    } else {
        Decimal::ONE
    };

    let mut breakdown = BTreeMap::new();
    let mut assigned = Decimal::ZERO;
    for (name, fraction) in shares {
        let cost = floor_cents(bill * fraction / scale);
        assigned += cost;
        breakdown.insert(name.to_string(), cost);
    }

    let remainder = bill - assigned;
    if claimed < Decimal::ONE && remainder > Decimal::ZERO {
        breakdown.insert(OTHER_SERVICES.to_string(), remainder);
    }

    breakdown
}
