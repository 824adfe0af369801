use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{add_to_service, checked_sum, parse_amount, DecodeSource, DecodedBill};
use crate::error::ParseError;

const UNKNOWN_SERVICE: &str = "Unknown";

/// Decode a JSON billing document.
///
/// The top-level object is classified by its keys, in this order:
/// `total`, `bills`, `resultsByTime`, then a flat map of numeric values.
pub fn decode(content: &[u8]) -> Result<DecodedBill, ParseError> {
    let text = std::str::from_utf8(content).map_err(|_| ParseError::InvalidEncoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let value: Value =
        serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let Value::Object(object) = value else {
        return Err(ParseError::InvalidStructure(
            "top-level value must be an object".to_string(),
        ));
    };

    if let Some(total) = object.get("total") {
        decode_total(total, object.get("services"))
    } else if let Some(bills) = object.get("bills") {
        decode_bills(bills)
    } else if let Some(results) = object.get("resultsByTime") {
        decode_cost_explorer(results)
    } else {
        decode_generic(&object)
    }
}

fn decode_total(total: &Value, services: Option<&Value>) -> Result<DecodedBill, ParseError> {
    let total_cost = amount_from_value(total, "total")?;

    let mut decoded = BTreeMap::new();
    match services {
        None | Some(Value::Null) => {}
        Some(Value::Object(map)) => {
            for (name, cost) in map {
                let amount = amount_from_value(cost, &format!("services.{}", name))?;
                decoded.insert(name.clone(), amount);
            }
        }
        Some(_) => {
            return Err(ParseError::InvalidStructure(
                "'services' must be an object of service costs".to_string(),
            ))
        }
    }

    Ok(DecodedBill {
        total_cost,
        services: decoded,
        source: DecodeSource::TotalBased,
    })
}

fn decode_bills(bills: &Value) -> Result<DecodedBill, ParseError> {
    let Value::Array(records) = bills else {
        return Err(ParseError::InvalidStructure(
            "'bills' must be an array".to_string(),
        ));
    };

    let mut total_cost = Decimal::ZERO;
    let mut services = BTreeMap::new();
    for (index, record) in records.iter().enumerate() {
        let location = format!("bills[{}]", index);
        let Value::Object(record) = record else {
            return Err(ParseError::InvalidStructure(format!(
                "{} must be an object",
                location
            )));
        };

        let amount = record.get("amount").ok_or_else(|| {
            ParseError::InvalidStructure(format!("{} has no 'amount'", location))
        })?;
        let location = format!("{}.amount", location);
        let amount = amount_from_value(amount, &location)?;

        total_cost = checked_sum(total_cost, amount, &location)?;
        add_to_service(&mut services, service_label(record.get("service")), amount, &location)?;
    }

    Ok(DecodedBill {
        total_cost,
        services,
        source: DecodeSource::BillsBased,
    })
}

fn decode_cost_explorer(results: &Value) -> Result<DecodedBill, ParseError> {
    let Value::Array(periods) = results else {
        return Err(ParseError::InvalidStructure(
            "'resultsByTime' must be an array".to_string(),
        ));
    };

    let mut total_cost = Decimal::ZERO;
    let mut services = BTreeMap::new();
    for (p, period) in periods.iter().enumerate() {
        let Some(groups) = period.get("groups") else {
            continue;
        };
        let Value::Array(groups) = groups else {
            return Err(ParseError::InvalidStructure(format!(
                "resultsByTime[{}].groups must be an array",
                p
            )));
        };

        for (g, group) in groups.iter().enumerate() {
            let service = service_label(
                group
                    .get("keys")
                    .and_then(Value::as_array)
                    .and_then(|keys| keys.first()),
            );

            let Some(metrics) = group.get("metrics") else {
                continue;
            };
            let Value::Object(metrics) = metrics else {
                return Err(ParseError::InvalidStructure(format!(
                    "resultsByTime[{}].groups[{}].metrics must be an object",
                    p, g
                )));
            };

            for (metric_name, metric) in metrics {
                let location = format!(
                    "resultsByTime[{}].groups[{}].metrics.{}.amount",
                    p, g, metric_name
                );
                let amount = metric
                    .get("amount")
                    .ok_or_else(|| ParseError::InvalidStructure(format!("missing {}", location)))?;
                let amount = amount_from_value(amount, &location)?;

                total_cost = checked_sum(total_cost, amount, &location)?;
                add_to_service(&mut services, service.clone(), amount, &location)?;
            }
        }
    }

    Ok(DecodedBill {
        total_cost,
        services,
        source: DecodeSource::CostExplorer,
    })
}

fn decode_generic(object: &Map<String, Value>) -> Result<DecodedBill, ParseError> {
    let mut total_cost = Decimal::ZERO;
    let mut services = BTreeMap::new();
    for (key, value) in object {
        if let Value::Number(number) = value {
            let amount = parse_amount(&number.to_string(), key)?;
            total_cost = checked_sum(total_cost, amount, key)?;
            services.insert(key.clone(), amount);
        }
    }

    if services.is_empty() {
        return Err(ParseError::InvalidStructure(
            "no recognizable cost fields (expected 'total', 'bills', 'resultsByTime' or numeric values)"
                .to_string(),
        ));
    }

    Ok(DecodedBill {
        total_cost,
        services,
        source: DecodeSource::Generic,
    })
}

/// Numbers and numeric strings are accepted, anything else is rejected
fn amount_from_value(value: &Value, location: &str) -> Result<Decimal, ParseError> {
    match value {
        Value::Number(number) => parse_amount(&number.to_string(), location),
        Value::String(text) => parse_amount(text, location),
        other => Err(ParseError::InvalidAmount {
            value: other.to_string(),
            location: location.to_string(),
        }),
    }
}

fn service_label(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(name)) if !name.trim().is_empty() => name.clone(),
        Some(Value::Number(number)) => number.to_string(),
        _ => UNKNOWN_SERVICE.to_string(),
    }
}
