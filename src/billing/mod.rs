//! Billing file decoding.
//!
//! Turns an uploaded JSON, CSV or Excel billing export into a total and a
//! per-service cost map. Column and shape detection is heuristic; anything
//! that cannot be read unambiguously is rejected with a [`ParseError`].

pub mod delimited;
pub mod json;
pub mod spreadsheet;
pub mod tabular;

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::ParseError;

/// Supported upload formats, chosen by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BillingFormat {
    Json,
    Csv,
    Excel,
}

impl BillingFormat {
    pub fn from_filename(filename: &str) -> Result<Self, ParseError> {
        let extension = std::path::Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        match extension.as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "xlsx" => Ok(Self::Excel),
            _ => Err(ParseError::UnsupportedFormat(format!(
                "'{}' (only JSON, CSV and Excel files are supported)",
                filename
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Excel => "xlsx",
        }
    }
}

/// Which decoding path produced a bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeSource {
    TotalBased,
    BillsBased,
    CostExplorer,
    Generic,
    Csv,
    Excel,
}

/// Result of decoding a billing file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedBill {
    pub total_cost: Decimal,
    pub services: BTreeMap<String, Decimal>,
    #[serde(rename = "analysis_type")]
    pub source: DecodeSource,
}

impl DecodedBill {
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}

/// Decode a billing file, dispatching on its extension
pub fn decode_billing_file(content: &[u8], filename: &str) -> Result<DecodedBill, ParseError> {
    match BillingFormat::from_filename(filename)? {
        BillingFormat::Json => json::decode(content),
        BillingFormat::Csv => delimited::decode(content),
        BillingFormat::Excel => spreadsheet::decode(content),
    }
}

/// Parse a textual amount exactly, without a float round-trip
pub(crate) fn parse_amount(raw: &str, location: &str) -> Result<Decimal, ParseError> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map_err(|_| ParseError::InvalidAmount {
            value: raw.to_string(),
            location: location.to_string(),
        })
}

/// `total + amount`, or [`ParseError::AmountOverflow`] naming `location`
pub(crate) fn checked_sum(total: Decimal, amount: Decimal, location: &str) -> Result<Decimal, ParseError> {
    total
        .checked_add(amount)
        .ok_or_else(|| ParseError::AmountOverflow(location.to_string()))
}

/// Accumulate `amount` into `services[name]`
pub(crate) fn add_to_service(
    services: &mut BTreeMap<String, Decimal>,
    name: String,
    amount: Decimal,
    location: &str,
) -> Result<(), ParseError> {
    let entry = services.entry(name).or_insert(Decimal::ZERO);
    *entry = checked_sum(*entry, amount, location)?;
    Ok(())
}
