//! Column detection and row accumulation shared by the CSV and Excel readers.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::{add_to_service, checked_sum, parse_amount, DecodeSource, DecodedBill};
use crate::error::ParseError;

const COST_MARKERS: &[&str] = &["cost", "amount"];
const SERVICE_MARKERS: &[&str] = &["service", "product"];
const UNKNOWN_SERVICE: &str = "Unknown";

/// A single table cell, normalized across readers
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(Decimal),
}

impl Cell {
    fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Number(_) => false,
        }
    }

    fn as_label(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            Cell::Number(number) => Some(number.normalize().to_string()),
        }
    }
}

/// Accumulates rows into a [`DecodedBill`].
///
/// Every column whose header contains "cost" or "amount" contributes to the
/// row cost; the first non-empty "service"/"product" column names the row.
#[derive(Debug)]
pub struct TableDecoder {
    kind: &'static str,
    source: DecodeSource,
    cost_columns: Vec<(usize, String)>,
    service_columns: Vec<usize>,
    total_cost: Decimal,
    services: BTreeMap<String, Decimal>,
}

impl TableDecoder {
    /// `kind` names the file type in error messages ("CSV", "Excel file")
    pub fn from_headers<S: AsRef<str>>(
        headers: &[S],
        kind: &'static str,
        source: DecodeSource,
    ) -> Result<Self, ParseError> {
        let mut cost_columns = Vec::new();
        let mut service_columns = Vec::new();
        for (index, header) in headers.iter().enumerate() {
            let lower = header.as_ref().trim().to_lowercase();
            if COST_MARKERS.iter().any(|m| lower.contains(m)) {
                cost_columns.push((index, header.as_ref().trim().to_string()));
            }
            if SERVICE_MARKERS.iter().any(|m| lower.contains(m)) {
                service_columns.push(index);
            }
        }

        if cost_columns.is_empty() {
            return Err(ParseError::MissingCostColumn(kind));
        }

        tracing::debug!(
            kind,
            cost_columns = cost_columns.len(),
            service_columns = service_columns.len(),
            "Detected billing table columns"
        );

        Ok(Self {
            kind,
            source,
            cost_columns,
            service_columns,
            total_cost: Decimal::ZERO,
            services: BTreeMap::new(),
        })
    }

    /// Add one data row. `row_number` is 1-based and counts the header.
    pub fn push_row(&mut self, row_number: usize, cells: &[Cell]) -> Result<(), ParseError> {
        if cells.iter().all(Cell::is_empty) {
            return Ok(());
        }

        let mut row_cost = Decimal::ZERO;
        for (index, header) in &self.cost_columns {
            let location = || format!("{} row {}, column '{}'", self.kind, row_number, header);
            let amount = match cells.get(*index).unwrap_or(&Cell::Empty) {
                Cell::Empty => continue,
                Cell::Number(number) => *number,
                Cell::Text(text) if text.trim().is_empty() => continue,
                Cell::Text(text) => parse_amount(text, &location())?,
            };
            row_cost = checked_sum(row_cost, amount, &location())?;
        }

        let service = self
            .service_columns
            .iter()
            .find_map(|index| cells.get(*index).and_then(Cell::as_label))
            .unwrap_or_else(|| UNKNOWN_SERVICE.to_string());

        let location = format!("{} row {}", self.kind, row_number);
        self.total_cost = checked_sum(self.total_cost, row_cost, &location)?;
        add_to_service(&mut self.services, service, row_cost, &location)
    }

    /// Whether column `index` feeds the cost sum or names the service
    pub fn uses_column(&self, index: usize) -> bool {
        self.cost_columns.iter().any(|(column, _)| *column == index)
            || self.service_columns.contains(&index)
    }

    pub fn finish(self) -> DecodedBill {
        DecodedBill {
            total_cost: self.total_cost,
            services: self.services,
            source: self.source,
        }
    }
}
