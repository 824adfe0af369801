use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::io::Cursor;

use super::tabular::{Cell, TableDecoder};
use super::{DecodeSource, DecodedBill};
use crate::error::ParseError;

/// Decode the first worksheet of an .xlsx workbook. Row 1 is the header.
///
/// Only the cost and service columns are converted strictly; anything else
/// (notes, formulas that evaluated to `#N/A`) is carried as plain text.
pub fn decode(content: &[u8]) -> Result<DecodedBill, ParseError> {
    let mut workbook: Xlsx<Cursor<&[u8]>> = open_workbook_from_rs(Cursor::new(content))
        .map_err(|e: calamine::XlsxError| ParseError::Excel(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ParseError::Excel("workbook has no worksheets".to_string()))?
        .map_err(|e| ParseError::Excel(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header_row) = rows.next() else {
        return Err(ParseError::MissingCostColumn("Excel file"));
    };
    let headers: Vec<String> = header_row.iter().map(|cell| cell.to_string()).collect();

    let mut decoder = TableDecoder::from_headers(&headers, "Excel file", DecodeSource::Excel)?;

    // Sheet rows start at the header, which may not be spreadsheet row 1
    let first_row = range.start().map(|(row, _)| row as usize + 1).unwrap_or(1);
    for (index, row) in rows.enumerate() {
        let row_number = first_row + index + 1;
        let cells = row
            .iter()
            .enumerate()
            .map(|(column, data)| {
                if decoder.uses_column(column) {
                    to_cell(data, row_number)
                } else {
                    Ok(passthrough(data))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        decoder.push_row(row_number, &cells)?;
    }

    Ok(decoder.finish())
}

fn to_cell(data: &Data, row_number: usize) -> Result<Cell, ParseError> {
    Ok(match data {
        Data::Empty => Cell::Empty,
        Data::String(text) => Cell::Text(text.clone()),
        Data::Int(value) => Cell::Number(Decimal::from(*value)),
        Data::Float(value) => Cell::Number(Decimal::from_f64(*value).ok_or_else(|| {
            ParseError::Excel(format!("numeric cell out of range at row {}: {}", row_number, value))
        })?),
        Data::Bool(value) => Cell::Text(value.to_string()),
        Data::Error(err) => {
            return Err(ParseError::Excel(format!(
                "cell error at row {}: {}",
                row_number, err
            )))
        }
        other => Cell::Text(other.to_string()),
    })
}

fn passthrough(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}
