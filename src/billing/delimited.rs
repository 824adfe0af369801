use super::tabular::{Cell, TableDecoder};
use super::{DecodeSource, DecodedBill};
use crate::error::ParseError;

/// Decode a comma-separated billing export with a header row
pub fn decode(content: &[u8]) -> Result<DecodedBill, ParseError> {
    let text = std::str::from_utf8(content).map_err(|_| ParseError::InvalidEncoding)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ::csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(::csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ParseError::Csv(e.to_string()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut decoder = TableDecoder::from_headers(&headers, "CSV", DecodeSource::Csv)?;

    for (index, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ParseError::Csv(e.to_string()))?;
        let cells: Vec<Cell> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(field.to_string())
                }
            })
            .collect();
        // +2: 1-based, header is row 1
        decoder.push_row(index + 2, &cells)?;
    }

    Ok(decoder.finish())
}
