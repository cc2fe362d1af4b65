pub mod election;
pub mod population;

use std::io::Read;

use csv::{ReaderBuilder, StringRecord};

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Iterates the data records of a comma separated source, skipping the leading header records.
 *
 * Rows are allowed to differ in length, short rows are reported by the row parsers.
 *
 * # Arguments
 * `source`: The source to read.
 * `header_rows`: Number of leading records to skip without interpretation.
 */
pub fn data_records<R: Read>(source: R, header_rows: usize) -> impl Iterator<Item = Result<StringRecord, ApplicationError>> {
    ReaderBuilder::new().has_headers(false).flexible(true).from_reader(source).into_records().skip(header_rows).map(|record| record.map_err(ApplicationError::from))
}

/**
 * Line of the record in its source, 0 when unknown.
 */
pub fn record_line(record: &StringRecord) -> u64 {
    record.position().map_or(0, csv::Position::line)
}

/**
 * Fails with a malformed row error unless the record holds at least `required` columns.
 */
pub fn require_columns(record: &StringRecord, required: usize) -> Result<(), ApplicationError> {
    if record.len() < required {
        return Err(ApplicationError::new(ErrorType::MalformedRow, format!("Line {}: expected at least {required} columns, found {}", record_line(record), record.len())));
    }
    Ok(())
}

/**
 * Parses a non-negative integer column.
 *
 * # Arguments
 * `record`: The record to read from.
 * `column`: 0-based column index.
 *
 * # Returns
 * The parsed value or a malformed row error naming line and column.
 */
pub fn parse_count(record: &StringRecord, column: usize) -> Result<u32, ApplicationError> {
    let Some(value) = record.get(column) else {
        return Err(ApplicationError::new(ErrorType::MalformedRow, format!("Line {}: missing column {column}", record_line(record))));
    };
    value
        .trim()
        .parse::<u32>()
        .map_err(|err| ApplicationError::new(ErrorType::MalformedRow, format!("Line {}: column {column} value {value:?} is not a count: {err}", record_line(record))))
}
