use csv::StringRecord;

use crate::loader::{parse_count, require_columns};
use crate::model::apperror::ApplicationError;
use crate::model::layout::ElectionLayout;
use crate::model::models::ElectionAddInputType;

/**
 * Normalizes one wide election row into one election row per year block and party of the layout.
 *
 * # Arguments
 * `layout`: Column layout of the source.
 * `record`: The data row.
 *
 * # Returns
 * The election rows in layout order, or a malformed row error.
 */
pub fn parse_election_record(layout: &ElectionLayout, record: &StringRecord) -> Result<Vec<ElectionAddInputType>, ApplicationError> {
    require_columns(record, layout.required_columns())?;
    let fips = parse_count(record, layout.fips_column)?;
    let mut elections = Vec::with_capacity(layout.rows_per_record());
    for block in layout.blocks {
        for (position, party) in block.parties.iter().enumerate() {
            let votes = parse_count(record, block.offset + position)?;
            elections.push(ElectionAddInputType::new(fips, block.year, *party, votes));
        }
    }
    Ok(elections)
}
