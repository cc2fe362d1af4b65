use csv::StringRecord;

use crate::loader::{parse_count, require_columns};
use crate::model::apperror::ApplicationError;
use crate::model::layout::PopulationLayout;
use crate::model::models::{CensusAddInputType, CountyAddInputType};

/**
 * Relational rows derived from one population source row.
 */
#[derive(Debug, PartialEq, Eq)]
pub struct PopulationRowType {
    pub county: CountyAddInputType,
    pub census: Vec<CensusAddInputType>,
}

/**
 * Normalizes one wide population row into a county and one census row per reading of the layout.
 *
 * # Arguments
 * `layout`: Column layout of the source.
 * `record`: The data row.
 *
 * # Returns
 * The county and its census rows, or a malformed row error.
 */
pub fn parse_population_record(layout: &PopulationLayout, record: &StringRecord) -> Result<PopulationRowType, ApplicationError> {
    require_columns(record, layout.required_columns())?;
    let fips = parse_count(record, layout.fips_column)?;
    let name = record.get(layout.name_column).unwrap_or_default().to_string();
    let census = layout
        .readings
        .iter()
        .map(|reading| Ok(CensusAddInputType::new(fips, reading.year, parse_count(record, reading.column)?, reading.estimated)))
        .collect::<Result<Vec<_>, ApplicationError>>()?;
    Ok(PopulationRowType { county: CountyAddInputType::new(fips, name), census })
}
