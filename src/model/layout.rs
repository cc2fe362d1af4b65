use crate::model::models::Party;

/**
 * One population figure in a population source row.
 */
#[derive(Debug)]
pub struct CensusReading {
    pub year: u16,
    pub column: usize,
    /**
     * False for the base enumeration, true for the later estimates.
     */
    pub estimated: bool,
}

/**
 * Column layout of the wide population source.
 */
#[derive(Debug)]
pub struct PopulationLayout {
    /**
     * Number of leading records skipped without interpretation.
     */
    pub header_rows: usize,
    pub fips_column: usize,
    pub name_column: usize,
    pub readings: &'static [CensusReading],
}

impl PopulationLayout {
    /**
     * Minimum number of columns a data row must have.
     */
    pub fn required_columns(&self) -> usize {
        self.readings.iter().map(|reading| reading.column).chain([self.fips_column, self.name_column]).max().map_or(0, |column| column + 1)
    }
}

/**
 * A block of consecutive vote columns for one election year.
 */
#[derive(Debug)]
pub struct YearBlock {
    pub year: u16,
    /**
     * Column of the first party in `parties`.
     */
    pub offset: usize,
    pub parties: &'static [Party],
}

/**
 * Column layout of the wide election source.
 */
#[derive(Debug)]
pub struct ElectionLayout {
    pub header_rows: usize,
    pub fips_column: usize,
    pub blocks: &'static [YearBlock],
}

impl ElectionLayout {
    pub fn required_columns(&self) -> usize {
        self.blocks.iter().map(|block| block.offset + block.parties.len()).chain([self.fips_column + 1]).max().unwrap_or(0)
    }

    /**
     * Number of election rows produced from one data row.
     */
    pub fn rows_per_record(&self) -> usize {
        self.blocks.iter().map(|block| block.parties.len()).sum()
    }
}

const VOTE_COLUMNS: &[Party] = &[Party::Total, Party::Dem, Party::Gop, Party::Other];

/**
 * Census Bureau annual resident population estimates, 2010 census base followed by yearly estimates.
 */
pub static POPULATION_LAYOUT: PopulationLayout = PopulationLayout {
    header_rows: 2,
    fips_column: 1,
    name_column: 2,
    readings: &[
        CensusReading { year: 2010, column: 3, estimated: false },
        CensusReading { year: 2012, column: 7, estimated: true },
        CensusReading { year: 2016, column: 11, estimated: true },
    ],
};

/**
 * County level presidential results 2008-2016.
 */
pub static ELECTION_LAYOUT: ElectionLayout = ElectionLayout {
    header_rows: 1,
    fips_column: 0,
    blocks: &[
        YearBlock { year: 2008, offset: 2, parties: VOTE_COLUMNS },
        YearBlock { year: 2012, offset: 6, parties: VOTE_COLUMNS },
        YearBlock { year: 2016, offset: 10, parties: VOTE_COLUMNS },
    ],
};
