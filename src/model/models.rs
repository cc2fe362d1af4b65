use std::fmt;
use std::str::FromStr;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Result category of an election tally. Every county and year carries exactly one row per category.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Party {
    Total,
    Dem,
    Gop,
    Other,
}

impl Party {
    /**
     * Name stored in the `party` column.
     */
    pub fn as_str(self) -> &'static str {
        match self {
            Party::Total => "total",
            Party::Dem => "dem",
            Party::Gop => "gop",
            Party::Other => "other",
        }
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Party {
    type Err = ApplicationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "total" => Ok(Party::Total),
            "dem" => Ok(Party::Dem),
            "gop" => Ok(Party::Gop),
            "other" => Ok(Party::Other),
            _ => Err(ApplicationError::new(ErrorType::DatabaseError, format!("Unknown party {value}"))),
        }
    }
}

/**
 * County to be inserted.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountyAddInputType {
    pub fips: u32,
    pub name: String,
}

impl CountyAddInputType {
    pub fn new(fips: u32, name: String) -> Self {
        CountyAddInputType { fips, name }
    }
}

impl fmt::Display for CountyAddInputType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<County(fips={}, name=\"{}\")>", self.fips, self.name)
    }
}

/**
 * Population reading to be inserted.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CensusAddInputType {
    pub fips_id: u32,
    pub year: u16,
    pub population: u32,
    /**
     * False only for the base enumeration year.
     */
    pub estimated: bool,
}

impl CensusAddInputType {
    pub fn new(fips_id: u32, year: u16, population: u32, estimated: bool) -> Self {
        CensusAddInputType { fips_id, year, population, estimated }
    }
}

/**
 * Vote tally to be inserted.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionAddInputType {
    pub fips_id: u32,
    pub year: u16,
    pub party: Party,
    pub votes: u32,
}

impl ElectionAddInputType {
    pub fn new(fips_id: u32, year: u16, party: Party, votes: u32) -> Self {
        ElectionAddInputType { fips_id, year, party, votes }
    }
}

/**
 * A stored census row.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CensusDetailType {
    pub id: i64,
    pub fips_id: u32,
    pub year: u16,
    pub population: u32,
    pub estimated: bool,
}

impl CensusDetailType {
    pub fn new(id: i64, fips_id: u32, year: u16, population: u32, estimated: bool) -> Self {
        CensusDetailType { id, fips_id, year, population, estimated }
    }
}

impl fmt::Display for CensusDetailType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Census(fips={}, year={}, population={})>", self.fips_id, self.year, self.population)
    }
}

/**
 * A stored election row.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElectionDetailType {
    pub id: i64,
    pub fips_id: u32,
    pub year: u16,
    pub party: Party,
    pub votes: u32,
}

impl ElectionDetailType {
    pub fn new(id: i64, fips_id: u32, year: u16, party: Party, votes: u32) -> Self {
        ElectionDetailType { id, fips_id, year, party, votes }
    }
}

impl fmt::Display for ElectionDetailType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<Election(fips={}, year={}, party={}, votes={})>", self.fips_id, self.year, self.party, self.votes)
    }
}

/**
 * Row counts of the three tables.
 */
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableCountsType {
    pub county: i64,
    pub census: i64,
    pub election: i64,
}

/**
 * A county and year whose `total` tally differs from the sum of the other categories.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InconsistentTotalType {
    pub fips_id: u32,
    pub year: u16,
    pub total: i64,
    pub sum: i64,
}
