use std::str::FromStr;

use futures_util::{Stream, StreamExt};
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{Instrument, instrument};

use crate::dao::handle_database_error;
use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{CensusAddInputType, CensusDetailType, CountyAddInputType, ElectionAddInputType, ElectionDetailType, InconsistentTotalType, Party, TableCountsType},
};

/**
 * Database response type for the census and election join.
 */
pub type QueryCensusElectionDbResp = (i64, u32, u16, u32, bool, i64, u32, u16, String, u32);

/**
 * Database response type for the table counts.
 */
pub type QueryTableCountsDbResp = (i64, i64, i64);

/**
 * Database response type for county years whose totals do not add up.
 */
pub type QueryInconsistentTotalsDbResp = (u32, u16, i64, i64);

/**
 * SQL query to add a county.
 */
const ADD_COUNTY: &str = "INSERT INTO county (fips, name) VALUES ($1, $2)";

/**
 * SQL query to add a census reading.
 */
const ADD_CENSUS: &str = "INSERT INTO census (fips_id, year, population, estimated) VALUES ($1, $2, $3, $4)";

/**
 * SQL query to add an election tally.
 */
const ADD_ELECTION: &str = "INSERT INTO election (fips_id, year, party, votes) VALUES ($1, $2, $3, $4)";

/**
 * SQL query pairing every census row with the election rows of the same county and year.
 */
const QUERY_CENSUS_ELECTION: &str = "SELECT c.id, c.fips_id, c.year, c.population, c.estimated, e.id, e.fips_id, e.year, e.party, e.votes
                                     FROM census c, election e
                                     WHERE c.fips_id = e.fips_id AND c.year = e.year";

/**
 * SQL query counting the rows of the three tables.
 */
const QUERY_TABLE_COUNTS: &str = "SELECT (SELECT COUNT(*) FROM county), (SELECT COUNT(*) FROM census), (SELECT COUNT(*) FROM election)";

/**
 * SQL query to find county years where the total differs from the sum of the party tallies.
 */
const QUERY_INCONSISTENT_TOTALS: &str = "SELECT fips_id, year,
                                                SUM(CASE WHEN party = 'total' THEN votes ELSE 0 END) AS total,
                                                SUM(CASE WHEN party <> 'total' THEN votes ELSE 0 END) AS parties
                                         FROM election
                                         GROUP BY fips_id, year
                                         HAVING total <> parties
                                         ORDER BY fips_id, year";

/**
 * DAO for county, census and election rows.
 */
pub struct ElectionsDao {}

impl ElectionsDao {
    /**
     * Creates a new instance of `ElectionsDao`.
     *
     * # Returns
     * A new instance of `ElectionsDao`.
     */
    pub fn new() -> Self {
        ElectionsDao {}
    }

    /**
     * Adds a county.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `county_add_input`: The county to add.
     *
     * # Returns
     * A result indicating success or failure of the operation.
     */
    #[instrument(level = "trace", skip(self, transaction))]
    pub async fn add_county(&self, transaction: &mut SqliteConnection, county_add_input: &CountyAddInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_COUNTY)
            .bind(county_add_input.fips)
            .bind(county_add_input.name.as_str())
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err, "add county"))?;
        Ok(())
    }

    /**
     * Adds a census reading.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `census_add_input`: The census reading to add.
     */
    #[instrument(level = "trace", skip(self, transaction))]
    pub async fn add_census(&self, transaction: &mut SqliteConnection, census_add_input: &CensusAddInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_CENSUS)
            .bind(census_add_input.fips_id)
            .bind(census_add_input.year)
            .bind(census_add_input.population)
            .bind(census_add_input.estimated)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err, "add census"))?;
        Ok(())
    }

    /**
     * Adds an election tally.
     *
     * The county is not checked here. A missing county is reported by the database when the transaction commits.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the query within.
     * `election_add_input`: The tally to add.
     */
    #[instrument(level = "trace", skip(self, transaction))]
    pub async fn add_election(&self, transaction: &mut SqliteConnection, election_add_input: &ElectionAddInputType) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        sqlx::query(ADD_ELECTION)
            .bind(election_add_input.fips_id)
            .bind(election_add_input.year)
            .bind(election_add_input.party.as_str())
            .bind(election_add_input.votes)
            .execute(transaction)
            .instrument(span)
            .await
            .map_err(|err| handle_database_error(&err, "add election"))?;
        Ok(())
    }

    /**
     * Streams the census rows joined with the election rows of the same county and year.
     *
     * Nothing is read before the stream is polled, and every call runs the query again.
     *
     * # Arguments
     * `connection_pool`: The database connection pool.
     *
     * # Returns
     * A stream of census and election pairs in database order.
     */
    pub fn get_census_election_pairs<'e>(&self, connection_pool: &'e Pool<Sqlite>) -> impl Stream<Item = Result<(CensusDetailType, ElectionDetailType), ApplicationError>> + 'e {
        sqlx::query_as::<_, QueryCensusElectionDbResp>(QUERY_CENSUS_ELECTION)
            .fetch(connection_pool)
            .map(|result| result.map_err(|err| handle_database_error(&err, "query census and election pairs")).and_then(Self::to_census_election_pair))
    }

    /**
     * Counts the rows of the county, census and election tables.
     */
    #[instrument(skip(self, connection))]
    pub async fn get_table_counts(&self, connection: &mut SqliteConnection) -> Result<TableCountsType, ApplicationError> {
        let span = tracing::Span::current();
        let (county, census, election): QueryTableCountsDbResp =
            sqlx::query_as(QUERY_TABLE_COUNTS).fetch_one(connection).instrument(span).await.map_err(|err| handle_database_error(&err, "count rows"))?;
        Ok(TableCountsType { county, census, election })
    }

    /**
     * Finds county years where the `total` tally differs from the sum of the other categories.
     *
     * # Arguments
     * `connection`: The database connection.
     *
     * # Returns
     * The mismatching county years ordered by county and year.
     */
    #[instrument(skip(self, connection))]
    pub async fn get_inconsistent_totals(&self, connection: &mut SqliteConnection) -> Result<Vec<InconsistentTotalType>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<QueryInconsistentTotalsDbResp> =
            sqlx::query_as(QUERY_INCONSISTENT_TOTALS).fetch_all(connection).instrument(span).await.map_err(|err| handle_database_error(&err, "query inconsistent totals"))?;
        Ok(results.into_iter().map(|(fips_id, year, total, sum)| InconsistentTotalType { fips_id, year, total, sum }).collect())
    }

    fn to_census_election_pair(row: QueryCensusElectionDbResp) -> Result<(CensusDetailType, ElectionDetailType), ApplicationError> {
        let (census_id, census_fips_id, census_year, population, estimated, election_id, election_fips_id, election_year, party, votes) = row;
        let party = Party::from_str(&party).map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Invalid election row {election_id}: {}", err.message)))?;
        Ok((CensusDetailType::new(census_id, census_fips_id, census_year, population, estimated), ElectionDetailType::new(election_id, election_fips_id, election_year, party, votes)))
    }
}
