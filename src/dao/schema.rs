use sqlx::SqliteConnection;
use tracing::{Instrument, instrument};

use crate::dao::handle_database_error;
use crate::model::apperror::ApplicationError;

/**
 * Statements creating the county, census and election tables.
 *
 * Every statement is idempotent. Foreign keys are deferred so that a missing county is reported when the loading
 * transaction commits.
 */
const CREATE_SCHEMA: [&str; 5] = [
    "CREATE TABLE IF NOT EXISTS county (
        fips INTEGER PRIMARY KEY,
        name VARCHAR(100)
    )",
    "CREATE TABLE IF NOT EXISTS census (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        fips_id INTEGER NOT NULL REFERENCES county (fips) DEFERRABLE INITIALLY DEFERRED,
        year INTEGER NOT NULL,
        population INTEGER NOT NULL CHECK (population >= 0),
        estimated BOOLEAN NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS census_fips_year ON census (fips_id, year)",
    "CREATE TABLE IF NOT EXISTS election (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        fips_id INTEGER NOT NULL REFERENCES county (fips) DEFERRABLE INITIALLY DEFERRED,
        year INTEGER NOT NULL,
        party TEXT NOT NULL CHECK (party IN ('total', 'dem', 'gop', 'other')),
        votes INTEGER NOT NULL CHECK (votes >= 0)
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS election_fips_year_party ON election (fips_id, year, party)",
];

/**
 * SQL query listing the application tables present in the database.
 */
const QUERY_TABLE_NAMES: &str = "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('county', 'census', 'election') ORDER BY name";

/**
 * DAO for schema management.
 */
pub struct SchemaDao {}

impl SchemaDao {
    pub fn new() -> Self {
        SchemaDao {}
    }

    /**
     * Creates the tables and indexes that do not exist yet.
     *
     * # Arguments
     * `transaction`: The database transaction to execute the statements within.
     */
    #[instrument(skip(self, transaction))]
    pub async fn create_tables(&self, transaction: &mut SqliteConnection) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        for statement in CREATE_SCHEMA {
            sqlx::query(statement).execute(&mut *transaction).instrument(span.clone()).await.map_err(|err| handle_database_error(&err, "create schema"))?;
        }
        Ok(())
    }

    /**
     * Lists the application tables in name order.
     */
    #[instrument(skip(self, connection))]
    pub async fn get_table_names(&self, connection: &mut SqliteConnection) -> Result<Vec<String>, ApplicationError> {
        let span = tracing::Span::current();
        let results: Vec<(String,)> = sqlx::query_as(QUERY_TABLE_NAMES).fetch_all(connection).instrument(span).await.map_err(|err| handle_database_error(&err, "list tables"))?;
        Ok(results.into_iter().map(|(name,)| name).collect())
    }
}
