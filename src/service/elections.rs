use std::fs::File;
use std::io::Read;
use std::path::Path;

use futures_util::Stream;
use sqlx::{Pool, Sqlite, SqliteConnection};
use tracing::{Instrument, instrument};

use crate::{
    dao::{elections::ElectionsDao, handle_database_error, schema::SchemaDao},
    loader::{data_records, election::parse_election_record, population::parse_population_record},
    model::{
        apperror::{ApplicationError, ErrorType},
        layout::{ELECTION_LAYOUT, POPULATION_LAYOUT},
        models::{CensusDetailType, ElectionDetailType, InconsistentTotalType, TableCountsType},
    },
};

/**
 * Loads the population and election sources and queries the result.
 */
pub struct ElectionsService {
    /**
     * The DAO for county, census and election rows.
     */
    elections_dao: ElectionsDao,
    /**
     * The DAO for the schema.
     */
    schema_dao: SchemaDao,
    /**
     * Connection pool for database operations.
     */
    connection_pool: Pool<Sqlite>,
}

impl ElectionsService {
    /**
     * Creates a new instance of `ElectionsService`.
     *
     * # Arguments
     * `elections_dao`: The DAO for county, census and election rows.
     * `schema_dao`: The DAO for the schema.
     * `connection_pool`: Connection pool for database operations.
     *
     * # Returns
     * A new instance of `ElectionsService`.
     */
    pub fn new(elections_dao: ElectionsDao, schema_dao: SchemaDao, connection_pool: Pool<Sqlite>) -> Self {
        ElectionsService { elections_dao, schema_dao, connection_pool }
    }

    /**
     * Creates the tables that do not exist yet. Calling it again is a no-op.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    #[instrument(skip(self))]
    pub async fn define_tables(&self) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let mut transaction = self.begin().await?;
        match self.schema_dao.create_tables(&mut transaction).instrument(span.clone()).await {
            Ok(()) => transaction.commit().await.map_err(|err| handle_database_error(&err, "commit schema"))?,
            Err(err) => {
                transaction.rollback().await.map_err(|err| handle_database_error(&err, "rollback schema"))?;
                return Err(err);
            }
        }
        let mut connection = self.acquire().await?;
        let tables = self.schema_dao.get_table_names(&mut connection).instrument(span).await?;
        tracing::info!("Schema ready with tables {}", tables.join(", "));
        Ok(())
    }

    /**
     * Loads a population source. Each row adds one county and one census row per reading year.
     *
     * The whole source is loaded in one transaction. Nothing is stored if any row fails.
     *
     * # Arguments
     * `source`: Comma separated population estimates.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    #[instrument(skip(self, source))]
    pub async fn load_population<R: Read>(&self, source: R) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let mut transaction = self.begin().await?;
        match self.add_population(&mut transaction, source).instrument(span).await {
            Ok((counties, census)) => {
                transaction.commit().await.map_err(|err| handle_database_error(&err, "commit population"))?;
                tracing::info!("Loaded {} counties with {} census rows", counties, census);
            }
            Err(err) => {
                tracing::warn!("Population load rolled back: {}", err);
                transaction.rollback().await.map_err(|err| handle_database_error(&err, "rollback population"))?;
                return Err(err);
            }
        }
        Ok(())
    }

    /**
     * Loads a population source file.
     *
     * # Arguments
     * `path`: Path of the population estimates file.
     */
    pub async fn load_population_file(&self, path: &Path) -> Result<(), ApplicationError> {
        tracing::info!("Loading population estimates from {}", path.display());
        self.load_population(Self::open(path)?).await
    }

    /**
     * Loads an election source. Each row adds one election row per year and party.
     *
     * Counties are not checked while loading. Rows for unknown counties fail the commit with a
     * referential integrity error and nothing is stored.
     *
     * # Arguments
     * `source`: Comma separated election results.
     *
     * # Returns
     * A Result indicating success or an `ApplicationError`.
     */
    #[instrument(skip(self, source))]
    pub async fn load_votes<R: Read>(&self, source: R) -> Result<(), ApplicationError> {
        let span = tracing::Span::current();
        let mut transaction = self.begin().await?;
        match self.add_votes(&mut transaction, source).instrument(span).await {
            Ok(elections) => {
                transaction.commit().await.map_err(|err| handle_database_error(&err, "commit elections"))?;
                tracing::info!("Loaded {} election rows", elections);
            }
            Err(err) => {
                tracing::warn!("Election load rolled back: {}", err);
                transaction.rollback().await.map_err(|err| handle_database_error(&err, "rollback elections"))?;
                return Err(err);
            }
        }
        Ok(())
    }

    /**
     * Loads an election source file.
     *
     * # Arguments
     * `path`: Path of the election results file.
     */
    pub async fn load_votes_file(&self, path: &Path) -> Result<(), ApplicationError> {
        tracing::info!("Loading election results from {}", path.display());
        self.load_votes(Self::open(path)?).await
    }

    /**
     * Pairs every census row with the election rows of the same county and year.
     *
     * The query runs when the stream is first polled and again for every call.
     */
    pub fn query(&self) -> impl Stream<Item = Result<(CensusDetailType, ElectionDetailType), ApplicationError>> + '_ {
        self.elections_dao.get_census_election_pairs(&self.connection_pool)
    }

    /**
     * Counts the stored counties, census rows and election rows.
     */
    pub async fn table_counts(&self) -> Result<TableCountsType, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.elections_dao.get_table_counts(&mut connection).await
    }

    /**
     * County years whose `total` tally differs from the sum of the party tallies.
     */
    pub async fn inconsistent_totals(&self) -> Result<Vec<InconsistentTotalType>, ApplicationError> {
        let mut connection = self.acquire().await?;
        self.elections_dao.get_inconsistent_totals(&mut connection).await
    }

    async fn add_population<R: Read>(&self, transaction: &mut SqliteConnection, source: R) -> Result<(usize, usize), ApplicationError> {
        let mut counties = 0;
        let mut census = 0;
        for record in data_records(source, POPULATION_LAYOUT.header_rows) {
            let row = parse_population_record(&POPULATION_LAYOUT, &record?)?;
            self.elections_dao.add_county(transaction, &row.county).await?;
            for census_add_input in &row.census {
                self.elections_dao.add_census(transaction, census_add_input).await?;
            }
            counties += 1;
            census += row.census.len();
        }
        Ok((counties, census))
    }

    async fn add_votes<R: Read>(&self, transaction: &mut SqliteConnection, source: R) -> Result<usize, ApplicationError> {
        let mut elections = 0;
        for record in data_records(source, ELECTION_LAYOUT.header_rows) {
            for election_add_input in parse_election_record(&ELECTION_LAYOUT, &record?)? {
                self.elections_dao.add_election(transaction, &election_add_input).await?;
                elections += 1;
            }
        }
        Ok(elections)
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'static, Sqlite>, ApplicationError> {
        self.connection_pool.begin().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to begin transaction: {err}")))
    }

    async fn acquire(&self) -> Result<sqlx::pool::PoolConnection<Sqlite>, ApplicationError> {
        self.connection_pool.acquire().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to acquire connection: {err}")))
    }

    fn open(path: &Path) -> Result<File, ApplicationError> {
        File::open(path).map_err(|err| ApplicationError::new(ErrorType::Io, format!("Failed to open {}: {err}", path.display())))
    }
}

#[cfg(test)]
mod test {
    use std::collections::HashSet;
    use std::io::Write;

    use futures_util::TryStreamExt;

    use super::*;
    use crate::dao::connection::connect;
    use crate::model::config::{Database, DatabaseType};
    use crate::model::models::Party;

    const POPULATION_HEADER: &str = "GEO.id,GEO.id2,GEO.display-label,rescen42010,resbase42010,respop72010,respop72011,respop72012,respop72013,respop72014,respop72015,respop72016,respop72017,respop72018
Id,Id2,Geography,April 1 2010 - Census,April 1 2010 - Estimates Base,Population Estimate 2010,Population Estimate 2011,Population Estimate 2012,Population Estimate 2013,Population Estimate 2014,Population Estimate 2015,Population Estimate 2016,Population Estimate 2017,Population Estimate 2018
";
    const AUTAUGA_POPULATION: &str = "0500000US01001,01001,\"Autauga County, Alabama\",54571,54597,54773,55227,54954,54727,54893,54864,55243,55390,55533\n";
    const BALDWIN_POPULATION: &str = "0500000US01003,01003,\"Baldwin County, Alabama\",182265,182265,183112,186558,190145,194885,199183,202939,207601,212521,218022\n";
    const ELECTION_HEADER: &str = "fips_code,county,total_2008,dem_2008,gop_2008,oth_2008,total_2012,dem_2012,gop_2012,oth_2012,total_2016,dem_2016,gop_2016,oth_2016\n";
    const AUTAUGA_VOTES: &str = "1001,Autauga County,23641,6093,17403,145,23932,6363,17379,190,24973,5936,18172,865\n";
    const BALDWIN_VOTES: &str = "1003,Baldwin County,81413,19386,61271,756,85338,18424,66016,898,95215,18458,72883,3874\n";

    async fn init_service() -> ElectionsService {
        let pool = connect(&Database::default()).await.unwrap();
        let service = ElectionsService::new(ElectionsDao::new(), SchemaDao::new(), pool);
        service.define_tables().await.unwrap();
        service
    }

    fn population(rows: &[&str]) -> String {
        POPULATION_HEADER.to_string() + &rows.concat()
    }

    fn votes(rows: &[&str]) -> String {
        ELECTION_HEADER.to_string() + &rows.concat()
    }

    async fn pairs(service: &ElectionsService) -> Vec<(CensusDetailType, ElectionDetailType)> {
        service.query().try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn test_define_tables_twice() {
        let service = init_service().await;
        service.define_tables().await.unwrap();
        let mut connection = service.acquire().await.unwrap();
        let tables = service.schema_dao.get_table_names(&mut connection).await.unwrap();
        assert_eq!(tables.len(), 3);
    }

    #[tokio::test]
    async fn test_load_population() {
        let service = init_service().await;
        service.load_population(population(&[AUTAUGA_POPULATION, BALDWIN_POPULATION]).as_bytes()).await.unwrap();
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType { county: 2, census: 6, election: 0 });
        let rows: Vec<(u32, u16, u32, bool)> = sqlx::query_as("SELECT fips_id, year, population, estimated FROM census ORDER BY fips_id, year").fetch_all(&service.connection_pool).await.unwrap();
        assert_eq!(
            rows,
            vec![
                (1001, 2010, 54571, false),
                (1001, 2012, 54954, true),
                (1001, 2016, 55243, true),
                (1003, 2010, 182265, false),
                (1003, 2012, 190145, true),
                (1003, 2016, 207601, true)
            ]
        );
        let (name,): (String,) = sqlx::query_as("SELECT name FROM county WHERE fips = 1001").fetch_one(&service.connection_pool).await.unwrap();
        assert_eq!(name, "Autauga County, Alabama");
    }

    #[tokio::test]
    async fn test_load_population_headers_only() {
        let service = init_service().await;
        service.load_population(POPULATION_HEADER.as_bytes()).await.unwrap();
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType::default());
    }

    #[tokio::test]
    async fn test_load_population_malformed_row_stores_nothing() {
        let service = init_service().await;
        let malformed = "0500000US01005,01005,\"Barbour County, Alabama\",27457,27455,27327,27341,(X),26787,26264,25774,25345,24946,24686\n";
        let error = service.load_population(population(&[AUTAUGA_POPULATION, malformed, BALDWIN_POPULATION]).as_bytes()).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::MalformedRow);
        assert!(error.message.contains("Line 4"));
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType::default());
    }

    #[tokio::test]
    async fn test_load_population_short_row_stores_nothing() {
        let service = init_service().await;
        let error = service.load_population(population(&[AUTAUGA_POPULATION, "0500000US01005,01005,Barbour County\n"]).as_bytes()).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::MalformedRow);
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType::default());
    }

    #[tokio::test]
    async fn test_load_population_twice_is_rejected() {
        let service = init_service().await;
        service.load_population(population(&[AUTAUGA_POPULATION]).as_bytes()).await.unwrap();
        let error = service.load_population(population(&[BALDWIN_POPULATION, AUTAUGA_POPULATION]).as_bytes()).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::ConstraintViolation);
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType { county: 1, census: 3, election: 0 });
    }

    #[tokio::test]
    async fn test_load_votes() {
        let service = init_service().await;
        service.load_population(population(&[AUTAUGA_POPULATION, BALDWIN_POPULATION]).as_bytes()).await.unwrap();
        service.load_votes(votes(&[AUTAUGA_VOTES, BALDWIN_VOTES]).as_bytes()).await.unwrap();
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType { county: 2, census: 6, election: 24 });
        let per_county: Vec<(u32, u16, i64)> =
            sqlx::query_as("SELECT fips_id, year, COUNT(DISTINCT party) FROM election GROUP BY fips_id, year ORDER BY fips_id, year").fetch_all(&service.connection_pool).await.unwrap();
        assert_eq!(per_county, vec![(1001, 2008, 4), (1001, 2012, 4), (1001, 2016, 4), (1003, 2008, 4), (1003, 2012, 4), (1003, 2016, 4)]);
        assert!(service.inconsistent_totals().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_votes_flags_inconsistent_totals() {
        let service = init_service().await;
        service.load_population(population(&[AUTAUGA_POPULATION]).as_bytes()).await.unwrap();
        service.load_votes(votes(&["1001,Autauga County,23641,6093,17403,145,24000,6363,17379,190,24973,5936,18172,865\n"]).as_bytes()).await.unwrap();
        let inconsistent = service.inconsistent_totals().await.unwrap();
        assert_eq!(inconsistent, vec![InconsistentTotalType { fips_id: 1001, year: 2012, total: 24000, sum: 23932 }]);
    }

    #[tokio::test]
    async fn test_load_votes_unknown_county_is_referential_error() {
        let service = init_service().await;
        service.load_population(population(&[AUTAUGA_POPULATION]).as_bytes()).await.unwrap();
        let error = service.load_votes(votes(&[AUTAUGA_VOTES, BALDWIN_VOTES]).as_bytes()).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::ReferentialIntegrity);
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType { county: 1, census: 3, election: 0 });
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_connection_usable() {
        let service = init_service().await;
        for _ in 0..2 {
            let error = service.load_votes(votes(&[BALDWIN_VOTES]).as_bytes()).await.unwrap_err();
            assert_eq!(error.error_type, ErrorType::ReferentialIntegrity);
        }
        service.load_population(population(&[AUTAUGA_POPULATION]).as_bytes()).await.unwrap();
        service.load_votes(votes(&[AUTAUGA_VOTES]).as_bytes()).await.unwrap();
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType { county: 1, census: 3, election: 12 });
    }

    #[tokio::test]
    async fn test_load_population_out_of_range_count_stores_nothing() {
        let service = init_service().await;
        let error = service
            .load_population(population(&["0500000US01001,01001,\"Autauga County, Alabama\",4294967296,54597,54773,55227,54954,54727,54893,54864,55243,55390,55533\n"]).as_bytes())
            .await
            .unwrap_err();
        assert_eq!(error.error_type, ErrorType::MalformedRow);
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType::default());
    }

    #[tokio::test]
    async fn test_load_votes_malformed_row_stores_nothing() {
        let service = init_service().await;
        service.load_population(population(&[AUTAUGA_POPULATION, BALDWIN_POPULATION]).as_bytes()).await.unwrap();
        let error = service.load_votes(votes(&[AUTAUGA_VOTES, "1003,Baldwin County,81413,19386,61271,756,85338,18424\n"]).as_bytes()).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::MalformedRow);
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType { county: 2, census: 6, election: 0 });
    }

    #[tokio::test]
    async fn test_query_end_to_end() {
        let service = init_service().await;
        service.load_population(population(&[AUTAUGA_POPULATION]).as_bytes()).await.unwrap();
        service.load_votes(votes(&[AUTAUGA_VOTES]).as_bytes()).await.unwrap();
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType { county: 1, census: 3, election: 12 });

        let pairs = pairs(&service).await;
        assert_eq!(pairs.len(), 8);
        for year in [2012, 2016] {
            let year_pairs: Vec<_> = pairs.iter().filter(|(census, _)| census.year == year).collect();
            assert_eq!(year_pairs.len(), 4);
            let parties: HashSet<Party> = year_pairs.iter().map(|(_, election)| election.party).collect();
            assert_eq!(parties.len(), 4);
        }
        assert!(pairs.iter().all(|(census, election)| census.fips_id == election.fips_id && census.year == election.year && census.estimated));
        assert!(!pairs.iter().any(|(census, _)| census.year == 2010));
    }

    #[tokio::test]
    async fn test_query_is_evaluated_on_each_call() {
        let service = init_service().await;
        assert!(pairs(&service).await.is_empty());
        service.load_population(population(&[AUTAUGA_POPULATION, BALDWIN_POPULATION]).as_bytes()).await.unwrap();
        service.load_votes(votes(&[AUTAUGA_VOTES]).as_bytes()).await.unwrap();
        let stream = service.query();
        service.load_votes(votes(&[BALDWIN_VOTES]).as_bytes()).await.unwrap();
        let pending: Vec<_> = stream.try_collect().await.unwrap();
        assert_eq!(pending.len(), 16);
        assert_eq!(pairs(&service).await.len(), 16);
    }

    #[tokio::test]
    async fn test_load_files() {
        let directory = tempfile::tempdir().unwrap();
        let population_path = directory.path().join("PEP_2018_PEPANNRES_with_ann.csv");
        let votes_path = directory.path().join("US_County_Level_Presidential_Results_08-16.csv");
        File::create(&population_path).unwrap().write_all(population(&[AUTAUGA_POPULATION]).as_bytes()).unwrap();
        File::create(&votes_path).unwrap().write_all(votes(&[AUTAUGA_VOTES]).as_bytes()).unwrap();

        let database = Database {
            db_type: DatabaseType::Sqlite {
                connection_string: format!("sqlite://{}?mode=rwc", directory.path().join("elections.db").display()),
                max_connections: 2,
                acquire_timeout: 5000,
                echo_statements: false,
            },
        };
        let service = ElectionsService::new(ElectionsDao::new(), SchemaDao::new(), connect(&database).await.unwrap());
        service.define_tables().await.unwrap();
        service.load_population_file(&population_path).await.unwrap();
        service.load_votes_file(&votes_path).await.unwrap();
        assert_eq!(service.table_counts().await.unwrap(), TableCountsType { county: 1, census: 3, election: 12 });
        assert_eq!(pairs(&service).await.len(), 8);
    }

    #[tokio::test]
    async fn test_load_missing_file_is_io_error() {
        let service = init_service().await;
        let error = service.load_population_file(Path::new("/nonexistent/population.csv")).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::Io);
    }
}
