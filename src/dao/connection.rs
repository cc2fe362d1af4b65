use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{ConnectOptions, Pool, Sqlite};

use crate::model::apperror::{ApplicationError, ErrorType};
use crate::model::config::{Database, DatabaseType};

/**
 * Creates the connection pool for the configured database.
 *
 * An in-memory database only lives as long as its connection, so it gets a single connection that is never
 * retired.
 *
 * # Arguments
 * `database`: Database configuration.
 *
 * # Returns
 * The connection pool or an initialization error.
 */
pub async fn connect(database: &Database) -> Result<Pool<Sqlite>, ApplicationError> {
    match &database.db_type {
        DatabaseType::Sqlite { connection_string, max_connections, acquire_timeout, echo_statements } => {
            let mut connect_options = SqliteConnectOptions::from_str(connection_string)
                .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Invalid connection string {connection_string}: {err}")))?
                .foreign_keys(true);
            if !echo_statements {
                connect_options = connect_options.disable_statement_logging();
            }
            let max_connections = if is_in_memory(connection_string) { 1 } else { *max_connections };
            tracing::debug!("Connecting to {} with {} connections", connection_string, max_connections);
            SqlitePoolOptions::new()
                .max_connections(max_connections)
                .acquire_timeout(Duration::from_millis(*acquire_timeout))
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(connect_options)
                .await
                .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create database pool: {err}")))
        }
    }
}

fn is_in_memory(connection_string: &str) -> bool {
    connection_string.contains(":memory:") || connection_string.contains("mode=memory")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_is_in_memory() {
        assert!(is_in_memory("sqlite::memory:"));
        assert!(is_in_memory("sqlite://file:elections?mode=memory&cache=shared"));
        assert!(!is_in_memory("sqlite://elections.db?mode=rwc"));
    }

    #[tokio::test]
    async fn test_connect_in_memory_uses_single_connection() {
        let pool = connect(&Database::default()).await.unwrap();
        assert_eq!(pool.options().get_max_connections(), 1);
        let (foreign_keys,): (i64,) = sqlx::query_as("PRAGMA foreign_keys").fetch_one(&pool).await.unwrap();
        assert_eq!(foreign_keys, 1);
    }

    #[tokio::test]
    async fn test_connect_invalid_connection_string() {
        let database = Database { db_type: DatabaseType::Sqlite { connection_string: "postgres://localhost/elections".to_string(), max_connections: 1, acquire_timeout: 100, echo_statements: false } };
        let error = connect(&database).await.unwrap_err();
        assert_eq!(error.error_type, ErrorType::Initialization);
    }
}
