use clap::Parser;
use serde::{Deserialize, Serialize};

/**
 * Default database, a private in-memory SQLite database.
 */
pub const DEFAULT_CONNECTION_STRING: &str = "sqlite::memory:";

/**
 * Command-line arguments for the application.
 */
#[derive(Parser, Debug)]
#[command(version, about = "US census + presidential elections", long_about = None)]
pub struct ApplicationArguments {
    /**
     * Path to the configuration file. Built-in defaults are used when absent.
     */
    #[arg(long)]
    pub config_file: Option<String>,
    /**
     * Database connection string, overrides the configuration file.
     */
    #[arg(short, long)]
    pub sql: Option<String>,
    /**
     * Population estimates file to load.
     */
    #[arg(short, long)]
    pub census: Option<String>,
    /**
     * Election results file to load.
     */
    #[arg(short, long)]
    pub election: Option<String>,
}

/**
 * Represents the configuration for the application.
 */
#[derive(Clone, Serialize, Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /**
     * Logging configuration for the application.
     */
    #[serde(default)]
    pub logging: LoggingConfig,
    /**
     * Database configuration for the application.
     */
    #[serde(default)]
    pub database: Database,
    /**
     * Source files loaded when none are given on the command line.
     */
    #[serde(default)]
    pub sources: Sources,
}

impl Config {
    /**
     * Applies command line overrides on top of the configuration.
     *
     * # Arguments
     * `args`: The parsed command line arguments.
     */
    pub fn apply_arguments(&mut self, args: &ApplicationArguments) {
        if let Some(sql) = &args.sql {
            match &mut self.database.db_type {
                DatabaseType::Sqlite { connection_string, .. } => connection_string.clone_from(sql),
            }
        }
        if args.census.is_some() {
            self.sources.census.clone_from(&args.census);
        }
        if args.election.is_some() {
            self.sources.election.clone_from(&args.election);
        }
    }
}

#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /**
     * Whether to log the target of the log message.
     */
    pub target: bool,
    /**
     * Whether to log thread IDs .
     */
    pub thread_ids: bool,
    /**
     * Whether to log thread names.
     */
    pub thread_names: bool,
    /**
     * Whether to log line numbers.
     */
    pub line_number: bool,
    /**
     * Whether to log the log level.
     */
    pub level: bool,
    /**
     * Whether to use ANSI colors in logs.
     */
    pub ansi: bool,
    /**
     * Whether to log the source file name.
     */
    pub file: bool,
    /**
     * Path to the log file. Logs go to stdout when absent.
     */
    pub logfile: Option<String>,
    /**
     * Additional directives for logging configuration.
     */
    #[serde(default)]
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { target: true, thread_ids: false, thread_names: false, line_number: false, level: true, ansi: true, file: false, logfile: None, directives: vec![] }
    }
}

#[derive(Clone, Serialize, Deserialize, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /**
     * Type of the database.
     */
    pub db_type: DatabaseType,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub enum DatabaseType {
    /**
     * `SQLite` database, file backed or in-memory.
     */
    #[serde(rename_all = "camelCase")]
    Sqlite { connection_string: String, max_connections: u32, acquire_timeout: u64, echo_statements: bool },
}

impl Default for DatabaseType {
    fn default() -> Self {
        DatabaseType::Sqlite { connection_string: DEFAULT_CONNECTION_STRING.to_string(), max_connections: 1, acquire_timeout: 30000, echo_statements: false }
    }
}

/**
 * Paths of the source files.
 */
#[derive(Clone, Serialize, Deserialize, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Sources {
    pub census: Option<String>,
    pub election: Option<String>,
}
