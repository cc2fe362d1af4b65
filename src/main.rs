mod dao;
mod loader;
mod model;
mod service;

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Arc;

use crate::dao::connection::connect;
use crate::dao::elections::ElectionsDao;
use crate::dao::schema::SchemaDao;
use crate::model::apperror::{ApplicationError, ErrorType};
use crate::model::config::{ApplicationArguments, Config, LoggingConfig};
use crate::service::elections::ElectionsService;

use clap::Parser;
use futures_util::TryStreamExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/**
 * Creates the schema, loads the configured sources and reports what the store holds.
 */
#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    let args = ApplicationArguments::parse();

    let mut config = match &args.config_file {
        Some(config_file) => get_config(config_file).map_err(std::io::Error::other)?,
        None => Config::default(),
    };
    config.apply_arguments(&args);

    init_tracing(&config.logging)?;

    let connection_pool = connect(&config.database).await.map_err(std::io::Error::other)?;
    let elections_service = ElectionsService::new(ElectionsDao::new(), SchemaDao::new(), connection_pool);

    elections_service.define_tables().await.map_err(std::io::Error::other)?;
    if let Some(census) = &config.sources.census {
        elections_service.load_population_file(Path::new(census)).await.map_err(std::io::Error::other)?;
    }
    if let Some(election) = &config.sources.election {
        elections_service.load_votes_file(Path::new(election)).await.map_err(std::io::Error::other)?;
    }

    report(&elections_service).await.map_err(std::io::Error::other)
}

/**
 * Initializes tracing for the application.
 *
 * #Arguments
 * `logging`: Logging configuration.
 *
 * #Returns
 * A `Result` indicating success or failure.
 */
fn init_tracing(logging: &LoggingConfig) -> Result<(), std::io::Error> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in &logging.directives {
        filter = filter.add_directive(directive.parse::<Directive>().map_err(|err| std::io::Error::other(format!("Invalid logging directive {directive}: {err}")))?);
    }
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(logging.target)
        .with_thread_ids(logging.thread_ids)
        .with_thread_names(logging.thread_names)
        .with_line_number(logging.line_number)
        .with_level(logging.level)
        .with_ansi(logging.ansi)
        .with_file(logging.file);
    let initialized = match &logging.logfile {
        Some(logfile) => {
            let file = OpenOptions::new().create(true).append(true).open(logfile).map_err(|err| std::io::Error::other(format!("Failed to open log file {logfile}: {err}")))?;
            tracing_subscriber::registry().with(filter).with(fmt_layer.with_writer(Arc::new(file))).try_init()
        }
        None => tracing_subscriber::registry().with(filter).with(fmt_layer).try_init(),
    };
    initialized.map_err(|err| std::io::Error::other(format!("Failed to initialize tracing: {err}")))
}

/**
 * Reads the configuration from the specified file.
 *
 * #Arguments
 * `config_file`: The path to the configuration file.
 *
 * #Returns
 * A `Result` containing the parsed `Config` or an `ApplicationError` if reading or parsing fails.
 */
fn get_config(config_file: &str) -> Result<Config, ApplicationError> {
    let config_str: String = std::fs::read_to_string(config_file).map_err(|err| ApplicationError::new(ErrorType::Configuration, format!("Failed to read config file: {err}")))?;
    let config: Config = toml::from_str(&config_str).map_err(|err| ApplicationError::new(ErrorType::Configuration, format!("Failed to parse config file: {err}")))?;
    Ok(config)
}

/**
 * Logs the table sizes, the joined pairs per year and every county year whose totals do not add up.
 *
 * #Arguments
 * `elections_service`: The service to report on.
 */
async fn report(elections_service: &ElectionsService) -> Result<(), ApplicationError> {
    let counts = elections_service.table_counts().await?;
    tracing::info!("Store holds {} counties, {} census rows and {} election rows", counts.county, counts.census, counts.election);

    let pairs_per_year = elections_service
        .query()
        .try_fold(BTreeMap::new(), |mut pairs_per_year: BTreeMap<u16, usize>, (census, _election)| async move {
            *pairs_per_year.entry(census.year).or_default() += 1;
            Ok::<_, ApplicationError>(pairs_per_year)
        })
        .await?;
    for (year, pairs) in pairs_per_year {
        tracing::info!("{} census and election pairs for {}", pairs, year);
    }

    for inconsistent in elections_service.inconsistent_totals().await? {
        tracing::warn!("County {} reports {} total votes in {} but its parties sum to {}", inconsistent.fips_id, inconsistent.total, inconsistent.year, inconsistent.sum);
    }
    Ok(())
}
