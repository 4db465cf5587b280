//! For reading application configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! `config.{toml,yaml,json}` file in the working directory, and environment
//! variables such as `DB_URL` and `ADDRESS_SERVER`.

use serde::Deserialize;
use std::{path::PathBuf, time::Duration};

/// Default database connection string.
pub const DEFAULT_DB_URL: &str = "urlDb";

/// Default listen address. No host means every interface.
pub const DEFAULT_ADDRESS_SERVER: &str = ":8080";

/// Default time given to in-flight requests during shutdown.
pub const DEFAULT_SHUTDOWN_TIMEOUT: &str = "10s";

/// Application configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    /// Listen address, read from `ADDRESS_SERVER`.
    #[serde(rename = "address_server")]
    pub address: String,
    /// How long shutdown waits for in-flight requests.
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
    /// The database connection string, read from `DB_URL`.
    #[serde(rename = "db_url")]
    pub database_url: String,
    /// Upper bound on pooled database connections.
    pub db_max_connections: u32,
    /// Directory for JSON log files. Logs go to stdout only when unset.
    pub log_dir: Option<PathBuf>,
}

/// Retrieve [`Config`] from the configuration file and process environment.
#[tracing::instrument]
pub fn load_config() -> anyhow::Result<Config> {
    load_config_from(config::Environment::default())
}

/// Retrieve [`Config`] with a custom environment source.
pub fn load_config_from(environment: config::Environment) -> anyhow::Result<Config> {
    let config = config::Config::builder()
        .set_default("db_url", DEFAULT_DB_URL)?
        .set_default("address_server", DEFAULT_ADDRESS_SERVER)?
        .set_default("shutdown_timeout", DEFAULT_SHUTDOWN_TIMEOUT)?
        .set_default("db_max_connections", 10)?
        .add_source(config::File::with_name("config").required(false))
        .add_source(environment.ignore_empty(true))
        .build()?
        .try_deserialize()?;
    Ok(config)
}
