//! For interacting with the database.

use sqlx::{
    pool::PoolOptions,
    postgres::{PgConnectOptions, PgPool},
    ConnectOptions, Postgres, Transaction,
};
use std::{str::FromStr, time::Duration};
use tracing::log::LevelFilter;

/// A common transaction type.
pub type Tx = Transaction<'static, Postgres>;

/// A common database pool type.
pub type DbPool = PgPool;

/// Builds a lazily connecting pool from a connection string.
///
/// Fails only when the connection string cannot be parsed; connections
/// are opened on first use.
pub fn init_db(url: &str, max_connections: u32) -> Result<DbPool, sqlx::Error> {
    let db_options = PgConnectOptions::from_str(url)?.log_statements(LevelFilter::Debug);
    let db: PgPool = PoolOptions::default()
        .acquire_timeout(Duration::from_secs(5))
        .max_connections(max_connections)
        .connect_lazy_with(db_options);
    Ok(db)
}

/// Applies the embedded migrations.
#[tracing::instrument(skip_all)]
pub async fn migrate(db: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("Running database migrations");
    sqlx::migrate!("./migrations").run(db).await
}
