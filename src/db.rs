// src/db.rs

use std::{str::FromStr, time::Duration};

use sqlx::{
    SqlitePool,
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

/// Embedded schema migrations (`./migrations`).
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Opens a pool with foreign keys enforced, creating the database file if needed.
///
/// An in-memory database lives and dies with its connection, so such pools
/// are pinned to a single connection that is never recycled.
pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool_options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    pool_options
        .acquire_timeout(Duration::from_secs(3))
        .connect_with(options)
        .await
}

const CONNECT_ATTEMPTS: u32 = 6;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// `connect`, retried while the database is still coming up.
pub async fn connect_with_retry(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let mut attempt = 1;
    loop {
        match connect(database_url).await {
            Ok(pool) => {
                tracing::info!(attempt, "database connected");
                return Ok(pool);
            }
            Err(err) if attempt < CONNECT_ATTEMPTS => {
                tracing::warn!(attempt, error = %err, "database not ready, retrying");
                attempt += 1;
                tokio::time::sleep(RETRY_DELAY).await;
            }
            Err(err) => {
                tracing::error!(attempts = attempt, error = %err, "giving up on database");
                return Err(err);
            }
        }
    }
}

/// Applies pending migrations.
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    MIGRATOR.run(pool).await
}
