// crates/msiconf-core/src/db.rs

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Pool, Postgres};
use tracing::info;

use crate::error::Result;
use crate::settings::DbSettings;

pub type DbPool = Pool<Postgres>;

pub const MAX_CONNECTIONS: u32 = 10;
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// Pool policy shared by every service: at most 10 connections, idle ones
/// reclaimed after 30 seconds, acquirers queue for up to 10 seconds.
pub fn pool_options() -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .idle_timeout(IDLE_TIMEOUT)
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

pub fn connect_options(settings: &DbSettings) -> PgConnectOptions {
    PgConnectOptions::new()
        .host(&settings.host)
        .port(settings.port)
        .database(&settings.database)
        .username(&settings.user)
        .password(&settings.password)
        .options([("search_path", settings.search_path.as_str())])
}

/// Establishes the connection pool from configured credentials.
pub async fn connect(settings: &DbSettings) -> Result<DbPool> {
    connect_with(connect_options(settings)).await
}

pub async fn connect_with(options: PgConnectOptions) -> Result<DbPool> {
    let pool = pool_options().connect_with(options).await?;
    info!(max_connections = MAX_CONNECTIONS, "database connection pool established");
    Ok(pool)
}

/// Builds the pool without opening a connection; the first query connects.
pub fn connect_lazy(settings: &DbSettings) -> DbPool {
    pool_options().connect_lazy_with(connect_options(settings))
}

pub async fn ping(pool: &DbPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
