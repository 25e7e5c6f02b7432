//! # SQLite database methods
//!
//! "Low-level" SQLite interactions live here, as simple functions (rather than stateful
//! structs) that accept a `&mut SqliteConnection`. Callers obtain a connection from a pool, or
//! open a transaction when several writes must land together, and call through without any
//! other changes.
use std::{env, str::FromStr};

use log::info;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Error as SqlxError,
    Executor,
    SqlitePool,
};

pub mod menu;
pub mod orders;
pub mod payments;

const SQLITE_DB_URL: &str = "sqlite://data/restaurant.db";
const SCHEMA: &str = include_str!("schema.sql");

pub fn db_url() -> String {
    let result = env::var("RPE_DATABASE_URL").unwrap_or_else(|_| {
        info!("RPE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
    Ok(pool)
}

/// Creates the tables if they do not exist yet. Safe to call on every startup.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), SqlxError> {
    pool.execute(SCHEMA).await?;
    Ok(())
}
