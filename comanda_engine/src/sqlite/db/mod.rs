//! # SQLite Database methods
//!
//! This module contains the "low-level" SQLite queries.
//!
//! Every query is a plain function that takes a `&mut SqliteConnection`. Callers take a connection from the pool, or
//! open a transaction and pass `&mut *tx`, without any other changes.
//!
//! Statements with a `RETURNING` clause are always read with `fetch_all`. SQLite only finishes such a statement, and
//! lets go of its write lock, once it has been stepped to the end.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod message_usage;
pub mod orders;
pub mod tenants;
pub mod users;

const SQLITE_DB_URL: &str = "sqlite://data/comanda.db";

pub fn db_url() -> String {
    let result = env::var("COMANDA_DATABASE_URL").unwrap_or_else(|_| {
        info!("🗃️ COMANDA_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("🗃️ Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
