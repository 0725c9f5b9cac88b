//! SQLite backend for the comanda engine.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
