//! SQLite backend for the order ledger.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
