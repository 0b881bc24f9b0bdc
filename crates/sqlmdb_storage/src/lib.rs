//! # SQLMDB Storage
//!
//! SQLite session layer for SQLMDB.
//!
//! This crate is the only place that speaks SQL. Everything above it deals in
//! sub-database names, byte keys and byte values; everything here deals in
//! sessions, statements and backing transactions.
//!
//! ## Design Principles
//!
//! - Table names reach SQL only through a validated [`TableName`]
//! - Keys and values are always bound as BLOB parameters
//! - Every prepared statement is finalized, and the first failure wins
//! - Sessions never cross threads; the [`ConnectionPool`] keeps one idle
//!   stack per thread
//!
//! ## Example
//!
//! ```rust
//! use sqlmdb_storage::{BeginMode, ConnectionOptions, ConnectionPool, Statement, TableName};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let pool = ConnectionPool::new(dir.path().join("data.db"), ConnectionOptions::default());
//!
//! let conn = pool.acquire().unwrap();
//! conn.begin(BeginMode::Exclusive).unwrap();
//! let table = TableName::new("items").unwrap();
//! conn.execute(&Statement::CreateTable { table: &table, unique_keys: true }, []).unwrap();
//! conn.commit().unwrap();
//! pool.release(conn);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod connection;
mod error;
mod identifier;
mod pool;
mod statement;

pub use connection::{BeginMode, Connection, ConnectionOptions, JournalMode, DEFAULT_BUSY_TIMEOUT};
pub use error::{StorageError, StorageResult, SQLITE_ERROR};
pub use identifier::{TableName, MAX_NAME_LEN};
pub use pool::ConnectionPool;
pub use statement::{Statement, LEDGER_TABLE};

/// Re-exported so callers can bind parameters and read rows without a
/// direct dependency.
pub use rusqlite;
