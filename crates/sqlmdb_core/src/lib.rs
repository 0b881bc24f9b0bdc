//! # SQLMDB Core
//!
//! An LMDB-style transactional key-value API stored in SQLite.
//!
//! This crate provides:
//! - [`Environment`]: one SQLite file and its pool of sessions
//! - [`Transaction`]: read-only snapshots and a single exclusive writer
//! - [`Dbi`]: named databases, optionally holding several values per key
//! - Ordered [`Cursor`]s over `(key, value)` pairs
//! - Exact entry counts through [`Transaction::stat`]
//!
//! Every failure maps to the numeric code an LMDB caller expects through
//! [`CoreError::code`].
//!
//! ## Example
//!
//! ```rust
//! use sqlmdb_core::{EnvOptions, Environment, WriteFlags};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
//!
//! let txn = env.begin_txn().unwrap();
//! let tags = txn.open_db("tags", true).unwrap();
//! txn.put(&tags, b"rust", b"fast", WriteFlags::empty()).unwrap();
//! txn.put(&tags, b"rust", b"safe", WriteFlags::empty()).unwrap();
//!
//! let mut cursor = txn.open_cursor(&tags).unwrap();
//! assert_eq!(&cursor.first().unwrap().value[..], b"fast");
//! assert_eq!(&cursor.next_dup().unwrap().value[..], b"safe");
//! drop(cursor);
//!
//! assert_eq!(txn.stat(&tags).unwrap().entries, 2);
//! txn.commit().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod cursor;
mod dbi;
pub mod dir;
mod env;
mod error;
mod kv;
mod ledger;
mod transaction;
mod types;

pub use config::EnvOptions;
pub use cursor::Cursor;
pub use dbi::Dbi;
pub use env::Environment;
pub use error::{
    CoreError, CoreResult, EACCES, MDB_BAD_VALSIZE, MDB_CORRUPTED, MDB_INCOMPATIBLE,
    MDB_KEYEXIST, MDB_NOTFOUND, MDB_PANIC, MDB_SUCCESS,
};
pub use sqlmdb_storage::JournalMode;
pub use transaction::Transaction;
pub use types::{CursorOp, Record, Stat, WriteFlags};

/// Re-exported so callers can hold returned buffers without a direct dependency.
pub use bytes::Bytes;
