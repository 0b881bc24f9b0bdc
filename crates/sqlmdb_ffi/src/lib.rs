//! # SQLMDB FFI
//!
//! LMDB-compatible C ABI over [`sqlmdb_core`].
//!
//! Function names, argument order, flag values and return codes follow
//! `lmdb.h`, so a C program written against LMDB can link against this
//! library instead.
//!
//! ## Ownership
//!
//! - Handles are heap allocated by this library and freed by the matching
//!   close, commit or abort call.
//! - `MDB_val` outputs point into the transaction and are valid until it
//!   commits or aborts. Callers never free them.
//! - Transactions and cursors must stay on the thread that created them.
//!
//! ## Errors
//!
//! Every function returns `0` on success or an LMDB, errno or SQLite code.
//! [`mdb_strerror`] describes a code; for engine codes it returns the
//! detailed message of the last failure on the calling thread.

#![warn(missing_docs)]

mod cursor;
mod dbi;
mod env;
mod error;
mod kv;
mod txn;
mod types;

pub use cursor::{mdb_cursor_close, mdb_cursor_get, mdb_cursor_open, mdb_cursor_put};
pub use dbi::{mdb_dbi_close, mdb_dbi_open, mdb_drop, mdb_stat};
pub use env::{
    mdb_env_close, mdb_env_copy, mdb_env_copy2, mdb_env_create, mdb_env_open, mdb_env_set_mapsize,
    mdb_env_set_maxdbs,
};
pub use error::{mdb_strerror, EINVAL};
pub use kv::{mdb_del, mdb_get, mdb_put};
pub use txn::{mdb_txn_abort, mdb_txn_begin, mdb_txn_commit};
pub use types::*;

pub use sqlmdb_core::{
    EACCES, MDB_BAD_VALSIZE, MDB_CORRUPTED, MDB_INCOMPATIBLE, MDB_KEYEXIST, MDB_NOTFOUND,
    MDB_PANIC, MDB_SUCCESS,
};
