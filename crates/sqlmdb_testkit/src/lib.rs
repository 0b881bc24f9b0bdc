//! # SQLMDB Testkit
//!
//! Test utilities for SQLMDB.
//!
//! This crate provides:
//! - Environments in temporary directories and pre-populated scenarios
//! - Property-based generators for keys, values and operation sequences
//! - A model harness that checks results, cursor order and entry counts
//! - Concurrent stress runners
//!
//! ## Usage
//!
//! ```rust
//! use sqlmdb_testkit::prelude::*;
//!
//! with_temp_env(|env| {
//!     let txn = env.begin_txn().unwrap();
//!     let db = txn.open_db("test", false).unwrap();
//!     assert_eq!(txn.stat(&db).unwrap().entries, 0);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
    pub use crate::stress::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
pub use stress::*;
