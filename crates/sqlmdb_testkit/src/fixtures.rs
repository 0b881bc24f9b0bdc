//! Test fixtures and environment helpers.
//!
//! Provides environments in throwaway directories and a few pre-populated
//! scenarios.

use sqlmdb_core::{EnvOptions, Environment};
use std::path::Path;
use tempfile::TempDir;

/// An environment in a temporary directory, removed on drop.
pub struct TestEnv {
    /// The environment instance.
    pub env: Environment,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestEnv {
    /// Opens an environment with default options.
    pub fn new() -> Self {
        Self::with_options(EnvOptions::default())
    }

    /// Opens an environment with the given options.
    pub fn with_options(options: EnvOptions) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let env = Environment::open(temp_dir.path(), options).expect("Failed to open environment");
        Self { env, temp_dir }
    }

    /// Returns the directory holding the database file.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Closes the environment and opens the same directory again.
    pub fn reopen(self, options: EnvOptions) -> Self {
        let Self { env, temp_dir } = self;
        env.close().expect("Failed to close environment");
        let env = Environment::open(temp_dir.path(), options).expect("Failed to reopen environment");
        Self { env, temp_dir }
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestEnv {
    type Target = Environment;

    fn deref(&self) -> &Self::Target {
        &self.env
    }
}

/// Runs a test with a temporary environment.
///
/// # Example
///
/// ```rust
/// use sqlmdb_testkit::with_temp_env;
///
/// with_temp_env(|env| {
///     let txn = env.begin_txn().unwrap();
///     txn.open_db("test", false).unwrap();
///     txn.commit().unwrap();
/// });
/// ```
pub fn with_temp_env<F, R>(f: F) -> R
where
    F: FnOnce(&Environment) -> R,
{
    let test_env = TestEnv::new();
    f(&test_env.env)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use sqlmdb_core::WriteFlags;

    /// Key used for the `i`th record of a populated database.
    pub fn key_for(i: usize) -> Vec<u8> {
        format!("key-{i:06}").into_bytes()
    }

    /// Creates an environment with one database holding `count` records.
    pub fn populated_env(name: &str, count: usize) -> TestEnv {
        let test_env = TestEnv::new();
        test_env
            .transaction(|txn| {
                let db = txn.open_db(name, false)?;
                for i in 0..count {
                    let value = format!("value-{i}");
                    txn.put(&db, &key_for(i), value.as_bytes(), WriteFlags::empty())?;
                }
                Ok(())
            })
            .expect("Failed to populate database");
        test_env
    }

    /// Creates an environment with one duplicate database holding
    /// `values_per_key` values under each of `keys` keys.
    pub fn multimap_env(name: &str, keys: usize, values_per_key: usize) -> TestEnv {
        let test_env = TestEnv::new();
        test_env
            .transaction(|txn| {
                let db = txn.open_db(name, true)?;
                for k in 0..keys {
                    for v in 0..values_per_key {
                        let value = format!("v{v:03}");
                        txn.put(&db, &key_for(k), value.as_bytes(), WriteFlags::empty())?;
                    }
                }
                Ok(())
            })
            .expect("Failed to populate multimap");
        test_env
    }
}
