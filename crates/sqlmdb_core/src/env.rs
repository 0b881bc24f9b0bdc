//! Environment: the entry point of SQLMDB.

use crate::config::EnvOptions;
use crate::dir;
use crate::error::{CoreError, CoreResult};
use crate::ledger;
use crate::transaction::Transaction;
use sqlmdb_storage::ConnectionPool;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An open environment.
///
/// An environment is one SQLite file holding any number of named
/// databases plus the entry count ledger. It owns the pool of sessions its
/// transactions borrow; transactions borrow the environment, so none can
/// outlive it.
///
/// # Example
///
/// ```rust
/// use sqlmdb_core::{EnvOptions, Environment, WriteFlags};
///
/// let dir = tempfile::tempdir().unwrap();
/// let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
///
/// let txn = env.begin_txn().unwrap();
/// let db = txn.open_db("users", false).unwrap();
/// txn.put(&db, b"alice", b"admin", WriteFlags::empty()).unwrap();
/// txn.commit().unwrap();
///
/// let txn = env.begin_ro_txn().unwrap();
/// let db = txn.open_existing_db("users").unwrap();
/// assert_eq!(&txn.get(&db, b"alice").unwrap()[..], b"admin");
/// ```
#[derive(Debug)]
pub struct Environment {
    path: PathBuf,
    options: EnvOptions,
    pool: ConnectionPool,
}

impl Environment {
    /// Opens an environment.
    ///
    /// The database file is resolved from `path` (see
    /// [`dir::resolve`](crate::dir::resolve)) and the ledger table is
    /// created if the environment is writable.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the path cannot be resolved, or the
    /// engine's error if the ledger cannot be created.
    pub fn open(path: impl AsRef<Path>, options: EnvOptions) -> CoreResult<Self> {
        let path = dir::resolve(path.as_ref(), options.no_sub_dir)?;
        let pool = ConnectionPool::new(path.clone(), options.connection_options());
        let env = Self {
            path,
            options,
            pool,
        };

        if !env.options.read_only {
            env.transaction(|txn| ledger::ensure_table(txn.conn()?))?;
        }

        debug!(
            path = %env.path.display(),
            read_only = env.options.read_only,
            journal_mode = env.options.journal_mode.as_str(),
            "environment opened"
        );
        Ok(env)
    }

    /// Returns the canonical path of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the options the environment was opened with.
    #[must_use]
    pub fn options(&self) -> &EnvOptions {
        &self.options
    }

    /// Begins a transaction.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` for a writable transaction on a read-only
    /// environment, or the engine's busy error if the lock cannot be taken
    /// within the busy timeout.
    pub fn begin(&self, writable: bool) -> CoreResult<Transaction<'_>> {
        Transaction::begin(self, writable)
    }

    /// Begins a writable transaction.
    ///
    /// # Errors
    ///
    /// See [`Self::begin`].
    pub fn begin_txn(&self) -> CoreResult<Transaction<'_>> {
        self.begin(true)
    }

    /// Begins a read-only transaction.
    ///
    /// # Errors
    ///
    /// See [`Self::begin`].
    pub fn begin_ro_txn(&self) -> CoreResult<Transaction<'_>> {
        self.begin(false)
    }

    /// Runs `f` in a writable transaction.
    ///
    /// Commits if `f` returns `Ok`, aborts otherwise.
    ///
    /// # Errors
    ///
    /// Returns the error from `f`, begin or commit.
    pub fn transaction<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> CoreResult<T>,
    {
        let txn = self.begin_txn()?;
        match f(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                txn.abort();
                Err(err)
            }
        }
    }

    /// Copies the environment to another location. Not supported.
    ///
    /// # Errors
    ///
    /// Always returns `NotSupported`.
    pub fn copy(&self, _dest: impl AsRef<Path>) -> CoreResult<()> {
        Err(CoreError::not_supported("environment copy"))
    }

    /// Closes the environment and every idle session.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if a session cannot be closed cleanly.
    pub fn close(self) -> CoreResult<()> {
        debug!(path = %self.path.display(), "closing environment");
        self.pool.close()?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &ConnectionPool {
        &self.pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dir::DATA_FILE;
    use tempfile::tempdir;

    #[test]
    fn open_creates_data_file_and_ledger() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        assert!(dir.path().join(DATA_FILE).exists());
        assert_eq!(env.path(), dir.path().canonicalize().unwrap().join(DATA_FILE));

        let txn = env.begin_ro_txn().unwrap();
        let exists = txn
            .conn()
            .unwrap()
            .query_optional(
                &sqlmdb_storage::Statement::TableExists,
                [sqlmdb_storage::LEDGER_TABLE],
                |_| Ok(()),
            )
            .unwrap();
        assert!(exists.is_some());
    }

    #[test]
    fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        Environment::open(dir.path(), EnvOptions::default())
            .unwrap()
            .close()
            .unwrap();
        Environment::open(dir.path(), EnvOptions::default())
            .unwrap()
            .close()
            .unwrap();
    }

    #[test]
    fn no_sub_dir_uses_path_as_file() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("store.sqlite");
        let env = Environment::open(&file, EnvOptions::default().no_sub_dir(true)).unwrap();
        assert!(file.exists());
        assert_eq!(env.path(), file.canonicalize().unwrap());
    }

    #[test]
    fn missing_directory_fails() {
        let dir = tempdir().unwrap();
        let err = Environment::open(dir.path().join("absent"), EnvOptions::default()).unwrap_err();
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn copy_is_not_supported() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        let err = env.copy(dir.path().join("copy")).unwrap_err();
        assert!(matches!(err, CoreError::NotSupported { .. }));
        assert_eq!(err.code(), crate::error::MDB_INCOMPATIBLE);
    }

    #[test]
    fn transaction_helper_aborts_on_error() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();

        let result: CoreResult<()> = env.transaction(|txn| {
            let db = txn.open_db("t", false)?;
            txn.put(&db, b"k", b"v", crate::WriteFlags::empty())?;
            Err(CoreError::corrupted("forced"))
        });
        assert!(result.is_err());

        let txn = env.begin_ro_txn().unwrap();
        assert!(matches!(txn.open_existing_db("t"), Err(CoreError::NotFound)));
    }
}
