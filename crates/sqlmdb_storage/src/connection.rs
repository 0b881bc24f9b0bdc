//! A single SQLite session.

use crate::error::{StorageError, StorageResult};
use crate::statement::Statement;
use rusqlite::OpenFlags;
use std::path::Path;
use std::thread::{self, ThreadId};
use std::time::Duration;
use tracing::{trace, warn};

/// Savepoint wrapped around every individual write.
const WRITE_SAVEPOINT: &str = "sqlmdb_write";

/// Default time a session waits on a lock before reporting busy.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Journal mode applied to every new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JournalMode {
    /// Write-ahead logging. Readers proceed alongside a writer.
    #[default]
    Wal,
    /// Rollback journal. A writer excludes readers.
    Delete,
}

impl JournalMode {
    /// Returns the pragma value, as the engine reports it back.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// How a session is opened.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Lock wait bound.
    pub busy_timeout: Duration,
    /// Journal mode requested on open.
    pub journal_mode: JournalMode,
    /// Open the file read-only.
    pub read_only: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            journal_mode: JournalMode::default(),
            read_only: false,
        }
    }
}

/// How a backing transaction is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginMode {
    /// Deferred begin followed by a read that pins the snapshot.
    Read,
    /// Exclusive begin; at most one at a time per database file.
    Exclusive,
}

/// A SQLite session tagged with the thread that opened it.
pub struct Connection {
    inner: rusqlite::Connection,
    owner: ThreadId,
}

impl Connection {
    /// Opens a session on `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened, or if the engine does
    /// not accept the requested journal mode.
    pub fn open(path: &Path, options: &ConnectionOptions) -> StorageResult<Self> {
        let mut flags = OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if options.read_only {
            flags |= OpenFlags::SQLITE_OPEN_READ_ONLY;
        } else {
            flags |= OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        }

        let inner = rusqlite::Connection::open_with_flags(path, flags)?;
        inner.busy_timeout(options.busy_timeout)?;

        if !options.read_only {
            let expected = options.journal_mode.as_str();
            let actual: String =
                inner.pragma_update_and_check(None, "journal_mode", expected, |row| row.get(0))?;
            if !actual.eq_ignore_ascii_case(expected) {
                return Err(StorageError::PragmaMismatch {
                    pragma: "journal_mode",
                    expected: expected.to_owned(),
                    actual,
                });
            }
        }

        trace!(path = %path.display(), read_only = options.read_only, "opened session");
        Ok(Self {
            inner,
            owner: thread::current().id(),
        })
    }

    /// Returns the thread that opened this session.
    #[must_use]
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Returns true while a backing transaction is open.
    #[must_use]
    pub fn in_transaction(&self) -> bool {
        !self.inner.is_autocommit()
    }

    /// Starts a backing transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine's error, typically busy, if the begin cannot
    /// complete within the busy timeout. No transaction is left open.
    pub fn begin(&self, mode: BeginMode) -> StorageResult<()> {
        match mode {
            BeginMode::Exclusive => self.inner.execute_batch("BEGIN EXCLUSIVE")?,
            BeginMode::Read => {
                self.inner.execute_batch("BEGIN DEFERRED")?;
                let pinned = self
                    .inner
                    .query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                        row.get::<_, i64>(0)
                    });
                if let Err(err) = pinned {
                    if let Err(rollback) = self.inner.execute_batch("ROLLBACK") {
                        warn!(error = %rollback, "rollback after failed snapshot read");
                    }
                    return Err(err.into());
                }
            }
        }
        Ok(())
    }

    /// Commits the backing transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the commit fails. The session may still
    /// be inside the transaction afterwards; see [`Self::in_transaction`].
    pub fn commit(&self) -> StorageResult<()> {
        self.inner.execute_batch("COMMIT")?;
        Ok(())
    }

    /// Rolls back the backing transaction.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the rollback fails.
    pub fn rollback(&self) -> StorageResult<()> {
        self.inner.execute_batch("ROLLBACK")?;
        Ok(())
    }

    /// Prepares `statement`, hands it to `f`, then finalizes it.
    ///
    /// The first failure wins. A finalize failure replaces a successful
    /// result but never an earlier error.
    ///
    /// # Errors
    ///
    /// Returns the prepare, closure or finalize error.
    pub fn with_statement<T, E, F>(&self, statement: &Statement<'_>, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&mut rusqlite::Statement<'_>) -> Result<T, E>,
    {
        let sql = statement.sql();
        let mut prepared = self
            .inner
            .prepare(&sql)
            .map_err(|err| E::from(StorageError::from(err)))?;
        let result = f(&mut prepared);
        let finalized = prepared.finalize();

        match (result, finalized) {
            (Err(err), _) => Err(err),
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(err)) => Err(E::from(StorageError::from(err))),
        }
    }

    /// Executes a statement and returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns the engine's error.
    pub fn execute<P: rusqlite::Params>(
        &self,
        statement: &Statement<'_>,
        params: P,
    ) -> StorageResult<usize> {
        self.with_statement(statement, |stmt| {
            stmt.execute(params).map_err(StorageError::from)
        })
    }

    /// Runs a query expected to return at most one row.
    ///
    /// # Errors
    ///
    /// Returns the engine's error, or the error produced by `map`.
    pub fn query_optional<T, P, F>(
        &self,
        statement: &Statement<'_>,
        params: P,
        map: F,
    ) -> StorageResult<Option<T>>
    where
        P: rusqlite::Params,
        F: FnOnce(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
    {
        self.with_statement(statement, |stmt| {
            let mut rows = stmt.query(params)?;
            match rows.next()? {
                Some(row) => Ok(Some(map(row)?)),
                None => Ok(None),
            }
        })
    }

    /// Runs `f` inside a savepoint.
    ///
    /// On success the savepoint is released. On failure every change made
    /// by `f` is rolled back before the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`, or the engine's error if the
    /// savepoint cannot be opened or released.
    pub fn savepoint<T, E, F>(&self, f: F) -> Result<T, E>
    where
        E: From<StorageError>,
        F: FnOnce(&Self) -> Result<T, E>,
    {
        self.inner
            .execute_batch(&format!("SAVEPOINT {WRITE_SAVEPOINT}"))
            .map_err(|err| E::from(StorageError::from(err)))?;

        match f(self) {
            Ok(value) => {
                self.inner
                    .execute_batch(&format!("RELEASE {WRITE_SAVEPOINT}"))
                    .map_err(|err| E::from(StorageError::from(err)))?;
                Ok(value)
            }
            Err(err) => {
                let undo = format!("ROLLBACK TO {WRITE_SAVEPOINT}; RELEASE {WRITE_SAVEPOINT}");
                if let Err(rollback) = self.inner.execute_batch(&undo) {
                    warn!(error = %rollback, "failed to roll back write savepoint");
                }
                Err(err)
            }
        }
    }

    /// Closes the session.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the session cannot be closed cleanly.
    pub fn close(self) -> StorageResult<()> {
        self.inner.close().map_err(|(_, err)| err.into())
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("owner", &self.owner)
            .field("in_transaction", &self.in_transaction())
            .finish_non_exhaustive()
    }
}
