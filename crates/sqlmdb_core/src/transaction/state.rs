//! Transaction handle.

use crate::env::Environment;
use crate::error::{CoreError, CoreResult};
use crate::transaction::arena::BufferArena;
use bytes::Bytes;
use sqlmdb_storage::{BeginMode, Connection};
use std::cell::RefCell;
use std::marker::PhantomData;
use tracing::{debug, warn};

/// An active transaction.
///
/// A transaction borrows one pooled session for its whole lifetime and
/// gives it back on [`commit`](Self::commit), [`abort`](Self::abort) or
/// drop. Writable transactions hold the database's exclusive lock; at most
/// one exists at a time across every environment on the same file.
///
/// Transactions are not `Send`: the session they hold belongs to the
/// thread that opened it.
pub struct Transaction<'env> {
    env: &'env Environment,
    conn: Option<Connection>,
    writable: bool,
    arena: RefCell<BufferArena>,
    _not_send: PhantomData<*const ()>,
}

impl<'env> Transaction<'env> {
    pub(crate) fn begin(env: &'env Environment, writable: bool) -> CoreResult<Self> {
        if writable && env.options().read_only {
            return Err(CoreError::AccessDenied);
        }

        let conn = env.pool().acquire()?;
        let mode = if writable {
            BeginMode::Exclusive
        } else {
            BeginMode::Read
        };
        if let Err(err) = conn.begin(mode) {
            env.pool().release(conn);
            return Err(err.into());
        }

        debug!(writable, "transaction started");
        Ok(Self {
            env,
            conn: Some(conn),
            writable,
            arena: RefCell::new(BufferArena::default()),
            _not_send: PhantomData,
        })
    }

    /// Returns the environment this transaction belongs to.
    #[must_use]
    pub fn env(&self) -> &'env Environment {
        self.env
    }

    /// Returns true for transactions that may write.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Number of buffers handed out so far.
    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.arena.borrow().len()
    }

    /// Total size of the buffers handed out so far.
    #[must_use]
    pub fn buffered_bytes(&self) -> usize {
        self.arena.borrow().retained_bytes()
    }

    /// Commits every change made by this transaction.
    ///
    /// The session goes back to the pool whether or not the commit
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns the engine's error if the commit fails. Nothing is
    /// committed in that case.
    pub fn commit(mut self) -> CoreResult<()> {
        let conn = self.take_conn()?;
        self.arena.get_mut().clear();

        let result = conn.commit();
        // Release rolls back a session the failed commit left open.
        self.env.pool().release(conn);

        match result {
            Ok(()) => {
                debug!(writable = self.writable, "transaction committed");
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "commit failed");
                Err(err.into())
            }
        }
    }

    /// Discards every change made by this transaction.
    pub fn abort(mut self) {
        self.rollback_and_release();
        debug!(writable = self.writable, "transaction aborted");
    }

    pub(crate) fn conn(&self) -> CoreResult<&Connection> {
        self.conn
            .as_ref()
            .ok_or_else(|| CoreError::panic("transaction has no session"))
    }

    pub(crate) fn require_writable(&self) -> CoreResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(CoreError::AccessDenied)
        }
    }

    pub(crate) fn retain(&self, data: Vec<u8>) -> Bytes {
        self.arena.borrow_mut().retain(data)
    }

    fn take_conn(&mut self) -> CoreResult<Connection> {
        self.conn
            .take()
            .ok_or_else(|| CoreError::panic("transaction already finished"))
    }

    fn rollback_and_release(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        self.arena.get_mut().clear();
        if let Err(err) = conn.rollback() {
            warn!(error = %err, "rollback failed");
        }
        self.env.pool().release(conn);
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if self.conn.is_some() {
            debug!("unfinished transaction dropped; aborting");
            self.rollback_and_release();
        }
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("path", &self.env.path())
            .field("writable", &self.writable)
            .field("active", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::CoreError;
    use crate::{EnvOptions, Environment};
    use std::time::Duration;
    use tempfile::tempdir;

    #[test]
    fn read_and_write_transactions_report_mode() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();

        let ro = env.begin_ro_txn().unwrap();
        assert!(!ro.is_writable());
        ro.abort();

        let rw = env.begin_txn().unwrap();
        assert!(rw.is_writable());
        rw.commit().unwrap();
    }

    #[test]
    fn session_returns_to_pool_on_every_path() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        assert_eq!(env.pool().idle_count(), 1);

        env.begin_txn().unwrap().commit().unwrap();
        assert_eq!(env.pool().idle_count(), 1);

        env.begin_ro_txn().unwrap().abort();
        assert_eq!(env.pool().idle_count(), 1);

        drop(env.begin_txn().unwrap());
        assert_eq!(env.pool().idle_count(), 1);
    }

    #[test]
    fn nested_readers_use_separate_sessions() {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();

        let a = env.begin_ro_txn().unwrap();
        let b = env.begin_ro_txn().unwrap();
        assert_eq!(env.pool().idle_count(), 0);
        a.abort();
        b.abort();
        assert_eq!(env.pool().idle_count(), 2);
    }

    #[test]
    fn second_writer_times_out_busy() {
        let dir = tempdir().unwrap();
        let options = EnvOptions::default().busy_timeout(Duration::from_millis(50));
        let env = Environment::open(dir.path(), options).unwrap();

        let first = env.begin_txn().unwrap();
        let err = env.begin_txn().unwrap_err();
        assert!(matches!(err, CoreError::Storage(ref e) if e.is_busy()));
        first.commit().unwrap();

        // The session used by the failed begin went back to the pool.
        assert_eq!(env.pool().idle_count(), 2);
        env.begin_txn().unwrap().abort();
    }

    #[test]
    fn write_on_read_only_env_is_denied() {
        let dir = tempdir().unwrap();
        Environment::open(dir.path(), EnvOptions::default())
            .unwrap()
            .close()
            .unwrap();

        let env = Environment::open(dir.path(), EnvOptions::default().read_only(true)).unwrap();
        assert!(matches!(env.begin_txn(), Err(CoreError::AccessDenied)));
        env.begin_ro_txn().unwrap().abort();
    }
}
