//! Per-thread connection pool.
//!
//! Each worker thread keeps its own stack of idle sessions. A session is
//! only ever handed back to the thread that opened it, so a SQLite handle
//! never migrates between threads.

use crate::connection::{Connection, ConnectionOptions};
use crate::error::StorageResult;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::thread::{self, ThreadId};
use tracing::{trace, warn};

/// Pool of idle sessions bound to one database file.
#[derive(Debug)]
pub struct ConnectionPool {
    path: PathBuf,
    options: ConnectionOptions,
    idle: Mutex<HashMap<ThreadId, Vec<Connection>>>,
}

impl ConnectionPool {
    /// Creates an empty pool for `path`. No session is opened yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, options: ConnectionOptions) -> Self {
        Self {
            path: path.into(),
            options,
            idle: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the database file the pool opens sessions on.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the options applied to new sessions.
    #[must_use]
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Takes an idle session opened by the current thread, or opens a new one.
    ///
    /// # Errors
    ///
    /// Returns an error if a new session cannot be opened. The pool is left
    /// unchanged.
    pub fn acquire(&self) -> StorageResult<Connection> {
        let me = thread::current().id();
        let reused = self.idle.lock().get_mut(&me).and_then(Vec::pop);
        if let Some(conn) = reused {
            trace!("reusing pooled session");
            return Ok(conn);
        }
        Connection::open(&self.path, &self.options)
    }

    /// Returns a session to the stack of the thread that opened it.
    ///
    /// A session still inside a backing transaction is rolled back first;
    /// one that cannot be rolled back is closed instead of pooled.
    pub fn release(&self, conn: Connection) {
        if conn.in_transaction() {
            if let Err(err) = conn.rollback() {
                warn!(error = %err, "discarding session stuck in a transaction");
                return;
            }
        }
        self.idle.lock().entry(conn.owner()).or_default().push(conn);
    }

    /// Returns the number of idle sessions owned by the current thread.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        let me = thread::current().id();
        self.idle.lock().get(&me).map_or(0, Vec::len)
    }

    /// Closes every idle session.
    ///
    /// # Errors
    ///
    /// Returns the first close failure. Remaining sessions are still dropped.
    pub fn close(self) -> StorageResult<()> {
        let mut first_err = None;
        for conn in self.idle.into_inner().into_values().flatten() {
            if let Err(err) = conn.close() {
                warn!(error = %err, "failed to close pooled session");
                if first_err.is_none() {
                    first_err = Some(err);
                }
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::BeginMode;
    use tempfile::tempdir;

    fn pool() -> (tempfile::TempDir, ConnectionPool) {
        let dir = tempdir().unwrap();
        let pool = ConnectionPool::new(dir.path().join("data.db"), ConnectionOptions::default());
        (dir, pool)
    }

    #[test]
    fn acquire_opens_then_reuses() {
        let (_dir, pool) = pool();
        assert_eq!(pool.idle_count(), 0);

        let conn = pool.acquire().unwrap();
        pool.release(conn);
        assert_eq!(pool.idle_count(), 1);

        let conn = pool.acquire().unwrap();
        assert_eq!(pool.idle_count(), 0);
        pool.release(conn);
        assert_eq!(pool.idle_count(), 1);
    }

    #[test]
    fn stacks_grow_with_concurrent_use() {
        let (_dir, pool) = pool();
        let a = pool.acquire().unwrap();
        let b = pool.acquire().unwrap();
        pool.release(a);
        pool.release(b);
        assert_eq!(pool.idle_count(), 2);
    }

    #[test]
    fn other_threads_never_see_our_sessions() {
        let (_dir, pool) = pool();
        let conn = pool.acquire().unwrap();
        pool.release(conn);

        std::thread::scope(|s| {
            s.spawn(|| {
                assert_eq!(pool.idle_count(), 0);
                let theirs = pool.acquire().unwrap();
                assert_eq!(theirs.owner(), thread::current().id());
                pool.release(theirs);
                assert_eq!(pool.idle_count(), 1);
            });
        });

        assert_eq!(pool.idle_count(), 1);
        let ours = pool.acquire().unwrap();
        assert_eq!(ours.owner(), thread::current().id());
        pool.release(ours);
    }

    #[test]
    fn release_rolls_back_open_transaction() {
        let (_dir, pool) = pool();
        let conn = pool.acquire().unwrap();
        conn.begin(BeginMode::Exclusive).unwrap();
        pool.release(conn);

        let conn = pool.acquire().unwrap();
        assert!(!conn.in_transaction());
        pool.release(conn);
    }

    #[test]
    fn open_failure_leaves_pool_unchanged() {
        let dir = tempdir().unwrap();
        let pool = ConnectionPool::new(
            dir.path().join("missing").join("data.db"),
            ConnectionOptions::default(),
        );
        assert!(pool.acquire().is_err());
        assert_eq!(pool.idle_count(), 0);
    }

    #[test]
    fn close_drains_everything() {
        let (_dir, pool) = pool();
        let conn = pool.acquire().unwrap();
        pool.release(conn);
        pool.close().unwrap();
    }
}
