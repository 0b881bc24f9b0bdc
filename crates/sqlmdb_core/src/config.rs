//! Environment configuration.

use sqlmdb_storage::{ConnectionOptions, JournalMode, DEFAULT_BUSY_TIMEOUT};
use std::time::Duration;

/// Options for opening an [`Environment`](crate::Environment).
#[derive(Debug, Clone)]
pub struct EnvOptions {
    /// Treat the path as the database file instead of a directory.
    pub no_sub_dir: bool,

    /// Open read-only. Writable transactions are refused.
    pub read_only: bool,

    /// Maximum number of named databases. Accepted, not enforced.
    pub max_dbs: u32,

    /// Memory map size. Accepted and ignored; the engine sizes itself.
    pub map_size: u64,

    /// How long a begin or statement waits on a lock before failing busy.
    pub busy_timeout: Duration,

    /// Journal mode for every session.
    pub journal_mode: JournalMode,
}

impl Default for EnvOptions {
    fn default() -> Self {
        Self {
            no_sub_dir: false,
            read_only: false,
            max_dbs: 0,
            map_size: 10 * 1024 * 1024, // LMDB's default map size
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
            journal_mode: JournalMode::Wal,
        }
    }
}

impl EnvOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether the path names the database file itself.
    #[must_use]
    pub const fn no_sub_dir(mut self, value: bool) -> Self {
        self.no_sub_dir = value;
        self
    }

    /// Sets read-only mode.
    #[must_use]
    pub const fn read_only(mut self, value: bool) -> Self {
        self.read_only = value;
        self
    }

    /// Sets the maximum number of named databases.
    #[must_use]
    pub const fn max_dbs(mut self, value: u32) -> Self {
        self.max_dbs = value;
        self
    }

    /// Sets the map size.
    #[must_use]
    pub const fn map_size(mut self, value: u64) -> Self {
        self.map_size = value;
        self
    }

    /// Sets the lock wait bound.
    #[must_use]
    pub const fn busy_timeout(mut self, value: Duration) -> Self {
        self.busy_timeout = value;
        self
    }

    /// Sets the journal mode.
    #[must_use]
    pub const fn journal_mode(mut self, value: JournalMode) -> Self {
        self.journal_mode = value;
        self
    }

    pub(crate) fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            busy_timeout: self.busy_timeout,
            journal_mode: self.journal_mode,
            read_only: self.read_only,
        }
    }
}
