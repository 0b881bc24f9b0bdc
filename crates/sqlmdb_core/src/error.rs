//! Error types for SQLMDB core.
//!
//! Every failure carries the numeric code an LMDB caller expects, available
//! through [`CoreError::code`].

use sqlmdb_storage::StorageError;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Successful result.
pub const MDB_SUCCESS: i32 = 0;
/// Key/data pair already exists.
pub const MDB_KEYEXIST: i32 = -30799;
/// Key/data pair not found.
pub const MDB_NOTFOUND: i32 = -30798;
/// Located page was wrong type; stored data does not match expectations.
pub const MDB_CORRUPTED: i32 = -30796;
/// Update of meta page failed or environment had fatal error.
pub const MDB_PANIC: i32 = -30795;
/// Operation and DB incompatible.
pub const MDB_INCOMPATIBLE: i32 = -30784;
/// Unsupported size of key/DB name/data, or wrong DUPFIXED size.
pub const MDB_BAD_VALSIZE: i32 = -30781;
/// Permission denied.
pub const EACCES: i32 = 13;

/// Errors surfaced by environments, transactions and cursors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No matching key, pair or sub-database.
    #[error("not found")]
    NotFound,

    /// A write would overwrite data the caller asked to keep.
    #[error("key/data pair already exists")]
    KeyExist,

    /// A write was attempted through a read-only transaction or environment.
    #[error("permission denied")]
    AccessDenied,

    /// Stored data does not have the shape this layer writes.
    #[error("corrupted: {message}")]
    Corrupted {
        /// Description of the inconsistency.
        message: String,
    },

    /// The environment cannot continue.
    #[error("fatal error: {message}")]
    Panic {
        /// Description of the failure.
        message: String,
    },

    /// The operation exists for compatibility but is not implemented.
    #[error("{operation} is not supported")]
    NotSupported {
        /// Name of the operation.
        operation: &'static str,
    },

    /// A key, value or sub-database name has an unusable size or content.
    #[error("bad value size: {message}")]
    BadValSize {
        /// What was wrong with it.
        message: String,
    },

    /// The relational engine failed. Its code is passed through.
    #[error(transparent)]
    Storage(StorageError),

    /// I/O error outside the engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl CoreError {
    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted {
            message: message.into(),
        }
    }

    /// Creates a fatal environment error.
    pub fn panic(message: impl Into<String>) -> Self {
        Self::Panic {
            message: message.into(),
        }
    }

    /// Creates a bad value size error.
    pub fn bad_val_size(message: impl Into<String>) -> Self {
        Self::BadValSize {
            message: message.into(),
        }
    }

    /// Creates a not supported error.
    pub fn not_supported(operation: &'static str) -> Self {
        Self::NotSupported { operation }
    }

    /// Returns the LMDB-compatible numeric code for this error.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::NotFound => MDB_NOTFOUND,
            Self::KeyExist => MDB_KEYEXIST,
            Self::AccessDenied => EACCES,
            Self::Corrupted { .. } => MDB_CORRUPTED,
            Self::Panic { .. } => MDB_PANIC,
            Self::NotSupported { .. } => MDB_INCOMPATIBLE,
            Self::BadValSize { .. } => MDB_BAD_VALSIZE,
            Self::Storage(err) => err.code(),
            Self::Io(err) => err.raw_os_error().unwrap_or(sqlmdb_storage::SQLITE_ERROR),
        }
    }

    /// Returns true for [`CoreError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidIdentifier { name, reason } => {
                Self::bad_val_size(format!("database name {name:?}: {reason}"))
            }
            other => Self::Storage(other),
        }
    }
}

impl From<sqlmdb_storage::rusqlite::Error> for CoreError {
    fn from(err: sqlmdb_storage::rusqlite::Error) -> Self {
        Self::Storage(StorageError::Sqlite(err))
    }
}
