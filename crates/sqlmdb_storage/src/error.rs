//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Generic SQLite failure code, used when the engine reports no code of its own.
pub const SQLITE_ERROR: i32 = 1;

/// Errors that can occur while talking to the relational engine.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The engine rejected a call. Carries the engine's own error verbatim.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// An I/O error occurred outside the engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A table identifier failed validation before reaching SQL.
    #[error("invalid table name {name:?}: {reason}")]
    InvalidIdentifier {
        /// The rejected name.
        name: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The engine accepted a pragma but reported a different setting back.
    #[error("pragma {pragma} reported {actual:?}, expected {expected:?}")]
    PragmaMismatch {
        /// Pragma name.
        pragma: &'static str,
        /// Requested value.
        expected: String,
        /// Value the engine reported.
        actual: String,
    },
}

impl StorageError {
    /// Creates an invalid identifier error.
    pub fn invalid_identifier(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidIdentifier {
            name: name.into(),
            reason,
        }
    }

    /// Returns the numeric code reported to callers of the C surface.
    ///
    /// Engine failures keep their extended result code; I/O failures keep
    /// their OS error number.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => err.extended_code,
            Self::Sqlite(_) => SQLITE_ERROR,
            Self::Io(err) => err.raw_os_error().unwrap_or(SQLITE_ERROR),
            Self::InvalidIdentifier { .. } | Self::PragmaMismatch { .. } => SQLITE_ERROR,
        }
    }

    /// Returns true if the engine gave up waiting for a lock.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _))
                if matches!(
                    err.code,
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
                )
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_failure_keeps_extended_code() {
        let err = StorageError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            None,
        ));
        assert_eq!(err.code(), rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE);
        assert!(!err.is_busy());
    }

    #[test]
    fn busy_is_detected() {
        let err = StorageError::Sqlite(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ));
        assert!(err.is_busy());
        assert_eq!(err.code(), rusqlite::ffi::SQLITE_BUSY);
    }

    #[test]
    fn io_error_keeps_os_code() {
        let err = StorageError::Io(io::Error::from_raw_os_error(2));
        assert_eq!(err.code(), 2);
    }

    #[test]
    fn identifier_error_message() {
        let err = StorageError::invalid_identifier("", "name is empty");
        assert_eq!(err.to_string(), "invalid table name \"\": name is empty");
    }
}
