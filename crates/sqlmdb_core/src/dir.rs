//! Environment location.
//!
//! An environment lives in a single SQLite file:
//!
//! ```text
//! <env_path>/
//! └─ data.db        # records, ordering indexes and the entry count ledger
//! ```
//!
//! With `no_sub_dir` the environment path names that file directly.

use crate::error::{CoreError, CoreResult};
use std::io;
use std::path::{Path, PathBuf};

/// File name used inside an environment directory.
pub const DATA_FILE: &str = "data.db";

/// Resolves the canonical database file for an environment path.
///
/// Without `no_sub_dir` the path must already exist. An existing directory
/// holds [`DATA_FILE`]; an existing file is used as is. With `no_sub_dir`
/// the file itself may be missing, but its parent directory must exist.
///
/// # Errors
///
/// Returns an I/O error (`ENOENT` for a missing path) or `BadValSize` if
/// the path has no file name component.
pub fn resolve(path: &Path, no_sub_dir: bool) -> CoreResult<PathBuf> {
    if no_sub_dir {
        let file_name = path
            .file_name()
            .ok_or_else(|| CoreError::bad_val_size(format!("{} names no file", path.display())))?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let parent = parent.canonicalize()?;
        return Ok(parent.join(file_name));
    }

    let canonical = path.canonicalize()?;
    if canonical.is_dir() {
        Ok(canonical.join(DATA_FILE))
    } else if canonical.is_file() {
        Ok(canonical)
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{} is neither a file nor a directory", canonical.display()),
        )
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn directory_gets_data_file() {
        let dir = tempdir().unwrap();
        let resolved = resolve(dir.path(), false).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join(DATA_FILE));
    }

    #[test]
    fn existing_file_is_used_directly() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("custom.sqlite");
        std::fs::write(&file, b"").unwrap();
        assert_eq!(resolve(&file, false).unwrap(), file.canonicalize().unwrap());
    }

    #[test]
    fn missing_path_is_enoent() {
        let dir = tempdir().unwrap();
        let err = resolve(&dir.path().join("nope"), false).unwrap_err();
        assert!(matches!(err, CoreError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }

    #[test]
    fn no_sub_dir_allows_missing_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("env.db");
        let resolved = resolve(&target, true).unwrap();
        assert_eq!(resolved, dir.path().canonicalize().unwrap().join("env.db"));
    }

    #[test]
    fn no_sub_dir_requires_parent() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("missing").join("env.db");
        assert!(resolve(&target, true).is_err());
    }
}
