//! Validated table identifiers.
//!
//! Sub-database names are caller-supplied strings. They never reach SQL text
//! directly: a [`TableName`] validates the logical name and derives the
//! physical table and index names from the hex encoding of its bytes.
//! SQLite folds ASCII case in identifiers, and tables share one namespace
//! with indexes, so the physical names must be lowercase and injective.

use crate::error::{StorageError, StorageResult};
use std::fmt;

/// Prefix of every physical sub-database table.
///
/// Keeps user tables disjoint from the ledger and from `sqlite_` internals.
const TABLE_PREFIX: &str = "kv_";

/// Prefix of the ordering index created alongside each table.
const INDEX_PREFIX: &str = "ix_";

/// Longest accepted logical name, in bytes.
pub const MAX_NAME_LEN: usize = 511;

/// A validated sub-database table identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    logical: String,
    encoded: String,
}

impl TableName {
    /// Validates a logical sub-database name.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidIdentifier`] if the name is empty,
    /// longer than [`MAX_NAME_LEN`] bytes, or contains a NUL byte.
    pub fn new(name: &str) -> StorageResult<Self> {
        if name.is_empty() {
            return Err(StorageError::invalid_identifier(name, "name is empty"));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(StorageError::invalid_identifier(name, "name is too long"));
        }
        if name.contains('\0') {
            return Err(StorageError::invalid_identifier(name, "name contains NUL"));
        }

        Ok(Self {
            logical: name.to_owned(),
            encoded: hex_encode(name.as_bytes()),
        })
    }

    /// Returns the caller-facing name.
    #[must_use]
    pub fn logical(&self) -> &str {
        &self.logical
    }

    /// Returns the unquoted physical table name. The ledger is keyed by it.
    #[must_use]
    pub fn physical(&self) -> String {
        format!("{TABLE_PREFIX}{}", self.encoded)
    }

    /// Returns the table as a quoted SQL identifier.
    #[must_use]
    pub fn quoted(&self) -> String {
        quote(&self.physical())
    }

    /// Returns the ordering index as a quoted SQL identifier.
    #[must_use]
    pub fn index_quoted(&self) -> String {
        quote(&format!("{INDEX_PREFIX}{}", self.encoded))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.logical)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn quote(ident: &str) -> String {
    let mut out = String::with_capacity(ident.len() + 2);
    out.push('"');
    for ch in ident.chars() {
        if ch == '"' {
            out.push('"');
        }
        out.push(ch);
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_name_is_hex_encoded_and_quoted() {
        let table = TableName::new("ab").unwrap();
        assert_eq!(table.logical(), "ab");
        assert_eq!(table.physical(), "kv_6162");
        assert_eq!(table.quoted(), "\"kv_6162\"");
        assert_eq!(table.index_quoted(), "\"ix_6162\"");
    }

    #[test]
    fn sql_text_never_reaches_identifier() {
        let table = TableName::new("a\"; DROP TABLE x; --").unwrap();
        let quoted = table.quoted();
        assert!(quoted[1..quoted.len() - 1]
            .chars()
            .all(|c| c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit()));
    }

    #[test]
    fn case_variants_get_distinct_tables() {
        let upper = TableName::new("Accounts").unwrap();
        let lower = TableName::new("accounts").unwrap();
        assert_ne!(
            upper.physical().to_ascii_lowercase(),
            lower.physical().to_ascii_lowercase()
        );
    }

    #[test]
    fn index_names_never_match_table_names() {
        let a = TableName::new("a").unwrap();
        let a_order = TableName::new("a_order").unwrap();
        for table in [&a, &a_order] {
            assert!(table.index_quoted().starts_with("\"ix_"));
            assert_ne!(a.index_quoted(), table.quoted());
            assert_ne!(a_order.index_quoted(), table.quoted());
        }
    }

    #[test]
    fn multibyte_names_encode_every_byte() {
        let table = TableName::new("é").unwrap();
        assert_eq!(table.physical(), "kv_c3a9");
    }

    #[test]
    fn empty_name_rejected() {
        assert!(matches!(
            TableName::new(""),
            Err(StorageError::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn nul_rejected() {
        assert!(TableName::new("a\0b").is_err());
    }

    #[test]
    fn overlong_name_rejected() {
        let name = "x".repeat(MAX_NAME_LEN + 1);
        assert!(TableName::new(&name).is_err());
        assert!(TableName::new(&name[..MAX_NAME_LEN]).is_ok());
    }

    #[test]
    fn display_shows_logical_name() {
        let table = TableName::new("tags").unwrap();
        assert_eq!(format!("{table}"), "tags");
    }
}
