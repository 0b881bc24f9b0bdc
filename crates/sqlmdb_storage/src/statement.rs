//! Typed SQL statements.
//!
//! Every piece of SQL the crate issues is produced here. Table identifiers
//! come only from a validated [`TableName`]; keys, values and counter deltas
//! are always bound as parameters.
//!
//! Record tables have the shape
//!
//! ```sql
//! CREATE TABLE "kv_<hex name>" (key BLOB NOT NULL, value BLOB NOT NULL [, UNIQUE (key)])
//! ```
//!
//! and cursor scans order rows by `(key, value, rowid)`, which for BLOB
//! columns is byte-lexicographic on key, then value, then insertion order.
//! In a table with unique keys a value can change in place, so stepping
//! from a position there compares the key alone.

use crate::identifier::TableName;

/// Name of the table holding one entry counter per sub-database.
pub const LEDGER_TABLE: &str = "_entry_counts";

/// Columns returned by every cursor scan, in order.
const ROW_COLUMNS: &str = "rowid, key, value";
const ORDER_ASC: &str = "ORDER BY key, value, rowid";
const ORDER_DESC: &str = "ORDER BY key DESC, value DESC, rowid DESC";

/// A statement the storage layer knows how to render.
#[derive(Debug, Clone, Copy)]
pub enum Statement<'a> {
    /// Creates the ledger table if it does not exist.
    CreateLedger,
    /// Creates a record table if it does not exist.
    CreateTable {
        /// Target table.
        table: &'a TableName,
        /// Whether keys are unique (no duplicate support).
        unique_keys: bool,
    },
    /// Creates the `(key, value)` ordering index if it does not exist.
    CreateIndex {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = physical table name. Yields a row when the table exists.
    TableExists,
    /// `?1` = physical table name, `?2` = duplicate flag. Inserts a zero counter if absent.
    EnsureCounter,
    /// `?1` = physical table name. Yields `duplicates`.
    ReadDuplicates,
    /// `?1` = physical table name. Yields `count`.
    ReadCounter,
    /// `?1` = delta, `?2` = physical table name.
    AdjustCounter,
    /// `?1` = key. Yields the lowest value stored under the key.
    SelectValue {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key. Yields the rowid of the first row stored under the key.
    SelectRowId {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key, `?2` = value. Yields a rowid when the exact pair exists.
    SelectPair {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = new value, `?2` = rowid.
    UpdateValue {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key, `?2` = value.
    Insert {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key. Removes every row stored under the key.
    DeleteByKey {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key, `?2` = value. Removes every row holding the exact pair.
    DeleteByPair {
        /// Target table.
        table: &'a TableName,
    },
    /// Smallest row.
    ScanFirst {
        /// Target table.
        table: &'a TableName,
    },
    /// Greatest row.
    ScanLast {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key, `?2` = value, `?3` = rowid. Smallest row after the position.
    ScanAfter {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key, `?2` = value, `?3` = rowid. Greatest row before the position.
    ScanBefore {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key. Smallest row whose key is greater than `?1`.
    ScanAfterKey {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key. Greatest row whose key is less than `?1`.
    ScanBeforeKey {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key. Smallest row whose key is at least `?1`.
    ScanFrom {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key. Smallest row whose key equals `?1`.
    ScanExact {
        /// Target table.
        table: &'a TableName,
    },
    /// `?1` = key, `?2` = value, `?3` = rowid. Next row sharing the key.
    ScanNextDup {
        /// Target table.
        table: &'a TableName,
    },
}

impl Statement<'_> {
    /// Renders the statement as SQL text.
    #[must_use]
    pub fn sql(&self) -> String {
        match *self {
            Self::CreateLedger => format!(
                "CREATE TABLE IF NOT EXISTS {LEDGER_TABLE} (\
                 table_name TEXT PRIMARY KEY, \
                 count INTEGER NOT NULL, \
                 duplicates INTEGER NOT NULL)"
            ),
            Self::CreateTable { table, unique_keys } => {
                let unique = if unique_keys { ", UNIQUE (key)" } else { "" };
                format!(
                    "CREATE TABLE IF NOT EXISTS {} (key BLOB NOT NULL, value BLOB NOT NULL{unique})",
                    table.quoted()
                )
            }
            Self::CreateIndex { table } => format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} (key, value)",
                table.index_quoted(),
                table.quoted()
            ),
            Self::TableExists => {
                "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1".to_owned()
            }
            Self::EnsureCounter => format!(
                "INSERT OR IGNORE INTO {LEDGER_TABLE} (table_name, count, duplicates) \
                 VALUES (?1, 0, ?2)"
            ),
            Self::ReadDuplicates => {
                format!("SELECT duplicates FROM {LEDGER_TABLE} WHERE table_name = ?1")
            }
            Self::ReadCounter => format!("SELECT count FROM {LEDGER_TABLE} WHERE table_name = ?1"),
            Self::AdjustCounter => {
                format!("UPDATE {LEDGER_TABLE} SET count = count + ?1 WHERE table_name = ?2")
            }
            Self::SelectValue { table } => format!(
                "SELECT value FROM {} WHERE key = ?1 ORDER BY value, rowid LIMIT 1",
                table.quoted()
            ),
            Self::SelectRowId { table } => format!(
                "SELECT rowid FROM {} WHERE key = ?1 ORDER BY value, rowid LIMIT 1",
                table.quoted()
            ),
            Self::SelectPair { table } => format!(
                "SELECT rowid FROM {} WHERE key = ?1 AND value = ?2 LIMIT 1",
                table.quoted()
            ),
            Self::UpdateValue { table } => {
                format!("UPDATE {} SET value = ?1 WHERE rowid = ?2", table.quoted())
            }
            Self::Insert { table } => {
                format!("INSERT INTO {} (key, value) VALUES (?1, ?2)", table.quoted())
            }
            Self::DeleteByKey { table } => format!("DELETE FROM {} WHERE key = ?1", table.quoted()),
            Self::DeleteByPair { table } => format!(
                "DELETE FROM {} WHERE key = ?1 AND value = ?2",
                table.quoted()
            ),
            Self::ScanFirst { table } => scan(table, "", ORDER_ASC),
            Self::ScanLast { table } => scan(table, "", ORDER_DESC),
            Self::ScanAfter { table } => {
                scan(table, "WHERE (key, value, rowid) > (?1, ?2, ?3)", ORDER_ASC)
            }
            Self::ScanBefore { table } => {
                scan(table, "WHERE (key, value, rowid) < (?1, ?2, ?3)", ORDER_DESC)
            }
            Self::ScanAfterKey { table } => scan(table, "WHERE key > ?1", ORDER_ASC),
            Self::ScanBeforeKey { table } => scan(table, "WHERE key < ?1", ORDER_DESC),
            Self::ScanFrom { table } => scan(table, "WHERE key >= ?1", ORDER_ASC),
            Self::ScanExact { table } => scan(table, "WHERE key = ?1", ORDER_ASC),
            Self::ScanNextDup { table } => scan(
                table,
                "WHERE key = ?1 AND (value, rowid) > (?2, ?3)",
                ORDER_ASC,
            ),
        }
    }
}

fn scan(table: &TableName, filter: &str, order: &str) -> String {
    let mut sql = format!("SELECT {ROW_COLUMNS} FROM {}", table.quoted());
    if !filter.is_empty() {
        sql.push(' ');
        sql.push_str(filter);
    }
    sql.push(' ');
    sql.push_str(order);
    sql.push_str(" LIMIT 1");
    sql
}
