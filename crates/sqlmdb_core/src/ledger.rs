//! Entry count ledger.
//!
//! SQLite has no cheap exact row count, so every database keeps a counter
//! row in [`LEDGER_TABLE`]. The counter is adjusted in the same savepoint
//! as the write that changes the number of records, so it always matches
//! the table after commit or rollback. The row also records whether the
//! database accepts duplicate keys. Rows are keyed by the physical table
//! name, so two names SQLite treats as one table can never hold two
//! counters.

use crate::dbi::Dbi;
use crate::error::{CoreError, CoreResult};
use crate::transaction::Transaction;
use crate::types::Stat;
use sqlmdb_storage::rusqlite::params;
use sqlmdb_storage::rusqlite::types::ValueRef;
use sqlmdb_storage::{Connection, Statement, TableName, LEDGER_TABLE};
use tracing::trace;

pub(crate) fn ensure_table(conn: &Connection) -> CoreResult<()> {
    conn.execute(&Statement::CreateLedger, [])?;
    Ok(())
}

/// Inserts a zero counter for `table` unless one already exists.
pub(crate) fn ensure_counter(
    conn: &Connection,
    table: &TableName,
    duplicates: bool,
) -> CoreResult<()> {
    conn.execute(
        &Statement::EnsureCounter,
        params![table.physical(), duplicates],
    )?;
    Ok(())
}

/// Reads the persisted duplicate policy.
pub(crate) fn read_duplicates(conn: &Connection, table: &TableName) -> CoreResult<bool> {
    let stored = conn.query_optional(&Statement::ReadDuplicates, [table.physical()], |row| {
        row.get::<_, i64>(0)
    })?;
    match stored {
        Some(flag) => Ok(flag != 0),
        None => Err(missing_row(table)),
    }
}

/// Adds `delta` to the counter. A counter that does not exist is corruption.
pub(crate) fn adjust(conn: &Connection, table: &TableName, delta: i64) -> CoreResult<()> {
    let changed = conn.execute(&Statement::AdjustCounter, params![delta, table.physical()])?;
    if changed == 0 {
        return Err(missing_row(table));
    }
    trace!(db = %table, delta, "entry count adjusted");
    Ok(())
}

/// Reads the counter as an unsigned 64-bit count.
pub(crate) fn read_count(conn: &Connection, table: &TableName) -> CoreResult<u64> {
    let stored = conn.query_optional(&Statement::ReadCounter, [table.physical()], |row| {
        Ok(match row.get_ref(0)? {
            ValueRef::Integer(n) => Some(n),
            _ => None,
        })
    })?;

    match stored {
        None => Err(missing_row(table)),
        Some(None) => Err(CoreError::corrupted(format!(
            "entry count for {table} is not an integer"
        ))),
        Some(Some(n)) => u64::try_from(n)
            .map_err(|_| CoreError::corrupted(format!("entry count for {table} is negative: {n}"))),
    }
}

fn missing_row(table: &TableName) -> CoreError {
    CoreError::corrupted(format!("no {LEDGER_TABLE} row for {table}"))
}

impl Transaction<'_> {
    /// Returns statistics for `dbi`.
    ///
    /// # Errors
    ///
    /// Returns `Corrupted` if the ledger row is missing or does not hold a
    /// non-negative integer.
    pub fn stat(&self, dbi: &Dbi) -> CoreResult<Stat> {
        let entries = read_count(self.conn()?, dbi.table())?;
        Ok(Stat { entries })
    }
}
