//! Named databases.

use crate::error::{CoreError, CoreResult};
use crate::ledger;
use crate::transaction::Transaction;
use sqlmdb_storage::{Statement, TableName};
use tracing::{debug, warn};

/// Handle to a named database.
///
/// A handle is only a name plus the database's duplicate policy. It holds
/// no session and stays valid across transactions of the same
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dbi {
    table: TableName,
    allow_duplicates: bool,
}

impl Dbi {
    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.table.logical()
    }

    /// Returns true if the database stores several values per key.
    #[must_use]
    pub fn allow_duplicates(&self) -> bool {
        self.allow_duplicates
    }

    /// Releases the handle. The database and its records remain.
    pub fn close(self) {}

    pub(crate) fn table(&self) -> &TableName {
        &self.table
    }
}

impl Transaction<'_> {
    /// Opens a named database, creating it in a writable transaction.
    ///
    /// The duplicate policy is fixed when the database is first created;
    /// reopening with a different `allow_duplicates` keeps the stored one.
    ///
    /// # Errors
    ///
    /// Returns `BadValSize` for an unusable name, and `NotFound` in a
    /// read-only transaction when the database does not exist.
    pub fn open_db(&self, name: &str, allow_duplicates: bool) -> CoreResult<Dbi> {
        if !self.is_writable() {
            return self.open_existing_db(name);
        }

        let table = TableName::new(name)?;
        let conn = self.conn()?;
        conn.savepoint(|conn| -> CoreResult<()> {
            conn.execute(
                &Statement::CreateTable {
                    table: &table,
                    unique_keys: !allow_duplicates,
                },
                [],
            )?;
            conn.execute(&Statement::CreateIndex { table: &table }, [])?;
            ledger::ensure_counter(conn, &table, allow_duplicates)
        })?;

        let stored = ledger::read_duplicates(conn, &table)?;
        if stored != allow_duplicates {
            warn!(
                db = %table,
                requested = allow_duplicates,
                stored,
                "duplicate policy is fixed at creation; keeping stored policy"
            );
        }

        debug!(db = %table, allow_duplicates = stored, "database opened");
        Ok(Dbi {
            table,
            allow_duplicates: stored,
        })
    }

    /// Opens a named database that must already exist.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the database does not exist, `BadValSize`
    /// for an unusable name.
    pub fn open_existing_db(&self, name: &str) -> CoreResult<Dbi> {
        let table = TableName::new(name)?;
        let conn = self.conn()?;
        let exists = conn
            .query_optional(&Statement::TableExists, [table.physical()], |_| Ok(()))?
            .is_some();
        if !exists {
            return Err(CoreError::NotFound);
        }

        let allow_duplicates = ledger::read_duplicates(conn, &table)?;
        debug!(db = %table, allow_duplicates, "database attached");
        Ok(Dbi {
            table,
            allow_duplicates,
        })
    }

    /// Empties or deletes a database. Not supported.
    ///
    /// # Errors
    ///
    /// Always returns `NotSupported`.
    pub fn drop_db(&self, _dbi: &Dbi, _delete: bool) -> CoreResult<()> {
        Err(CoreError::not_supported("drop database"))
    }
}
