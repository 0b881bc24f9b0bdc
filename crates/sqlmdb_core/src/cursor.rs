//! Ordered cursors.
//!
//! A cursor walks one database in `(key, value, insertion order)` order.
//! It keeps no engine state between calls: each move is a single indexed
//! query relative to the last row it landed on, so the cursor never holds
//! a statement open across calls and sees the transaction's own writes.

use crate::dbi::Dbi;
use crate::error::{CoreError, CoreResult};
use crate::kv::blob_column;
use crate::transaction::Transaction;
use crate::types::{CursorOp, Record, WriteFlags};
use bytes::Bytes;
use sqlmdb_storage::rusqlite::{params, Params};
use sqlmdb_storage::Statement;
use tracing::trace;

#[derive(Debug, Clone)]
struct RowPosition {
    rowid: i64,
    key: Bytes,
    value: Bytes,
}

impl RowPosition {
    fn record(&self) -> Record {
        Record {
            key: self.key.clone(),
            value: self.value.clone(),
        }
    }
}

#[derive(Debug, Clone)]
enum Position {
    /// Freshly opened; no move has happened yet.
    Unset,
    At(RowPosition),
    /// Ran off an end of the database.
    Exhausted,
}

/// A cursor over one database inside a transaction.
#[derive(Debug)]
pub struct Cursor<'txn> {
    txn: &'txn Transaction<'txn>,
    dbi: Dbi,
    position: Position,
}

impl<'env> Transaction<'env> {
    /// Opens a cursor on `dbi`. The cursor starts unpositioned.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction has already lost its session.
    pub fn open_cursor<'txn>(&'txn self, dbi: &Dbi) -> CoreResult<Cursor<'txn>>
    where
        'env: 'txn,
    {
        self.conn()?;
        trace!(db = dbi.name(), "cursor opened");
        Ok(Cursor {
            txn: self,
            dbi: dbi.clone(),
            position: Position::Unset,
        })
    }
}

impl<'txn> Cursor<'txn> {
    /// Returns the database this cursor walks.
    #[must_use]
    pub fn dbi(&self) -> &Dbi {
        &self.dbi
    }

    /// Moves to the smallest record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the database is empty.
    pub fn first(&mut self) -> CoreResult<Record> {
        let table = self.dbi.table();
        let row = self.fetch(&Statement::ScanFirst { table }, [])?;
        self.land(row)
    }

    /// Moves to the greatest record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the database is empty.
    pub fn last(&mut self) -> CoreResult<Record> {
        let table = self.dbi.table();
        let row = self.fetch(&Statement::ScanLast { table }, [])?;
        self.land(row)
    }

    /// Advances one record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` from an unpositioned cursor, and when the end is
    /// reached; the cursor is then exhausted.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> CoreResult<Record> {
        let Position::At(at) = &self.position else {
            return Err(CoreError::NotFound);
        };
        let table = self.dbi.table();
        let row = if self.dbi.allow_duplicates() {
            self.fetch(
                &Statement::ScanAfter { table },
                params![&at.key[..], &at.value[..], at.rowid],
            )?
        } else {
            // The value under a unique key may have been replaced since.
            self.fetch(&Statement::ScanAfterKey { table }, params![&at.key[..]])?
        };
        self.land(row)
    }

    /// Steps back one record.
    ///
    /// From an exhausted cursor this moves to the last record.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` from an unpositioned cursor, and at the first
    /// record, where the position is kept.
    pub fn prev(&mut self) -> CoreResult<Record> {
        if matches!(self.position, Position::Exhausted) {
            return self.last();
        }
        let Position::At(at) = &self.position else {
            return Err(CoreError::NotFound);
        };
        let table = self.dbi.table();
        let row = if self.dbi.allow_duplicates() {
            self.fetch(
                &Statement::ScanBefore { table },
                params![&at.key[..], &at.value[..], at.rowid],
            )?
        } else {
            self.fetch(&Statement::ScanBeforeKey { table }, params![&at.key[..]])?
        };
        self.stay_or_move(row)
    }

    /// Advances to the next record with the current key.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the cursor is not on a record or no further
    /// record shares its key; the position is kept.
    pub fn next_dup(&mut self) -> CoreResult<Record> {
        let Position::At(at) = &self.position else {
            return Err(CoreError::NotFound);
        };
        let table = self.dbi.table();
        let row = self.fetch(
            &Statement::ScanNextDup { table },
            params![&at.key[..], &at.value[..], at.rowid],
        )?;
        self.stay_or_move(row)
    }

    /// Positions at the smallest record whose key is at least `key`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if every key is smaller; the cursor is then
    /// exhausted.
    pub fn seek(&mut self, key: &[u8]) -> CoreResult<()> {
        let table = self.dbi.table();
        let row = self.fetch(&Statement::ScanFrom { table }, params![key])?;
        self.land(row).map(|_| ())
    }

    /// Positions at the first record with exactly `key`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is absent; the position is kept.
    pub fn set(&mut self, key: &[u8]) -> CoreResult<Record> {
        let table = self.dbi.table();
        let row = self.fetch(&Statement::ScanExact { table }, params![key])?;
        self.stay_or_move(row)
    }

    /// Returns the record under the cursor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the cursor is unpositioned or exhausted.
    pub fn current(&self) -> CoreResult<Record> {
        match &self.position {
            Position::At(at) => Ok(at.record()),
            Position::Unset | Position::Exhausted => Err(CoreError::NotFound),
        }
    }

    /// Performs a positioning operation.
    ///
    /// `SetRange` positions like [`seek`](Self::seek) and then returns the
    /// record landed on.
    ///
    /// # Errors
    ///
    /// Returns `BadValSize` if a keyed operation is given no key, otherwise
    /// whatever the underlying move returns.
    pub fn get(&mut self, op: CursorOp, key: Option<&[u8]>) -> CoreResult<Record> {
        let key = match (op.takes_key(), key) {
            (true, None) => {
                return Err(CoreError::bad_val_size(format!("{op:?} requires a key")));
            }
            (_, key) => key.unwrap_or_default(),
        };

        match op {
            CursorOp::First => self.first(),
            CursorOp::Last => self.last(),
            CursorOp::Next => self.next(),
            CursorOp::Prev => self.prev(),
            CursorOp::NextDup => self.next_dup(),
            CursorOp::GetCurrent => self.current(),
            CursorOp::Set | CursorOp::SetKey => self.set(key),
            CursorOp::SetRange => {
                self.seek(key)?;
                self.current()
            }
        }
    }

    /// Stores a record through the cursor's transaction.
    ///
    /// # Errors
    ///
    /// See [`Transaction::put`].
    pub fn put(&self, key: &[u8], value: &[u8], flags: WriteFlags) -> CoreResult<()> {
        self.txn.put(&self.dbi, key, value, flags)
    }

    /// Closes the cursor. Records and the transaction are unaffected.
    pub fn close(self) {
        trace!(db = self.dbi.name(), "cursor closed");
    }

    fn fetch<P: Params>(
        &self,
        statement: &Statement<'_>,
        params: P,
    ) -> CoreResult<Option<RowPosition>> {
        type RawRow = (i64, Vec<u8>, Vec<u8>);

        let conn = self.txn.conn()?;
        let raw = conn.with_statement(statement, |stmt| -> CoreResult<Option<RawRow>> {
            let mut rows = stmt.query(params)?;
            let Some(row) = rows.next()? else {
                return Ok(None);
            };
            let rowid: i64 = row.get(0)?;
            let key = blob_column(row.get_ref(1)?, "key")?;
            let value = blob_column(row.get_ref(2)?, "value")?;
            Ok(Some((rowid, key, value)))
        })?;

        Ok(raw.map(|(rowid, key, value)| RowPosition {
            rowid,
            key: self.txn.retain(key),
            value: self.txn.retain(value),
        }))
    }

    /// Moves to `row`, or becomes exhausted if there is none.
    fn land(&mut self, row: Option<RowPosition>) -> CoreResult<Record> {
        match row {
            Some(at) => {
                let record = at.record();
                trace!(db = self.dbi.name(), rowid = at.rowid, "cursor moved");
                self.position = Position::At(at);
                Ok(record)
            }
            None => {
                self.position = Position::Exhausted;
                Err(CoreError::NotFound)
            }
        }
    }

    /// Moves to `row`, or keeps the current position if there is none.
    fn stay_or_move(&mut self, row: Option<RowPosition>) -> CoreResult<Record> {
        match row {
            Some(_) => self.land(row),
            None => Err(CoreError::NotFound),
        }
    }
}
