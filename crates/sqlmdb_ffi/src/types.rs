//! Type definitions for FFI.
//!
//! Layouts and constant values follow `lmdb.h` so existing C callers link
//! against this library unchanged.

#![allow(non_camel_case_types)]

use parking_lot::Mutex;
use sqlmdb_core::{Cursor, Dbi, EnvOptions, Environment, Transaction};
use std::ffi::{c_int, c_uint, c_void};

/// Handle to a named database.
pub type MDB_dbi = c_uint;

/// Cursor operation selector.
pub type MDB_cursor_op = c_int;

/// Unix file mode passed to `mdb_env_open`. Ignored.
pub type mdb_mode_t = u32;

/// Environment flag: the path names the database file, not a directory.
pub const MDB_NOSUBDIR: c_uint = 0x4000;
/// Environment and transaction flag: read-only.
pub const MDB_RDONLY: c_uint = 0x20000;

/// Database flag: keys may hold several values.
pub const MDB_DUPSORT: c_uint = 0x04;
/// Database flag: create the database if it does not exist.
pub const MDB_CREATE: c_uint = 0x40000;

/// Write flag: fail if the key exists.
pub const MDB_NOOVERWRITE: c_uint = 0x10;
/// Write flag: fail if the key/value pair exists.
pub const MDB_NODUPDATA: c_uint = 0x20;

/// Position at the first record.
pub const MDB_FIRST: MDB_cursor_op = 0;
/// Return the current record.
pub const MDB_GET_CURRENT: MDB_cursor_op = 4;
/// Position at the last record.
pub const MDB_LAST: MDB_cursor_op = 6;
/// Advance one record.
pub const MDB_NEXT: MDB_cursor_op = 8;
/// Advance to the next value of the current key.
pub const MDB_NEXT_DUP: MDB_cursor_op = 9;
/// Step back one record.
pub const MDB_PREV: MDB_cursor_op = 12;
/// Position at the given key.
pub const MDB_SET: MDB_cursor_op = 15;
/// Position at the given key, returning key and value.
pub const MDB_SET_KEY: MDB_cursor_op = 16;
/// Position at the first key greater than or equal to the given key.
pub const MDB_SET_RANGE: MDB_cursor_op = 17;

/// First handle value given to a named database.
pub(crate) const FIRST_DBI: MDB_dbi = 2;

/// A byte string passed in or out of the library.
///
/// Output values point into the transaction's arena and stay valid until
/// the transaction commits or aborts.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MDB_val {
    /// Length in bytes.
    pub mv_size: usize,
    /// Pointer to the first byte.
    pub mv_data: *mut c_void,
}

impl MDB_val {
    /// Creates a value pointing at `bytes`.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            mv_size: bytes.len(),
            mv_data: bytes.as_ptr() as *mut c_void,
        }
    }

    /// Borrows the bytes this value points at.
    ///
    /// # Safety
    ///
    /// `mv_data` must point to `mv_size` readable bytes, or `mv_size`
    /// must be zero.
    pub unsafe fn as_slice<'a>(&self) -> &'a [u8] {
        if self.mv_size == 0 || self.mv_data.is_null() {
            &[]
        } else {
            std::slice::from_raw_parts(self.mv_data as *const u8, self.mv_size)
        }
    }
}

/// Database statistics.
///
/// Only `ms_entries` is meaningful; page figures have no counterpart in
/// SQLite and are reported as zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct MDB_stat {
    /// Page size.
    pub ms_psize: c_uint,
    /// B-tree depth.
    pub ms_depth: c_uint,
    /// Branch pages.
    pub ms_branch_pages: usize,
    /// Leaf pages.
    pub ms_leaf_pages: usize,
    /// Overflow pages.
    pub ms_overflow_pages: usize,
    /// Number of records.
    pub ms_entries: usize,
}

/// An environment handle.
///
/// Created by `mdb_env_create`, opened by `mdb_env_open`, released by
/// `mdb_env_close`.
pub struct MDB_env {
    pub(crate) options: EnvOptions,
    pub(crate) env: Option<Environment>,
    pub(crate) dbis: Mutex<Vec<Option<Dbi>>>,
}

impl MDB_env {
    pub(crate) fn new() -> Self {
        Self {
            options: EnvOptions::default(),
            env: None,
            dbis: Mutex::new(Vec::new()),
        }
    }

    /// Returns the handle for `dbi`, reusing one already issued for the
    /// same name.
    pub(crate) fn register(&self, dbi: Dbi) -> MDB_dbi {
        let mut dbis = self.dbis.lock();
        let slot = match dbis
            .iter()
            .position(|d| d.as_ref().is_some_and(|d| d.name() == dbi.name()))
        {
            Some(slot) => {
                dbis[slot] = Some(dbi);
                slot
            }
            None => {
                dbis.push(Some(dbi));
                dbis.len() - 1
            }
        };
        FIRST_DBI + slot as MDB_dbi
    }

    pub(crate) fn lookup(&self, handle: MDB_dbi) -> Option<Dbi> {
        let slot = handle.checked_sub(FIRST_DBI)? as usize;
        self.dbis.lock().get(slot).cloned().flatten()
    }

    pub(crate) fn release(&self, handle: MDB_dbi) {
        let Some(slot) = handle.checked_sub(FIRST_DBI) else {
            return;
        };
        if let Some(entry) = self.dbis.lock().get_mut(slot as usize) {
            if let Some(dbi) = entry.take() {
                dbi.close();
            }
        }
    }
}

/// A transaction handle.
pub struct MDB_txn {
    pub(crate) env: &'static MDB_env,
    pub(crate) txn: Transaction<'static>,
}

/// A cursor handle.
pub struct MDB_cursor {
    pub(crate) cursor: Cursor<'static>,
}
