//! Named database functions.

use crate::error::{clear_last_error, fail, from_core, report, EINVAL};
use crate::types::{MDB_dbi, MDB_env, MDB_stat, MDB_txn, MDB_CREATE, MDB_DUPSORT};
use sqlmdb_core::{Dbi, MDB_BAD_VALSIZE, MDB_SUCCESS};
use std::ffi::{c_char, c_int, c_uint, CStr};

/// Resolves `dbi` against the environment of `txn`, or records `EINVAL`.
pub(crate) fn lookup(txn: &MDB_txn, dbi: MDB_dbi) -> Result<Dbi, c_int> {
    txn.env
        .lookup(dbi)
        .ok_or_else(|| fail(EINVAL, format!("unknown database handle {dbi}")))
}

/// Opens a named database.
///
/// Without `MDB_CREATE` the database must already exist. `MDB_DUPSORT`
/// only takes effect when the database is created. The unnamed main
/// database is not available; `name` must not be null.
///
/// # Safety
///
/// `txn` must be a live transaction handle, `name` a valid null-terminated
/// string and `dbi` a valid pointer to write the handle to.
#[no_mangle]
pub unsafe extern "C" fn mdb_dbi_open(
    txn: *mut MDB_txn,
    name: *const c_char,
    flags: c_uint,
    dbi: *mut MDB_dbi,
) -> c_int {
    clear_last_error();

    let Some(txn) = txn.as_ref() else {
        return fail(EINVAL, "txn is null");
    };
    if dbi.is_null() {
        return fail(EINVAL, "dbi is null");
    }
    if name.is_null() {
        return fail(EINVAL, "the unnamed database is not supported");
    }
    let Ok(name) = CStr::from_ptr(name).to_str() else {
        return fail(MDB_BAD_VALSIZE, "database name is not valid UTF-8");
    };

    let opened = if flags & MDB_CREATE != 0 {
        txn.txn.open_db(name, flags & MDB_DUPSORT != 0)
    } else {
        txn.txn.open_existing_db(name)
    };
    match opened {
        Ok(handle) => {
            *dbi = txn.env.register(handle);
            MDB_SUCCESS
        }
        Err(err) => from_core(&err),
    }
}

/// Releases a database handle. Records are kept.
///
/// # Safety
///
/// `env` must be an environment handle, or null.
#[no_mangle]
pub unsafe extern "C" fn mdb_dbi_close(env: *mut MDB_env, dbi: MDB_dbi) {
    clear_last_error();

    if let Some(env) = env.as_ref() {
        env.release(dbi);
    }
}

/// Empties or deletes a database. Not supported.
///
/// # Safety
///
/// `txn` must be a live transaction handle.
#[no_mangle]
pub unsafe extern "C" fn mdb_drop(txn: *mut MDB_txn, dbi: MDB_dbi, del: c_int) -> c_int {
    clear_last_error();

    let Some(txn) = txn.as_ref() else {
        return fail(EINVAL, "txn is null");
    };
    let handle = match lookup(txn, dbi) {
        Ok(handle) => handle,
        Err(code) => return code,
    };
    report(txn.txn.drop_db(&handle, del != 0))
}

/// Reports statistics for a database.
///
/// Only `ms_entries` is filled in; every other field is zero.
///
/// # Safety
///
/// `txn` must be a live transaction handle and `stat` a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn mdb_stat(txn: *mut MDB_txn, dbi: MDB_dbi, stat: *mut MDB_stat) -> c_int {
    clear_last_error();

    let Some(txn) = txn.as_ref() else {
        return fail(EINVAL, "txn is null");
    };
    if stat.is_null() {
        return fail(EINVAL, "stat is null");
    }
    let handle = match lookup(txn, dbi) {
        Ok(handle) => handle,
        Err(code) => return code,
    };

    let found = match txn.txn.stat(&handle) {
        Ok(found) => found,
        Err(err) => return from_core(&err),
    };
    match narrow_entries(found.entries) {
        Ok(ms_entries) => {
            *stat = MDB_stat {
                ms_entries,
                ..MDB_stat::default()
            };
            MDB_SUCCESS
        }
        Err(code) => code,
    }
}

/// Converts a stored entry count to the platform's count type, or records
/// `MDB_BAD_VALSIZE` when it does not fit.
fn narrow_entries<T: TryFrom<u64>>(entries: u64) -> Result<T, c_int> {
    T::try_from(entries).map_err(|_| {
        fail(
            MDB_BAD_VALSIZE,
            format!("entry count {entries} does not fit the platform word"),
        )
    })
}
