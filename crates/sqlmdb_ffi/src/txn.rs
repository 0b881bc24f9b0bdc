//! Transaction functions.

use crate::env::opened;
use crate::error::{clear_last_error, fail, from_core, report, EINVAL};
use crate::types::{MDB_env, MDB_txn, MDB_RDONLY};
use sqlmdb_core::MDB_SUCCESS;
use std::ffi::{c_int, c_uint};

/// Begins a transaction.
///
/// Pass `MDB_RDONLY` in `flags` for a read-only transaction. Nested
/// transactions are not supported; `parent` must be null.
///
/// # Safety
///
/// `env` must be an opened environment handle that outlives the
/// transaction, and `txn` a valid pointer to write the handle to. The
/// transaction must be used only on the thread that began it.
#[no_mangle]
pub unsafe extern "C" fn mdb_txn_begin(
    env: *mut MDB_env,
    parent: *mut MDB_txn,
    flags: c_uint,
    txn: *mut *mut MDB_txn,
) -> c_int {
    clear_last_error();

    if txn.is_null() {
        return fail(EINVAL, "txn is null");
    }
    if !parent.is_null() {
        return fail(EINVAL, "nested transactions are not supported");
    }
    let Some(env) = env.as_ref() else {
        return fail(EINVAL, "env is null");
    };
    let environment = match opened(env) {
        Ok(environment) => environment,
        Err(code) => return code,
    };

    match environment.begin(flags & MDB_RDONLY == 0) {
        Ok(begun) => {
            *txn = Box::into_raw(Box::new(MDB_txn { env, txn: begun }));
            MDB_SUCCESS
        }
        Err(err) => from_core(&err),
    }
}

/// Commits a transaction and frees the handle.
///
/// The handle is freed whether or not the commit succeeds.
///
/// # Safety
///
/// `txn` must be a handle from `mdb_txn_begin` with no open cursors. It
/// must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn mdb_txn_commit(txn: *mut MDB_txn) -> c_int {
    clear_last_error();

    if txn.is_null() {
        return fail(EINVAL, "txn is null");
    }
    let MDB_txn { txn, .. } = *Box::from_raw(txn);
    report(txn.commit())
}

/// Aborts a transaction and frees the handle.
///
/// # Safety
///
/// `txn` must be a handle from `mdb_txn_begin` with no open cursors, or
/// null. It must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn mdb_txn_abort(txn: *mut MDB_txn) {
    clear_last_error();

    if txn.is_null() {
        return;
    }
    let MDB_txn { txn, .. } = *Box::from_raw(txn);
    txn.abort();
}
