//! Key-value functions.

use crate::dbi::lookup;
use crate::error::{clear_last_error, fail, from_core, report, EINVAL};
use crate::types::{MDB_dbi, MDB_txn, MDB_val};
use sqlmdb_core::{WriteFlags, MDB_SUCCESS};
use std::ffi::{c_int, c_uint};

/// Reads the value stored under `key`.
///
/// For a duplicate database this is the smallest value of the key. On
/// success `data` points into the transaction and stays valid until it
/// ends.
///
/// # Safety
///
/// `txn` must be a live transaction handle; `key` and `data` must be
/// valid pointers, and `key` must describe readable memory.
#[no_mangle]
pub unsafe extern "C" fn mdb_get(
    txn: *mut MDB_txn,
    dbi: MDB_dbi,
    key: *mut MDB_val,
    data: *mut MDB_val,
) -> c_int {
    clear_last_error();

    let Some(txn) = txn.as_ref() else {
        return fail(EINVAL, "txn is null");
    };
    let Some(key) = key.as_ref() else {
        return fail(EINVAL, "key is null");
    };
    if data.is_null() {
        return fail(EINVAL, "data is null");
    }
    let handle = match lookup(txn, dbi) {
        Ok(handle) => handle,
        Err(code) => return code,
    };

    match txn.txn.get(&handle, key.as_slice()) {
        Ok(value) => {
            *data = MDB_val::from_slice(&value);
            MDB_SUCCESS
        }
        Err(err) => from_core(&err),
    }
}

/// Stores `data` under `key`.
///
/// `MDB_NOOVERWRITE` and `MDB_NODUPDATA` are honoured; other bits are
/// ignored.
///
/// # Safety
///
/// `txn` must be a live transaction handle; `key` and `data` must be
/// valid pointers describing readable memory.
#[no_mangle]
pub unsafe extern "C" fn mdb_put(
    txn: *mut MDB_txn,
    dbi: MDB_dbi,
    key: *mut MDB_val,
    data: *mut MDB_val,
    flags: c_uint,
) -> c_int {
    clear_last_error();

    let Some(txn) = txn.as_ref() else {
        return fail(EINVAL, "txn is null");
    };
    let (Some(key), Some(data)) = (key.as_ref(), data.as_ref()) else {
        return fail(EINVAL, "key or data is null");
    };
    let handle = match lookup(txn, dbi) {
        Ok(handle) => handle,
        Err(code) => return code,
    };

    report(txn.txn.put(
        &handle,
        key.as_slice(),
        data.as_slice(),
        WriteFlags::from_bits_truncate(flags),
    ))
}

/// Deletes `key`, or only the `(key, data)` pair when `data` is non-null.
///
/// # Safety
///
/// `txn` must be a live transaction handle; `key` must be a valid pointer
/// and `data` either null or valid.
#[no_mangle]
pub unsafe extern "C" fn mdb_del(
    txn: *mut MDB_txn,
    dbi: MDB_dbi,
    key: *mut MDB_val,
    data: *mut MDB_val,
) -> c_int {
    clear_last_error();

    let Some(txn) = txn.as_ref() else {
        return fail(EINVAL, "txn is null");
    };
    let Some(key) = key.as_ref() else {
        return fail(EINVAL, "key is null");
    };
    let handle = match lookup(txn, dbi) {
        Ok(handle) => handle,
        Err(code) => return code,
    };

    let value = data.as_ref().map(|data| data.as_slice());
    report(txn.txn.del(&handle, key.as_slice(), value))
}
