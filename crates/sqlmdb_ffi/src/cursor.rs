//! Cursor functions.

use crate::dbi::lookup;
use crate::error::{clear_last_error, fail, from_core, report, EINVAL};
use crate::types::{
    MDB_cursor, MDB_cursor_op, MDB_dbi, MDB_txn, MDB_val, MDB_FIRST, MDB_GET_CURRENT, MDB_LAST,
    MDB_NEXT, MDB_NEXT_DUP, MDB_PREV, MDB_SET, MDB_SET_KEY, MDB_SET_RANGE,
};
use sqlmdb_core::{CursorOp, WriteFlags, MDB_SUCCESS};
use std::ffi::{c_int, c_uint};

fn cursor_op(op: MDB_cursor_op) -> Option<CursorOp> {
    let op = match op {
        MDB_FIRST => CursorOp::First,
        MDB_GET_CURRENT => CursorOp::GetCurrent,
        MDB_LAST => CursorOp::Last,
        MDB_NEXT => CursorOp::Next,
        MDB_NEXT_DUP => CursorOp::NextDup,
        MDB_PREV => CursorOp::Prev,
        MDB_SET => CursorOp::Set,
        MDB_SET_KEY => CursorOp::SetKey,
        MDB_SET_RANGE => CursorOp::SetRange,
        _ => return None,
    };
    Some(op)
}

/// Opens a cursor on a database.
///
/// # Safety
///
/// `txn` must be a live transaction handle that outlives the cursor, and
/// `cursor` a valid pointer to write the handle to.
#[no_mangle]
pub unsafe extern "C" fn mdb_cursor_open(
    txn: *mut MDB_txn,
    dbi: MDB_dbi,
    cursor: *mut *mut MDB_cursor,
) -> c_int {
    clear_last_error();

    let Some(txn) = txn.as_ref() else {
        return fail(EINVAL, "txn is null");
    };
    if cursor.is_null() {
        return fail(EINVAL, "cursor is null");
    }
    let handle = match lookup(txn, dbi) {
        Ok(handle) => handle,
        Err(code) => return code,
    };

    match txn.txn.open_cursor(&handle) {
        Ok(opened) => {
            *cursor = Box::into_raw(Box::new(MDB_cursor { cursor: opened }));
            MDB_SUCCESS
        }
        Err(err) => from_core(&err),
    }
}

/// Moves the cursor and returns the record it lands on.
///
/// `MDB_SET`, `MDB_SET_KEY` and `MDB_SET_RANGE` read the key from `key`.
/// On success `data` receives the value and, except for `MDB_SET`, `key`
/// receives the stored key. Returned bytes stay valid until the
/// transaction ends.
///
/// # Safety
///
/// `cursor` must be a live cursor handle. `key` and `data` must each be
/// null or valid; `key` must be valid for keyed operations.
#[no_mangle]
pub unsafe extern "C" fn mdb_cursor_get(
    cursor: *mut MDB_cursor,
    key: *mut MDB_val,
    data: *mut MDB_val,
    op: MDB_cursor_op,
) -> c_int {
    clear_last_error();

    let Some(cursor) = cursor.as_mut() else {
        return fail(EINVAL, "cursor is null");
    };
    let Some(op) = cursor_op(op) else {
        return fail(EINVAL, format!("unsupported cursor operation {op}"));
    };

    let search = if op.takes_key() {
        match key.as_ref() {
            Some(key) => Some(key.as_slice()),
            None => return fail(EINVAL, "key is null"),
        }
    } else {
        None
    };

    match cursor.cursor.get(op, search) {
        Ok(record) => {
            if let Some(data) = data.as_mut() {
                *data = MDB_val::from_slice(&record.value);
            }
            if op != CursorOp::Set {
                if let Some(key) = key.as_mut() {
                    *key = MDB_val::from_slice(&record.key);
                }
            }
            MDB_SUCCESS
        }
        Err(err) => from_core(&err),
    }
}

/// Stores a record through the cursor's transaction.
///
/// # Safety
///
/// `cursor` must be a live cursor handle; `key` and `data` must be valid
/// pointers describing readable memory.
#[no_mangle]
pub unsafe extern "C" fn mdb_cursor_put(
    cursor: *mut MDB_cursor,
    key: *mut MDB_val,
    data: *mut MDB_val,
    flags: c_uint,
) -> c_int {
    clear_last_error();

    let Some(cursor) = cursor.as_ref() else {
        return fail(EINVAL, "cursor is null");
    };
    let (Some(key), Some(data)) = (key.as_ref(), data.as_ref()) else {
        return fail(EINVAL, "key or data is null");
    };

    report(cursor.cursor.put(
        key.as_slice(),
        data.as_slice(),
        WriteFlags::from_bits_truncate(flags),
    ))
}

/// Closes a cursor and frees the handle.
///
/// # Safety
///
/// `cursor` must be a cursor handle, or null. It must not be used after
/// this call.
#[no_mangle]
pub unsafe extern "C" fn mdb_cursor_close(cursor: *mut MDB_cursor) {
    clear_last_error();

    if cursor.is_null() {
        return;
    }
    let MDB_cursor { cursor } = *Box::from_raw(cursor);
    cursor.close();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbi::mdb_dbi_open;
    use crate::env::mdb_env_close;
    use crate::kv::mdb_put;
    use crate::txn::tests::open_env;
    use crate::txn::{mdb_txn_abort, mdb_txn_begin, mdb_txn_commit};
    use crate::types::{MDB_env, MDB_CREATE, MDB_DUPSORT};
    use sqlmdb_core::MDB_NOTFOUND;
    use std::ptr;

    fn empty() -> MDB_val {
        MDB_val {
            mv_size: 0,
            mv_data: ptr::null_mut(),
        }
    }

    unsafe fn filled(
        env: *mut MDB_env,
        flags: c_uint,
        pairs: &[(&[u8], &[u8])],
    ) -> (*mut MDB_txn, MDB_dbi) {
        let mut txn = ptr::null_mut();
        mdb_txn_begin(env, ptr::null_mut(), 0, &mut txn);
        let mut dbi = 0;
        mdb_dbi_open(txn, c"walk".as_ptr(), MDB_CREATE | flags, &mut dbi);
        for (key, value) in pairs {
            let mut key = MDB_val::from_slice(key);
            let mut value = MDB_val::from_slice(value);
            assert_eq!(mdb_put(txn, dbi, &mut key, &mut value, 0), MDB_SUCCESS);
        }
        (txn, dbi)
    }

    #[test]
    fn op_codes() {
        assert_eq!(cursor_op(MDB_FIRST), Some(CursorOp::First));
        assert_eq!(cursor_op(MDB_SET_RANGE), Some(CursorOp::SetRange));
        assert_eq!(cursor_op(1), None);
        assert_eq!(cursor_op(-1), None);
    }

    #[test]
    fn forward_walk() {
        let (_dir, env) = open_env(0);

        unsafe {
            let pairs: [(&[u8], &[u8]); 3] = [(b"b", b"2"), (b"c", b"3"), (b"a", b"1")];
            let (txn, dbi) = filled(env, 0, &pairs);

            let mut cursor = ptr::null_mut();
            assert_eq!(mdb_cursor_open(txn, dbi, &mut cursor), MDB_SUCCESS);

            let mut key = empty();
            let mut data = empty();
            let mut seen = Vec::new();
            let mut op = MDB_FIRST;
            while mdb_cursor_get(cursor, &mut key, &mut data, op) == MDB_SUCCESS {
                seen.push((key.as_slice().to_vec(), data.as_slice().to_vec()));
                op = MDB_NEXT;
            }
            assert_eq!(
                seen,
                vec![
                    (b"a".to_vec(), b"1".to_vec()),
                    (b"b".to_vec(), b"2".to_vec()),
                    (b"c".to_vec(), b"3".to_vec()),
                ]
            );
            assert_eq!(
                mdb_cursor_get(cursor, &mut key, &mut data, MDB_NEXT),
                MDB_NOTFOUND
            );

            mdb_cursor_close(cursor);
            mdb_txn_commit(txn);
            mdb_env_close(env);
        }
    }

    #[test]
    fn keyed_operations() {
        let (_dir, env) = open_env(0);

        unsafe {
            let pairs: [(&[u8], &[u8]); 3] =
                [(b"apple", b"red"), (b"banana", b"yellow"), (b"cherry", b"dark")];
            let (txn, dbi) = filled(env, 0, &pairs);
            let mut cursor = ptr::null_mut();
            mdb_cursor_open(txn, dbi, &mut cursor);

            let mut key = MDB_val::from_slice(b"b");
            let mut data = empty();
            assert_eq!(
                mdb_cursor_get(cursor, &mut key, &mut data, MDB_SET_RANGE),
                MDB_SUCCESS
            );
            assert_eq!(key.as_slice(), b"banana");
            assert_eq!(data.as_slice(), b"yellow");

            let lookup = b"cherry".to_vec();
            let mut key = MDB_val::from_slice(&lookup);
            assert_eq!(mdb_cursor_get(cursor, &mut key, &mut data, MDB_SET), MDB_SUCCESS);
            assert_eq!(data.as_slice(), b"dark");
            assert_eq!(key.mv_data.cast_const(), lookup.as_ptr().cast());

            let mut key = MDB_val::from_slice(b"apple");
            assert_eq!(
                mdb_cursor_get(cursor, &mut key, &mut data, MDB_SET_KEY),
                MDB_SUCCESS
            );
            assert_eq!(data.as_slice(), b"red");

            let mut key = MDB_val::from_slice(b"zebra");
            assert_eq!(
                mdb_cursor_get(cursor, &mut key, &mut data, MDB_SET),
                MDB_NOTFOUND
            );
            assert_eq!(
                mdb_cursor_get(cursor, ptr::null_mut(), &mut data, MDB_SET),
                EINVAL
            );

            let mut current = empty();
            mdb_cursor_get(cursor, &mut current, ptr::null_mut(), MDB_GET_CURRENT);
            assert_eq!(current.as_slice(), b"apple");

            mdb_cursor_close(cursor);
            mdb_txn_abort(txn);
            mdb_env_close(env);
        }
    }

    #[test]
    fn duplicates_and_backwards() {
        let (_dir, env) = open_env(0);

        unsafe {
            let pairs: [(&[u8], &[u8]); 3] = [(b"k", b"2"), (b"k", b"1"), (b"m", b"1")];
            let (txn, dbi) = filled(env, MDB_DUPSORT, &pairs);
            let mut cursor = ptr::null_mut();
            mdb_cursor_open(txn, dbi, &mut cursor);

            let mut key = empty();
            let mut data = empty();
            mdb_cursor_get(cursor, &mut key, &mut data, MDB_FIRST);
            assert_eq!(data.as_slice(), b"1");
            assert_eq!(
                mdb_cursor_get(cursor, &mut key, &mut data, MDB_NEXT_DUP),
                MDB_SUCCESS
            );
            assert_eq!(data.as_slice(), b"2");
            assert_eq!(
                mdb_cursor_get(cursor, &mut key, &mut data, MDB_NEXT_DUP),
                MDB_NOTFOUND
            );

            assert_eq!(mdb_cursor_get(cursor, &mut key, &mut data, MDB_LAST), MDB_SUCCESS);
            assert_eq!(key.as_slice(), b"m");
            assert_eq!(mdb_cursor_get(cursor, &mut key, &mut data, MDB_PREV), MDB_SUCCESS);
            assert_eq!((key.as_slice(), data.as_slice()), (&b"k"[..], &b"2"[..]));

            mdb_cursor_close(cursor);
            mdb_txn_abort(txn);
            mdb_env_close(env);
        }
    }

    #[test]
    fn put_through_cursor_and_bad_ops() {
        let (_dir, env) = open_env(0);

        unsafe {
            let (txn, dbi) = filled(env, 0, &[]);
            let mut cursor = ptr::null_mut();
            mdb_cursor_open(txn, dbi, &mut cursor);

            let mut key = MDB_val::from_slice(b"k");
            let mut data = MDB_val::from_slice(b"v");
            assert_eq!(mdb_cursor_put(cursor, &mut key, &mut data, 0), MDB_SUCCESS);

            let mut out = empty();
            assert_eq!(mdb_cursor_get(cursor, &mut key, &mut out, MDB_FIRST), MDB_SUCCESS);
            assert_eq!(out.as_slice(), b"v");
            assert_eq!(mdb_cursor_get(cursor, &mut key, &mut out, 3), EINVAL);
            assert_eq!(mdb_cursor_get(ptr::null_mut(), &mut key, &mut out, MDB_FIRST), EINVAL);
            assert_eq!(
                mdb_cursor_put(cursor, ptr::null_mut(), &mut data, 0),
                EINVAL
            );

            let mut other = ptr::null_mut();
            assert_eq!(mdb_cursor_open(txn, 99, &mut other), EINVAL);

            mdb_cursor_close(cursor);
            mdb_cursor_close(ptr::null_mut());
            mdb_txn_commit(txn);
            mdb_env_close(env);
        }
    }
}
