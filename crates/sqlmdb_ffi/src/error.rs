//! Result codes and the per-thread last error.

use sqlmdb_core::{
    CoreError, CoreResult, EACCES, MDB_BAD_VALSIZE, MDB_CORRUPTED, MDB_INCOMPATIBLE,
    MDB_KEYEXIST, MDB_NOTFOUND, MDB_PANIC, MDB_SUCCESS,
};
use sqlmdb_storage::rusqlite::ffi::sqlite3_errstr;
use std::cell::RefCell;
use std::ffi::{c_char, c_int, CStr, CString};

/// Invalid argument.
pub const EINVAL: c_int = 22;

struct LastError {
    code: c_int,
    message: CString,
}

// Thread-local storage for last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

/// Records `code` and `message` as this thread's last error.
pub(crate) fn set_last_error(code: c_int, message: impl Into<String>) {
    let message = CString::new(message.into()).unwrap_or_default();
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(LastError { code, message }));
}

/// Clears the last error.
pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

/// Records an error and returns its code.
pub(crate) fn fail(code: c_int, message: impl Into<String>) -> c_int {
    set_last_error(code, message);
    code
}

/// Converts a core result into a return code, recording any error.
pub(crate) fn report(result: CoreResult<()>) -> c_int {
    match result {
        Ok(()) => MDB_SUCCESS,
        Err(err) => from_core(&err),
    }
}

/// Records `err` and returns its code.
pub(crate) fn from_core(err: &CoreError) -> c_int {
    let code = err.code();
    if !err.is_not_found() {
        tracing::debug!(code, error = %err, "call failed");
    }
    fail(code, err.to_string())
}

fn static_message(code: c_int) -> Option<&'static CStr> {
    let message = match code {
        MDB_SUCCESS => c"Successful return: 0",
        MDB_KEYEXIST => c"MDB_KEYEXIST: Key/data pair already exists",
        MDB_NOTFOUND => c"MDB_NOTFOUND: No matching key/data pair found",
        MDB_CORRUPTED => c"MDB_CORRUPTED: Located page was wrong type",
        MDB_PANIC => c"MDB_PANIC: Update of meta page failed or environment had fatal error",
        MDB_INCOMPATIBLE => c"MDB_INCOMPATIBLE: Operation and DB incompatible",
        MDB_BAD_VALSIZE => c"MDB_BAD_VALSIZE: Unsupported size of key/DB name/data",
        EACCES => c"Permission denied",
        EINVAL => c"Invalid argument",
        _ => return None,
    };
    Some(message)
}

/// Returns a description of an error code.
///
/// Known codes have fixed descriptions. For any other code, the message of
/// the last error on this thread is returned if it carried that code, and
/// the engine's description of the code otherwise.
///
/// # Safety
///
/// The returned string must not be modified or freed. A per-thread message
/// stays valid until the next call into this library on the same thread.
#[no_mangle]
pub unsafe extern "C" fn mdb_strerror(err: c_int) -> *mut c_char {
    if let Some(message) = static_message(err) {
        return message.as_ptr().cast_mut();
    }

    let recorded = LAST_ERROR.with(|e| {
        e.borrow()
            .as_ref()
            .filter(|last| last.code == err)
            .map(|last| last.message.as_ptr())
    });
    match recorded {
        Some(ptr) => ptr.cast_mut(),
        None => sqlite3_errstr(err).cast_mut(),
    }
}
