//! Environment functions.

use crate::error::{clear_last_error, fail, report, EINVAL};
use crate::types::{mdb_mode_t, MDB_env, MDB_NOSUBDIR, MDB_RDONLY};
use sqlmdb_core::{Environment, MDB_SUCCESS};
use std::ffi::{c_char, c_int, c_uint, CStr};
use std::path::Path;

/// Returns the opened environment behind `env`, or records `EINVAL`.
pub(crate) fn opened(env: &MDB_env) -> Result<&Environment, c_int> {
    env.env
        .as_ref()
        .ok_or_else(|| fail(EINVAL, "environment is not open"))
}

unsafe fn path_arg<'a>(path: *const c_char) -> Result<&'a Path, c_int> {
    if path.is_null() {
        return Err(fail(EINVAL, "path is null"));
    }
    match CStr::from_ptr(path).to_str() {
        Ok(path) => Ok(Path::new(path)),
        Err(_) => Err(fail(EINVAL, "path is not valid UTF-8")),
    }
}

/// Creates an unopened environment handle.
///
/// # Safety
///
/// `env` must be a valid pointer to write the handle to.
#[no_mangle]
pub unsafe extern "C" fn mdb_env_create(env: *mut *mut MDB_env) -> c_int {
    clear_last_error();

    if env.is_null() {
        return fail(EINVAL, "env is null");
    }

    *env = Box::into_raw(Box::new(MDB_env::new()));
    MDB_SUCCESS
}

/// Sets the maximum number of named databases.
///
/// Recorded for compatibility; the number of databases is not limited.
///
/// # Safety
///
/// `env` must be a handle from `mdb_env_create`.
#[no_mangle]
pub unsafe extern "C" fn mdb_env_set_maxdbs(env: *mut MDB_env, dbs: c_uint) -> c_int {
    clear_last_error();

    let Some(env) = env.as_mut() else {
        return fail(EINVAL, "env is null");
    };
    if env.env.is_some() {
        return fail(EINVAL, "environment is already open");
    }
    env.options.max_dbs = dbs;
    MDB_SUCCESS
}

/// Sets the memory map size. Recorded and otherwise ignored.
///
/// # Safety
///
/// `env` must be a handle from `mdb_env_create`.
#[no_mangle]
pub unsafe extern "C" fn mdb_env_set_mapsize(env: *mut MDB_env, size: usize) -> c_int {
    clear_last_error();

    let Some(env) = env.as_mut() else {
        return fail(EINVAL, "env is null");
    };
    env.options.map_size = size as u64;
    MDB_SUCCESS
}

/// Opens the environment at `path`.
///
/// `MDB_NOSUBDIR` and `MDB_RDONLY` are honoured; other flags and `mode`
/// are ignored.
///
/// # Safety
///
/// `env` must be a handle from `mdb_env_create` and `path` a valid
/// null-terminated string.
#[no_mangle]
pub unsafe extern "C" fn mdb_env_open(
    env: *mut MDB_env,
    path: *const c_char,
    flags: c_uint,
    _mode: mdb_mode_t,
) -> c_int {
    clear_last_error();

    let Some(env) = env.as_mut() else {
        return fail(EINVAL, "env is null");
    };
    if env.env.is_some() {
        return fail(EINVAL, "environment is already open");
    }
    let path = match path_arg(path) {
        Ok(path) => path,
        Err(code) => return code,
    };

    let options = env
        .options
        .clone()
        .no_sub_dir(flags & MDB_NOSUBDIR != 0)
        .read_only(flags & MDB_RDONLY != 0);
    env.options = options.clone();

    report(Environment::open(path, options).map(|opened| {
        env.env = Some(opened);
    }))
}

/// Copies the environment to a directory. Not supported.
///
/// # Safety
///
/// `env` must be a handle from `mdb_env_create`.
#[no_mangle]
pub unsafe extern "C" fn mdb_env_copy(env: *mut MDB_env, path: *const c_char) -> c_int {
    clear_last_error();

    let Some(env) = env.as_ref() else {
        return fail(EINVAL, "env is null");
    };
    let environment = match opened(env) {
        Ok(environment) => environment,
        Err(code) => return code,
    };
    let path = match path_arg(path) {
        Ok(path) => path,
        Err(code) => return code,
    };
    report(environment.copy(path))
}

/// Copies the environment with flags. Not supported.
///
/// # Safety
///
/// `env` must be a handle from `mdb_env_create`.
#[no_mangle]
pub unsafe extern "C" fn mdb_env_copy2(
    env: *mut MDB_env,
    path: *const c_char,
    _flags: c_uint,
) -> c_int {
    mdb_env_copy(env, path)
}

/// Closes the environment and frees the handle.
///
/// # Safety
///
/// `env` must be a handle from `mdb_env_create`, or null. Every
/// transaction and cursor of the environment must be finished first. The
/// handle must not be used after this call.
#[no_mangle]
pub unsafe extern "C" fn mdb_env_close(env: *mut MDB_env) {
    clear_last_error();

    if env.is_null() {
        return;
    }
    let env = Box::from_raw(env);
    if let Some(opened) = env.env {
        if let Err(err) = opened.close() {
            tracing::warn!(error = %err, "environment did not close cleanly");
        }
    }
}
