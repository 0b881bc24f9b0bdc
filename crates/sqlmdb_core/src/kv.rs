//! Key-value operations.

use crate::dbi::Dbi;
use crate::error::{CoreError, CoreResult};
use crate::ledger;
use crate::transaction::Transaction;
use crate::types::WriteFlags;
use bytes::Bytes;
use sqlmdb_storage::rusqlite::params;
use sqlmdb_storage::rusqlite::types::ValueRef;
use sqlmdb_storage::Statement;
use tracing::trace;

/// Copies a BLOB column out of a row.
///
/// Record tables only ever receive BLOBs, so any other storage class is
/// reported as corruption rather than coerced.
pub(crate) fn blob_column(value: ValueRef<'_>, column: &str) -> CoreResult<Vec<u8>> {
    match value {
        ValueRef::Blob(bytes) => Ok(bytes.to_vec()),
        other => Err(CoreError::corrupted(format!(
            "{column} column holds {} instead of a blob",
            other.data_type()
        ))),
    }
}

impl Transaction<'_> {
    /// Returns the value stored under `key`.
    ///
    /// In a duplicate database this is the smallest value for the key.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is absent.
    pub fn get(&self, dbi: &Dbi, key: &[u8]) -> CoreResult<Bytes> {
        trace!(db = dbi.name(), key_len = key.len(), "get");
        let conn = self.conn()?;
        let statement = Statement::SelectValue { table: dbi.table() };
        let value = conn.with_statement(&statement, |stmt| -> CoreResult<Option<Vec<u8>>> {
            let mut rows = stmt.query(params![key])?;
            match rows.next()? {
                Some(row) => blob_column(row.get_ref(0)?, "value").map(Some),
                None => Ok(None),
            }
        })?;

        value
            .map(|data| self.retain(data))
            .ok_or(CoreError::NotFound)
    }

    /// Stores `value` under `key`.
    ///
    /// In a database without duplicates an existing value is replaced in
    /// place. Otherwise a new record is added and the entry count grows by
    /// one.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` in a read-only transaction and `KeyExist`
    /// when `flags` forbid the write. A failed put changes nothing.
    pub fn put(&self, dbi: &Dbi, key: &[u8], value: &[u8], flags: WriteFlags) -> CoreResult<()> {
        self.require_writable()?;
        trace!(
            db = dbi.name(),
            key_len = key.len(),
            value_len = value.len(),
            ?flags,
            "put"
        );

        let table = dbi.table();
        self.conn()?.savepoint(|conn| -> CoreResult<()> {
            let existing = conn.query_optional(
                &Statement::SelectRowId { table },
                params![key],
                |row| row.get::<_, i64>(0),
            )?;

            if existing.is_some() && flags.contains(WriteFlags::NO_OVERWRITE) {
                return Err(CoreError::KeyExist);
            }

            if dbi.allow_duplicates() {
                if existing.is_some() && flags.contains(WriteFlags::NO_DUP_DATA) {
                    let pair = conn.query_optional(
                        &Statement::SelectPair { table },
                        params![key, value],
                        |row| row.get::<_, i64>(0),
                    )?;
                    if pair.is_some() {
                        return Err(CoreError::KeyExist);
                    }
                }
            } else if let Some(rowid) = existing {
                conn.execute(&Statement::UpdateValue { table }, params![value, rowid])?;
                return Ok(());
            }

            conn.execute(&Statement::Insert { table }, params![key, value])?;
            ledger::adjust(conn, table, 1)
        })
    }

    /// Deletes records stored under `key`.
    ///
    /// In a duplicate database with `value` given, only records holding
    /// that exact pair are removed. Otherwise every record for the key is.
    ///
    /// # Errors
    ///
    /// Returns `AccessDenied` in a read-only transaction and `NotFound`
    /// if nothing matched.
    pub fn del(&self, dbi: &Dbi, key: &[u8], value: Option<&[u8]>) -> CoreResult<()> {
        self.require_writable()?;
        trace!(db = dbi.name(), key_len = key.len(), with_value = value.is_some(), "del");

        let table = dbi.table();
        self.conn()?.savepoint(|conn| -> CoreResult<()> {
            let removed = match value {
                Some(value) if dbi.allow_duplicates() => {
                    conn.execute(&Statement::DeleteByPair { table }, params![key, value])?
                }
                _ => conn.execute(&Statement::DeleteByKey { table }, params![key])?,
            };
            if removed == 0 {
                return Err(CoreError::NotFound);
            }

            let delta = i64::try_from(removed)
                .map_err(|_| CoreError::corrupted("deleted row count overflows"))?;
            ledger::adjust(conn, table, -delta)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{CoreError, EACCES, MDB_KEYEXIST, MDB_NOTFOUND};
    use crate::{EnvOptions, Environment, WriteFlags};
    use proptest::prelude::*;
    use sqlmdb_storage::{rusqlite, TableName};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn env() -> (tempfile::TempDir, Environment) {
        let dir = tempdir().unwrap();
        let env = Environment::open(dir.path(), EnvOptions::default()).unwrap();
        (dir, env)
    }

    #[test]
    fn put_then_get() {
        let (_dir, env) = env();
        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        txn.put(&db, b"key", b"value", WriteFlags::empty()).unwrap();
        assert_eq!(&txn.get(&db, b"key").unwrap()[..], b"value");
        assert_eq!(txn.buffer_count(), 1);
        assert_eq!(txn.buffered_bytes(), 5);
    }

    #[test]
    fn missing_key_is_not_found() {
        let (_dir, env) = env();
        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        let err = txn.get(&db, b"nope").unwrap_err();
        assert_eq!(err.code(), MDB_NOTFOUND);
    }

    #[test]
    fn overwrite_replaces_in_place() {
        let (_dir, env) = env();
        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        txn.put(&db, b"k", b"old", WriteFlags::empty()).unwrap();
        txn.put(&db, b"k", b"new", WriteFlags::empty()).unwrap();
        assert_eq!(&txn.get(&db, b"k").unwrap()[..], b"new");
        assert_eq!(txn.stat(&db).unwrap().entries, 1);
    }

    #[test]
    fn no_overwrite_reports_key_exist() {
        let (_dir, env) = env();
        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        txn.put(&db, b"k", b"v", WriteFlags::NO_OVERWRITE).unwrap();
        let err = txn.put(&db, b"k", b"w", WriteFlags::NO_OVERWRITE).unwrap_err();
        assert_eq!(err.code(), MDB_KEYEXIST);
        assert_eq!(&txn.get(&db, b"k").unwrap()[..], b"v");
    }

    #[test]
    fn duplicates_accumulate() {
        let (_dir, env) = env();
        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("dups", true).unwrap();
        txn.put(&db, b"k", b"b", WriteFlags::empty()).unwrap();
        txn.put(&db, b"k", b"a", WriteFlags::empty()).unwrap();
        txn.put(&db, b"k", b"a", WriteFlags::empty()).unwrap();
        assert_eq!(txn.stat(&db).unwrap().entries, 3);
        // Lowest value wins.
        assert_eq!(&txn.get(&db, b"k").unwrap()[..], b"a");
    }

    #[test]
    fn no_dup_data_rejects_existing_pair() {
        let (_dir, env) = env();
        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("dups", true).unwrap();
        txn.put(&db, b"k", b"a", WriteFlags::NO_DUP_DATA).unwrap();
        txn.put(&db, b"k", b"b", WriteFlags::NO_DUP_DATA).unwrap();
        assert!(matches!(
            txn.put(&db, b"k", b"a", WriteFlags::NO_DUP_DATA),
            Err(CoreError::KeyExist)
        ));
        assert_eq!(txn.stat(&db).unwrap().entries, 2);
    }

    #[test]
    fn delete_pair_in_duplicate_db() {
        let (_dir, env) = env();
        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("dups", true).unwrap();
        for v in [b"1", b"2", b"3"] {
            txn.put(&db, b"k", v, WriteFlags::empty()).unwrap();
        }
        txn.del(&db, b"k", Some(&b"2"[..])).unwrap();
        assert_eq!(txn.stat(&db).unwrap().entries, 2);
        assert!(matches!(
            txn.del(&db, b"k", Some(&b"2"[..])),
            Err(CoreError::NotFound)
        ));
        txn.del(&db, b"k", None).unwrap();
        assert_eq!(txn.stat(&db).unwrap().entries, 0);
    }

    #[test]
    fn value_ignored_for_unique_db_delete() {
        let (_dir, env) = env();
        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        txn.put(&db, b"k", b"v", WriteFlags::empty()).unwrap();
        txn.del(&db, b"k", Some(&b"something else"[..])).unwrap();
        assert!(txn.get(&db, b"k").is_err());
    }

    #[test]
    fn delete_missing_is_not_found() {
        let (_dir, env) = env();
        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        assert!(matches!(txn.del(&db, b"k", None), Err(CoreError::NotFound)));
        assert_eq!(txn.stat(&db).unwrap().entries, 0);
    }

    #[test]
    fn read_only_writes_are_denied() {
        let (_dir, env) = env();
        env.transaction(|txn| txn.open_db("kv", false).map(|_| ()))
            .unwrap();

        let txn = env.begin_ro_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        let err = txn.put(&db, b"k", b"v", WriteFlags::empty()).unwrap_err();
        assert_eq!(err.code(), EACCES);
        assert!(matches!(txn.del(&db, b"k", None), Err(CoreError::AccessDenied)));
    }

    #[test]
    fn empty_keys_and_values_round_trip() {
        let (_dir, env) = env();
        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        txn.put(&db, b"", b"", WriteFlags::empty()).unwrap();
        assert!(txn.get(&db, b"").unwrap().is_empty());
    }

    #[test]
    fn abort_discards_writes() {
        let (_dir, env) = env();
        env.transaction(|txn| txn.open_db("kv", false).map(|_| ()))
            .unwrap();

        let txn = env.begin_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        txn.put(&db, b"k", b"v", WriteFlags::empty()).unwrap();
        txn.abort();

        let txn = env.begin_ro_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        assert!(txn.get(&db, b"k").is_err());
        assert_eq!(txn.stat(&db).unwrap().entries, 0);
    }

    #[test]
    fn text_value_is_corrupted() {
        let (_dir, env) = env();
        env.transaction(|txn| txn.open_db("kv", false).map(|_| ()))
            .unwrap();
        let raw = rusqlite::Connection::open(env.path()).unwrap();
        let table = TableName::new("kv").unwrap();
        raw.execute_batch(&format!(
            "INSERT INTO {} (key, value) VALUES (x'6b', 'text')",
            table.quoted()
        ))
        .unwrap();
        drop(raw);

        let txn = env.begin_ro_txn().unwrap();
        let db = txn.open_db("kv", false).unwrap();
        assert!(matches!(
            txn.get(&db, b"k"),
            Err(CoreError::Corrupted { .. })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn matches_btreemap_model(
            ops in prop::collection::vec(
                (prop::collection::vec(any::<u8>(), 0..4), prop::option::of(prop::collection::vec(any::<u8>(), 0..8))),
                1..40,
            )
        ) {
            let (_dir, env) = env();
            let txn = env.begin_txn().unwrap();
            let db = txn.open_db("model", false).unwrap();
            let mut model = BTreeMap::new();

            for (key, value) in ops {
                match value {
                    Some(value) => {
                        txn.put(&db, &key, &value, WriteFlags::empty()).unwrap();
                        model.insert(key, value);
                    }
                    None => {
                        let expected = model.remove(&key).is_some();
                        prop_assert_eq!(txn.del(&db, &key, None).is_ok(), expected);
                    }
                }
            }

            prop_assert_eq!(txn.stat(&db).unwrap().entries, model.len() as u64);
            for (key, value) in &model {
                prop_assert_eq!(&txn.get(&db, key).unwrap()[..], &value[..]);
            }
        }
    }
}
