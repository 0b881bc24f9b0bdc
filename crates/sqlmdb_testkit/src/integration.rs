//! Cross-crate integration test helpers.
//!
//! [`ModelHarness`] replays operations against a database and against an
//! in-memory model, checking every result, the cursor order and the entry
//! count against the model.

use crate::fixtures::TestEnv;
use crate::generators::KvOperation;
use sqlmdb_core::{CoreResult, Dbi, Environment, Transaction, WriteFlags};
use std::collections::BTreeMap;

/// Collects every record of `dbi` in cursor order.
pub fn collect_records(txn: &Transaction<'_>, dbi: &Dbi) -> CoreResult<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut cursor = txn.open_cursor(dbi)?;
    let mut records = Vec::new();
    let mut next = cursor.first();
    loop {
        match next {
            Ok(record) => records.push((record.key.to_vec(), record.value.to_vec())),
            Err(err) if err.is_not_found() => break,
            Err(err) => return Err(err),
        }
        next = cursor.next();
    }
    Ok(records)
}

/// A database paired with the model it should match.
pub struct ModelHarness {
    /// The environment under test.
    pub test_env: TestEnv,
    name: String,
    allow_duplicates: bool,
    model: BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
}

impl ModelHarness {
    /// Database name used by the harness.
    pub const DB_NAME: &'static str = "model";

    /// Creates a harness over a fresh, empty database.
    pub fn new(allow_duplicates: bool) -> Self {
        let test_env = TestEnv::new();
        test_env
            .transaction(|txn| txn.open_db(Self::DB_NAME, allow_duplicates).map(|_| ()))
            .expect("Failed to create database");
        Self {
            test_env,
            name: Self::DB_NAME.to_string(),
            allow_duplicates,
            model: BTreeMap::new(),
        }
    }

    fn env(&self) -> &Environment {
        &self.test_env
    }

    /// Applies one operation in its own transaction and checks the result.
    pub fn apply(&mut self, op: &KvOperation) {
        match op {
            KvOperation::Put { key, value } => {
                self.env()
                    .transaction(|txn| {
                        let db = txn.open_db(&self.name, self.allow_duplicates)?;
                        txn.put(&db, key, value, WriteFlags::empty())
                    })
                    .expect("Failed to put");

                let values = self.model.entry(key.clone()).or_default();
                if self.allow_duplicates {
                    values.push(value.clone());
                    values.sort();
                } else {
                    *values = vec![value.clone()];
                }
            }
            KvOperation::Del { key } => {
                let result = self.env().transaction(|txn| {
                    let db = txn.open_db(&self.name, self.allow_duplicates)?;
                    txn.del(&db, key, None)
                });
                let existed = self.model.remove(key).is_some();
                Self::check_delete(result, existed);
            }
            KvOperation::DelPair { key, value } => {
                let result = self.env().transaction(|txn| {
                    let db = txn.open_db(&self.name, self.allow_duplicates)?;
                    txn.del(&db, key, Some(value.as_slice()))
                });
                let existed = if self.allow_duplicates {
                    self.remove_pair(key, value)
                } else {
                    self.model.remove(key).is_some()
                };
                Self::check_delete(result, existed);
            }
            KvOperation::Get { key } => {
                let txn = self.env().begin_ro_txn().expect("Failed to begin");
                let db = txn.open_existing_db(&self.name).expect("Failed to open");
                let expected = self.model.get(key).and_then(|values| values.first());
                match txn.get(&db, key) {
                    Ok(actual) => assert_eq!(Some(&actual.to_vec()), expected, "get {key:?}"),
                    Err(err) => {
                        assert!(err.is_not_found(), "get {key:?} failed: {err}");
                        assert_eq!(expected, None, "get {key:?} missed a value");
                    }
                }
            }
        }
    }

    fn remove_pair(&mut self, key: &[u8], value: &[u8]) -> bool {
        let Some(values) = self.model.get_mut(key) else {
            return false;
        };
        let before = values.len();
        values.retain(|v| v != value);
        let removed = values.len() != before;
        if values.is_empty() {
            self.model.remove(key);
        }
        removed
    }

    fn check_delete(result: CoreResult<()>, existed: bool) {
        match result {
            Ok(()) => assert!(existed, "delete succeeded on a missing record"),
            Err(err) => {
                assert!(err.is_not_found(), "delete failed: {err}");
                assert!(!existed, "delete missed an existing record");
            }
        }
    }

    /// Returns the number of records the model holds.
    pub fn expected_entries(&self) -> u64 {
        self.model.values().map(|values| values.len() as u64).sum()
    }

    /// Checks cursor order and entry count against the model.
    pub fn verify_all(&self) {
        let txn = self.env().begin_ro_txn().expect("Failed to begin");
        let db = txn.open_existing_db(&self.name).expect("Failed to open");

        let expected: Vec<(Vec<u8>, Vec<u8>)> = self
            .model
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key.clone(), value.clone())))
            .collect();
        let actual = collect_records(&txn, &db).expect("Failed to walk database");
        assert_eq!(actual, expected, "cursor order differs from model");

        let stat = txn.stat(&db).expect("Failed to read entry count");
        assert_eq!(stat.entries, self.expected_entries(), "entry count drifted");
    }
}

/// Transaction behaviour checks.
pub mod transaction {
    use super::*;
    use sqlmdb_core::CoreError;

    /// Tests that a read-only transaction keeps its snapshot while a
    /// writer commits.
    pub fn test_snapshot_isolation(env: &Environment) {
        env.transaction(|txn| {
            let db = txn.open_db("isolation_test", false)?;
            txn.put(&db, b"k", b"version1", WriteFlags::empty())
        })
        .expect("Failed to put initial data");

        let reader = env.begin_ro_txn().expect("Failed to begin reader");
        let db = reader
            .open_existing_db("isolation_test")
            .expect("Failed to open");
        assert_eq!(&reader.get(&db, b"k").expect("Failed to get")[..], b"version1");

        env.transaction(|txn| txn.put(&db, b"k", b"version2", WriteFlags::empty()))
            .expect("Failed to update");

        // The open reader still sees its snapshot.
        assert_eq!(&reader.get(&db, b"k").expect("Failed to get")[..], b"version1");
        reader.abort();

        let fresh = env.begin_ro_txn().expect("Failed to begin reader");
        assert_eq!(&fresh.get(&db, b"k").expect("Failed to get")[..], b"version2");
    }

    /// Tests that an aborted transaction leaves records and counts alone.
    pub fn test_transaction_abort(env: &Environment) {
        let db = env
            .transaction(|txn| {
                let db = txn.open_db("abort_test", true)?;
                txn.put(&db, b"k", b"original", WriteFlags::empty())?;
                Ok(db)
            })
            .expect("Failed to put initial data");

        let result: CoreResult<()> = env.transaction(|txn| {
            txn.put(&db, b"k", b"extra", WriteFlags::empty())?;
            txn.del(&db, b"k", Some(&b"original"[..]))?;
            Err(CoreError::corrupted("Simulated abort"))
        });
        assert!(result.is_err());

        let txn = env.begin_ro_txn().expect("Failed to begin");
        assert_eq!(
            collect_records(&txn, &db).expect("Failed to walk"),
            vec![(b"k".to_vec(), b"original".to_vec())]
        );
        assert_eq!(txn.stat(&db).expect("Failed to stat").entries, 1);
    }
}
