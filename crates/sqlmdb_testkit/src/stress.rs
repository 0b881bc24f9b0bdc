//! Stress tests for SQLMDB.
//!
//! These tests verify behavior under repeated and concurrent access. Every
//! worker thread draws sessions from the environment's pool; writers
//! serialize on the exclusive lock and wait within the busy timeout.

use crate::fixtures::scenarios::key_for;
use sqlmdb_core::{CoreError, Environment, WriteFlags};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Result of a stress test run.
#[derive(Debug, Clone)]
pub struct StressTestResult {
    /// Total operations performed.
    pub total_ops: usize,
    /// Successful operations.
    pub successful_ops: usize,
    /// Failed operations.
    pub failed_ops: usize,
    /// Total duration.
    pub duration: Duration,
}

impl StressTestResult {
    /// Creates a new result.
    pub fn new(successful: usize, failed: usize, duration: Duration) -> Self {
        Self {
            total_ops: successful + failed,
            successful_ops: successful,
            failed_ops: failed,
            duration,
        }
    }
}

/// Configuration for stress tests.
#[derive(Debug, Clone)]
pub struct StressConfig {
    /// Number of operations to perform.
    pub operations: usize,
    /// Number of concurrent threads (for concurrent tests).
    pub threads: usize,
    /// Size of values in bytes.
    pub value_size: usize,
    /// Number of distinct keys.
    pub key_count: usize,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            operations: 1_000,
            threads: 4,
            value_size: 256,
            key_count: 100,
        }
    }
}

fn tally<T>(result: Result<T, CoreError>, successful: &AtomicUsize, failed: &AtomicUsize) {
    match result {
        Ok(_) => successful.fetch_add(1, Ordering::Relaxed),
        Err(_) => failed.fetch_add(1, Ordering::Relaxed),
    };
}

/// Run a mixed put/get/delete stress test in one thread.
pub fn stress_mixed_operations(env: &Environment, config: &StressConfig) -> StressTestResult {
    let value = vec![0xABu8; config.value_size];
    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let start = Instant::now();

    for i in 0..config.operations {
        let key = key_for(i % config.key_count);
        let result = match i % 3 {
            0 => env.transaction(|txn| {
                let db = txn.open_db("stress", false)?;
                txn.put(&db, &key, &value, WriteFlags::empty())
            }),
            1 => env.begin_ro_txn().and_then(|txn| {
                let db = txn.open_existing_db("stress")?;
                match txn.get(&db, &key) {
                    Err(err) if !err.is_not_found() => Err(err),
                    _ => Ok(()),
                }
            }),
            _ => env.transaction(|txn| {
                let db = txn.open_db("stress", false)?;
                match txn.del(&db, &key, None) {
                    Err(err) if !err.is_not_found() => Err(err),
                    _ => Ok(()),
                }
            }),
        };
        tally(result, &successful, &failed);
    }

    StressTestResult::new(
        successful.into_inner(),
        failed.into_inner(),
        start.elapsed(),
    )
}

/// Run writers on several threads, each inserting its own keys into a
/// duplicate database.
pub fn stress_concurrent_writers(env: &Environment, config: &StressConfig) -> StressTestResult {
    env.transaction(|txn| txn.open_db("writers", true).map(|_| ()))
        .expect("Failed to create database");

    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let ops_per_thread = config.operations / config.threads;
    let start = Instant::now();

    thread::scope(|scope| {
        for t in 0..config.threads {
            let (successful, failed) = (&successful, &failed);
            scope.spawn(move || {
                for i in 0..ops_per_thread {
                    let result = env.transaction(|txn| {
                        let db = txn.open_existing_db("writers")?;
                        let value = format!("{t}:{i}");
                        txn.put(&db, &key_for(t), value.as_bytes(), WriteFlags::empty())
                    });
                    tally(result, successful, failed);
                }
            });
        }
    });

    StressTestResult::new(
        successful.into_inner(),
        failed.into_inner(),
        start.elapsed(),
    )
}

/// Run readers on several threads against a populated database.
pub fn stress_concurrent_reads(env: &Environment, config: &StressConfig) -> StressTestResult {
    let value = vec![0xCDu8; config.value_size];
    env.transaction(|txn| {
        let db = txn.open_db("readers", false)?;
        for i in 0..config.key_count {
            txn.put(&db, &key_for(i), &value, WriteFlags::empty())?;
        }
        Ok(())
    })
    .expect("Failed to populate database");

    let successful = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);
    let ops_per_thread = config.operations / config.threads;
    let start = Instant::now();

    thread::scope(|scope| {
        for t in 0..config.threads {
            let (successful, failed) = (&successful, &failed);
            scope.spawn(move || {
                for i in 0..ops_per_thread {
                    let key = key_for((t * ops_per_thread + i) % config.key_count);
                    let result = env.begin_ro_txn().and_then(|txn| {
                        let db = txn.open_existing_db("readers")?;
                        txn.get(&db, &key).map(|_| ())
                    });
                    tally(result, successful, failed);
                }
            });
        }
    });

    StressTestResult::new(
        successful.into_inner(),
        failed.into_inner(),
        start.elapsed(),
    )
}

/// Run a transaction abort stress test. Every other transaction fails on
/// purpose after writing.
pub fn stress_transaction_aborts(env: &Environment, config: &StressConfig) -> StressTestResult {
    let value = vec![0xEFu8; config.value_size];
    let mut successful = 0usize;
    let mut failed = 0usize;
    let start = Instant::now();

    for i in 0..config.operations {
        let should_fail = i % 2 == 0;
        let result = env.transaction(|txn| {
            let db = txn.open_db("aborts", true)?;
            txn.put(&db, &key_for(i), &value, WriteFlags::empty())?;
            if should_fail {
                Err(CoreError::corrupted("intentional"))
            } else {
                Ok(())
            }
        });

        match result {
            Ok(()) => successful += 1,
            Err(_) => failed += 1,
        }
    }

    StressTestResult::new(successful, failed, start.elapsed())
}
