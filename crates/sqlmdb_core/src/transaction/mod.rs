//! Transactions.
//!
//! SQLMDB transactions map one-to-one onto SQLite transactions:
//! - **Read-only**: deferred begin plus an immediate read, pinning a
//!   snapshot of the last committed state
//! - **Writable**: exclusive begin, so writers are serialized by the engine
//! - **Abort**: rollback; also performed when a transaction is dropped
//!
//! Blocking on a lock is bounded by the environment's busy timeout.

mod arena;
mod state;

pub use state::Transaction;
