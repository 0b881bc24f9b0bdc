//! Core value types.

use bitflags::bitflags;
use bytes::Bytes;

bitflags! {
    /// Flags accepted by [`Transaction::put`](crate::Transaction::put).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct WriteFlags: u32 {
        /// Fail with `KeyExist` if the key is already present.
        const NO_OVERWRITE = 0x10;
        /// Fail with `KeyExist` if the exact key/value pair is already
        /// present. Only meaningful for duplicate databases.
        const NO_DUP_DATA = 0x20;
    }
}

/// A key/value pair read from a database.
///
/// Both halves are views into the owning transaction's arena.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// The key.
    pub key: Bytes,
    /// The value.
    pub value: Bytes,
}

/// Cursor positioning operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorOp {
    /// Position at the first row.
    First,
    /// Position at the last row.
    Last,
    /// Advance one row.
    Next,
    /// Step back one row.
    Prev,
    /// Advance to the next row with the same key.
    NextDup,
    /// Return the current row.
    GetCurrent,
    /// Position at the first row with exactly this key.
    Set,
    /// Like `Set`, returning the key as stored.
    SetKey,
    /// Position at the first row whose key is greater than or equal to this key.
    SetRange,
}

impl CursorOp {
    /// Returns true if the operation needs a key argument.
    #[must_use]
    pub fn takes_key(self) -> bool {
        matches!(self, Self::Set | Self::SetKey | Self::SetRange)
    }
}

/// Statistics for a single database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stat {
    /// Number of live records.
    pub entries: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_flags_match_lmdb_values() {
        assert_eq!(WriteFlags::NO_OVERWRITE.bits(), 0x10);
        assert_eq!(WriteFlags::NO_DUP_DATA.bits(), 0x20);
        assert!(WriteFlags::default().is_empty());
    }

    #[test]
    fn keyed_ops() {
        assert!(CursorOp::SetRange.takes_key());
        assert!(CursorOp::Set.takes_key());
        assert!(!CursorOp::Next.takes_key());
    }
}
