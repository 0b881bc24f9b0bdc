//! Property-based test generators using proptest.
//!
//! Keys are drawn from a small alphabet so generated operations collide
//! often enough to exercise overwrites, duplicates and deletes.

use proptest::prelude::*;

/// Strategy for generating database names.
pub fn db_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for generating keys, including the empty key.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(prop::sample::select(vec![0x00u8, 0x01, b'a', b'b', 0x7f, 0xff]), 0..4)
}

/// Strategy for generating arbitrary values.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..64)
}

/// A single key-value operation.
#[derive(Debug, Clone)]
pub enum KvOperation {
    /// Store a value.
    Put {
        /// Key.
        key: Vec<u8>,
        /// Value.
        value: Vec<u8>,
    },
    /// Delete every record under a key.
    Del {
        /// Key.
        key: Vec<u8>,
    },
    /// Delete one key/value pair.
    DelPair {
        /// Key.
        key: Vec<u8>,
        /// Value.
        value: Vec<u8>,
    },
    /// Read a key.
    Get {
        /// Key.
        key: Vec<u8>,
    },
}

/// Strategy for generating key-value operations.
pub fn kv_operation_strategy() -> impl Strategy<Value = KvOperation> {
    let small_value = prop::collection::vec(0u8..4, 0..2);
    prop_oneof![
        4 => (key_strategy(), value_strategy())
            .prop_map(|(key, value)| KvOperation::Put { key, value }),
        2 => (key_strategy(), small_value.clone())
            .prop_map(|(key, value)| KvOperation::Put { key, value }),
        1 => key_strategy().prop_map(|key| KvOperation::Del { key }),
        1 => (key_strategy(), small_value)
            .prop_map(|(key, value)| KvOperation::DelPair { key, value }),
        2 => key_strategy().prop_map(|key| KvOperation::Get { key }),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<KvOperation>> {
    prop::collection::vec(kv_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #![proptest_config(PropTestConfig::quick().to_proptest_config())]

        #[test]
        fn db_name_is_valid(name in db_name_strategy()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.len() <= 32);
            prop_assert!(name.chars().next().is_some_and(|c| c.is_ascii_alphabetic()));
        }

        #[test]
        fn keys_are_short(key in key_strategy()) {
            prop_assert!(key.len() < 4);
        }
    }
}
