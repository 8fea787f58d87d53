//! Shared helpers for integration tests
//!
//! Test records carry their hash explicitly so probe scenarios can name
//! slots literally. Ids start at 1: the all-zero key stands for an
//! unclaimed slot and must never be a live key.

#![allow(dead_code)]

use kmerdht::{SlotKey, SlotRecord};

/// A key with a chosen probe hash.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct TestKey {
    pub hash: u64,
    pub id: u64,
}

impl SlotKey for TestKey {
    fn hash(&self) -> u64 {
        self.hash
    }
}

/// A fixed-width record with a chosen hash and a payload to verify
/// round-trips.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct TestRecord {
    pub key: TestKey,
    pub payload: u64,
}

impl SlotRecord for TestRecord {
    type Key = TestKey;

    fn key(&self) -> TestKey {
        self.key
    }
}

/// Build a record with the given probe hash and id (`id >= 1`).
pub fn rec(hash: u64, id: u64) -> TestRecord {
    assert!(id >= 1, "id 0 is reserved for empty slots");
    TestRecord {
        key: TestKey { hash, id },
        payload: id.wrapping_mul(0x9e3779b97f4a7c15),
    }
}

/// The key of `rec(hash, id)`.
pub fn key(hash: u64, id: u64) -> TestKey {
    TestKey { hash, id }
}
