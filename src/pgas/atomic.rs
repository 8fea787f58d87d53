//! Remote atomic domain
//!
//! A single domain of atomic operations over `i64` cells in the global
//! address space. The table funnels both kinds of shared mutation through
//! it: compare-exchange on slot-occupancy flags and fetch-add reservations
//! on overflow counters.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::pgas::GlobalPtr;

/// Domain of remote atomic operations on `i64` cells.
///
/// Cells must live in zero-initialized global arrays allocated with
/// [`World::alloc`](super::World::alloc); the domain gives them their atomic
/// identity, so every non-collective access to such a cell must go through
/// the domain.
#[derive(Debug, Default)]
pub struct AtomicDomain(());

impl AtomicDomain {
    /// Create the domain.
    pub fn new() -> Self {
        Self(())
    }

    #[inline]
    fn cell(&self, ptr: GlobalPtr<i64>) -> &AtomicI64 {
        // Safety: `ptr` addresses a live, 8-byte-aligned cell in a shared
        // segment, and all access to it is funneled through this domain.
        unsafe { AtomicI64::from_ptr(ptr.raw()) }
    }

    /// Atomically replace `expected` with `desired`, returning the previous
    /// value. The exchange succeeded iff the return value equals `expected`.
    ///
    /// Release ordering on success; acquire on failure.
    #[inline]
    pub fn compare_exchange(&self, ptr: GlobalPtr<i64>, expected: i64, desired: i64) -> i64 {
        match self
            .cell(ptr)
            .compare_exchange(expected, desired, Ordering::Release, Ordering::Acquire)
        {
            Ok(previous) => previous,
            Err(previous) => previous,
        }
    }

    /// Atomically add `delta`, returning the previous value (AcqRel).
    #[inline]
    pub fn fetch_add(&self, ptr: GlobalPtr<i64>, delta: i64) -> i64 {
        self.cell(ptr).fetch_add(delta, Ordering::AcqRel)
    }

    /// Atomically swap in `value`, returning the previous value (AcqRel).
    ///
    /// This is the owner-side claim primitive: a plain exchange on a cell in
    /// the caller's own stripe, with no compare round-trip.
    #[inline]
    pub fn exchange(&self, ptr: GlobalPtr<i64>, value: i64) -> i64 {
        self.cell(ptr).swap(value, Ordering::AcqRel)
    }

    /// Atomic acquire load.
    #[inline]
    pub fn load(&self, ptr: GlobalPtr<i64>) -> i64 {
        self.cell(ptr).load(Ordering::Acquire)
    }
}
