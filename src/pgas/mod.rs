//! Shared-memory PGAS runtime
//!
//! The runtime services the table is built on: an SPMD world of `P` ranks
//! (one OS thread per rank, one logical thread of control per rank), global
//! array allocation, one-sided blocking gets and puts, a remote atomic
//! domain, broadcast, and a collective barrier.
//!
//! Remote operations complete before control returns to the caller, in
//! issue order per rank. Plain gets and puts carry no ordering of their
//! own: conflicting accesses to the same range must be ordered through the
//! [`AtomicDomain`] or a collective, which is exactly what the table's
//! claim-before-write protocol and phase barrier do.

mod atomic;
mod global_ptr;
mod world;

pub use atomic::AtomicDomain;
pub use global_ptr::GlobalPtr;
pub use world::{launch, World};
