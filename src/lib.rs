//! kmerdht - A distributed open-addressing hash table for parallel de Bruijn
//! graph assembly
//!
//! The table stores fixed-width k-mer records keyed by a canonical k-mer,
//! striped in contiguous blocks across `P` cooperating ranks that share a
//! global address space through one-sided gets/puts and remote atomics.
//!
//! Two phases run against it:
//! - a bulk **insert phase** where every rank streams k-mers drawn from
//!   arbitrary partitions, batching remote placements through per-target
//!   outboxes and per-rank overflow regions instead of paying a network
//!   round-trip per insert, and
//! - a **lookup phase** where every rank walks chains of k-mers, each lookup
//!   possibly crossing partitions.
//!
//! # Quick Start
//!
//! ```rust
//! use kmerdht::pgas;
//! use kmerdht::prelude::*;
//!
//! let found = pgas::launch(2, |world| {
//!     let rank = world.rank();
//!     let mut table: KmerDht =
//!         DistHashTable::new(world, 1024, TableOptions::default()).unwrap();
//!
//!     let kmer: PackedKmer = "ACGTACGTACGTACGTACG".parse().unwrap();
//!     let record = KmerRecord::from_parts(kmer, b'F', b'F');
//!     if rank == 0 {
//!         assert!(table.insert(record).is_ok());
//!     }
//!     table.finish_insert();
//!
//!     table.find(&record.key()).is_some()
//! });
//! assert!(found.iter().all(|f| *f));
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod kmer;
pub mod pgas;
pub mod record;
pub mod status;
pub mod table;
mod utility;

// Re-exports for convenience
pub use config::{ConfigError, KmerDhtConfig, TableOptions};
pub use kmer::{KmerRecord, PackedKmer};
pub use record::{SlotKey, SlotRecord};
pub use status::Status;
pub use table::DistHashTable;

/// The distributed k-mer hash table used by the assembly driver.
pub type KmerDht = DistHashTable<KmerRecord>;

/// Constants used throughout the library
pub mod constants {
    /// Size of a cache line in bytes
    pub const CACHE_LINE_BYTES: usize = 64;

    /// Default capacity of one per-target outbox, in records
    pub const DEFAULT_OUTBOX_CAPACITY: usize = 80_000;

    /// Fixed k-mer length, in bases
    pub const KMER_LEN: usize = 19;
}

/// Prelude module for common imports
pub mod prelude {
    pub use crate::config::TableOptions;
    pub use crate::kmer::{KmerRecord, PackedKmer};
    pub use crate::pgas::{AtomicDomain, GlobalPtr, World};
    pub use crate::record::{SlotKey, SlotRecord};
    pub use crate::status::Status;
    pub use crate::table::DistHashTable;
    pub use crate::KmerDht;
}
