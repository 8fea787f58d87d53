//! The distributed open-addressing hash table
//!
//! Records are striped across ranks in contiguous blocks and placed by
//! linear probing from the key hash. The insert phase is two-stage: a rank
//! claims slots in its own stripe directly (no atomics beyond a local
//! exchange, no remote traffic) and stages records bound for other stripes
//! in per-target outboxes, shipped wholesale into the owners' overflow
//! regions. `finish_insert` flushes the outboxes, synchronizes, and each
//! rank drains its own overflow into real slots; only probe sequences that
//! spill past a stripe boundary during the drain touch remote slots, via
//! compare-exchange.
//!
//! The table is insert-once: each key is inserted at most once across the
//! whole job, there is no deletion, and the slot array never grows.

mod addressing;
mod outbox;

use tracing::{debug, error};

use crate::config::TableOptions;
use crate::pgas::{AtomicDomain, GlobalPtr, World};
use crate::record::{SlotKey, SlotRecord};
use crate::status::Status;

pub use addressing::SlotSpace;
pub use outbox::Outbox;

/// A hash table partitioned over every rank of a world.
///
/// Construction and [`finish_insert`](Self::finish_insert) are collective;
/// [`insert`](Self::insert) and [`find`](Self::find) are not. Lookups are
/// only defined after `finish_insert` has returned on every rank.
pub struct DistHashTable<R: SlotRecord> {
    world: World,
    ad: AtomicDomain,
    space: SlotSpace,
    /// Per-rank base addresses of the record stripes.
    data: Vec<GlobalPtr<R>>,
    /// Per-rank base addresses of the occupancy flags (0 = empty, 1 = claimed).
    used: Vec<GlobalPtr<i64>>,
    /// Per-rank overflow regions; empty in a single-rank world.
    overflow: Vec<GlobalPtr<R>>,
    /// Per-rank overflow counters; empty in a single-rank world.
    overflow_count: Vec<GlobalPtr<i64>>,
    outbox: Outbox<R>,
}

impl<R: SlotRecord> DistHashTable<R> {
    /// Collectively construct a table with at least `n` slots.
    ///
    /// Every rank of `world` must call this with the same arguments. The
    /// capacity is rounded up to a multiple of the rank count; each rank
    /// contributes one stripe of records, occupancy flags, and (in
    /// multi-rank worlds) an overflow region, and publishes their base
    /// addresses to every peer.
    pub fn new(world: World, n: u64, options: TableOptions) -> Result<Self, Status> {
        if n == 0 {
            return Err(Status::InvalidArgument);
        }
        let ranks = world.ranks();
        if ranks > 1 && options.outbox_capacity == 0 {
            return Err(Status::InvalidArgument);
        }
        let space = SlotSpace::new(n, ranks as u64);
        let stripe = space.stripe() as usize;

        let local_data = world.alloc::<R>(stripe).ok_or(Status::OutOfMemory)?;
        let local_used = world.alloc::<i64>(stripe).ok_or(Status::OutOfMemory)?;

        let mut data = Vec::with_capacity(ranks);
        let mut used = Vec::with_capacity(ranks);
        for root in 0..ranks {
            data.push(world.broadcast(local_data, root));
            used.push(world.broadcast(local_used, root));
        }

        // A single-rank table resolves every probe locally and never stages.
        let (overflow, overflow_count, outbox) = if ranks > 1 {
            let local_overflow = world.alloc::<R>(stripe).ok_or(Status::OutOfMemory)?;
            let local_count = world.alloc::<i64>(1).ok_or(Status::OutOfMemory)?;

            let mut overflow = Vec::with_capacity(ranks);
            let mut overflow_count = Vec::with_capacity(ranks);
            for root in 0..ranks {
                overflow.push(world.broadcast(local_overflow, root));
                overflow_count.push(world.broadcast(local_count, root));
            }
            (
                overflow,
                overflow_count,
                Outbox::new(ranks, options.outbox_capacity),
            )
        } else {
            (Vec::new(), Vec::new(), Outbox::new(1, 0))
        };

        Ok(Self {
            world,
            ad: AtomicDomain::new(),
            space,
            data,
            used,
            overflow,
            overflow_count,
            outbox,
        })
    }

    /// Insert a record during the streaming phase.
    ///
    /// Records hashing into this rank's stripe are placed immediately;
    /// records bound for other stripes are staged and resolved by the owner
    /// during [`finish_insert`](Self::finish_insert).
    ///
    /// Returns `TableFull` when the probe walked the whole ring without a
    /// claim, and `OverflowFull` when staging forced a shipment that
    /// saturated the target's overflow region; both are fatal for the job.
    pub fn insert(&mut self, record: R) -> Status {
        self.probe_insert(record, false)
    }

    /// Collective end of the insert phase.
    ///
    /// Flushes every non-empty outbox, waits for all shipments globally,
    /// then drains this rank's overflow region into slots. After the final
    /// barrier the table is queryable on every rank: every record inserted
    /// by any rank before it entered `finish_insert` is visible to every
    /// subsequent [`find`](Self::find).
    pub fn finish_insert(&mut self) -> Status {
        let mut status = Status::Ok;

        if self.world.ranks() > 1 {
            let me = self.world.rank();

            // Flush residual outboxes; zero-length shipments are skipped.
            for target in 0..self.world.ranks() {
                if target != me && !self.outbox.is_empty(target) {
                    let shipped = self.ship(target);
                    if shipped.is_error() {
                        status = shipped;
                    }
                }
            }

            // Every shipment is globally visible past this point.
            self.world.barrier();

            let count = self.ad.load(self.overflow_count[me]);
            if count > self.space.stripe() as i64 {
                // A shipper overran the region; its records were never
                // written. Nothing here is safe to drain.
                error!(
                    rank = me,
                    count,
                    stripe = self.space.stripe(),
                    "overflow counter exceeds region; shipments were lost"
                );
                status = Status::OverflowFull;
            } else {
                debug!(rank = me, count, "draining overflow region");
                for i in 0..count {
                    let record = self.world.get(self.overflow[me] + i as u64);
                    let drained = self.probe_insert(record, true);
                    if drained.is_error() {
                        status = drained;
                    }
                }
            }
        }

        // Drain writes into remote stripes must land before any rank reads.
        self.world.barrier();
        status
    }

    /// Look up a record by key.
    ///
    /// Probes the canonical slot sequence with one-sided reads and compares
    /// keys. The probe does not stop at empty slots: the two-pass insert
    /// fills slots out of insertion order, so an empty slot mid-probe says
    /// nothing about absence. Worst case walks the full ring; callers keep
    /// the load factor low to keep expected cost constant.
    ///
    /// Only defined after `finish_insert` has returned on every rank.
    pub fn find(&self, key: &R::Key) -> Option<R> {
        let hash = key.hash();
        for p in 0..self.space.capacity() {
            let slot = self.space.probe(hash, p);
            let record = self.world.get(self.data_addr(slot));
            if record.key() == *key {
                return Some(record);
            }
        }
        None
    }

    /// Total number of slots in the table.
    #[inline]
    pub fn size(&self) -> u64 {
        self.space.capacity()
    }

    /// This rank's handle to the world the table lives in.
    #[inline]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Whether `slot` has been claimed (diagnostic; works on any rank's
    /// stripe).
    pub fn slot_used(&self, slot: u64) -> bool {
        self.ad.load(self.used_addr(slot)) != 0
    }

    /// Number of records currently staged for `target` (diagnostic).
    pub fn staged_len(&self, target: usize) -> usize {
        self.outbox.len(target)
    }

    /// Number of records shipped into this rank's overflow region
    /// (diagnostic).
    pub fn overflow_len(&self) -> u64 {
        if self.world.ranks() > 1 {
            self.ad.load(self.overflow_count[self.world.rank()]) as u64
        } else {
            0
        }
    }

    #[inline]
    fn data_addr(&self, slot: u64) -> GlobalPtr<R> {
        self.data[self.space.node(slot)] + self.space.offset(slot)
    }

    #[inline]
    fn used_addr(&self, slot: u64) -> GlobalPtr<i64> {
        self.used[self.space.node(slot)] + self.space.offset(slot)
    }

    /// Claim a slot in this rank's own stripe: check the flag, then take it
    /// with a plain exchange. No compare round-trip, no remote traffic.
    fn claim_local(&self, slot: u64) -> bool {
        let addr = self.used_addr(slot);
        if self.ad.load(addr) != 0 {
            return false;
        }
        self.ad.exchange(addr, 1) == 0
    }

    /// Claim a slot in another rank's stripe: compare-exchange 0 -> 1.
    /// Success means this rank performed the slot's only claim.
    fn claim_remote(&self, slot: u64) -> bool {
        self.ad.compare_exchange(self.used_addr(slot), 0, 1) == 0
    }

    /// Probe from the record's hash and place it.
    ///
    /// Streaming (`draining == false`): local slots are claimed directly;
    /// the first remote slot diverts the record to the owner's outbox
    /// without advancing the probe (the owner resumes it during the drain).
    /// Draining (`draining == true`): remote slots are claimed by
    /// compare-exchange, since a probe sequence that spills past a stripe
    /// boundary may now target any rank.
    fn probe_insert(&mut self, record: R, draining: bool) -> Status {
        let hash = record.key_hash();
        let me = self.world.rank();
        for p in 0..self.space.capacity() {
            let slot = self.space.probe(hash, p);
            let owner = self.space.node(slot);
            if owner == me {
                if self.claim_local(slot) {
                    self.world.put(record, self.data_addr(slot));
                    return Status::Ok;
                }
            } else if !draining {
                return self.stage(owner, record);
            } else if self.claim_remote(slot) {
                self.world.put(record, self.data_addr(slot));
                return Status::Ok;
            }
        }
        Status::TableFull
    }

    /// Stage a record for `target`, shipping the outbox if the deposit
    /// filled it.
    fn stage(&mut self, target: usize, record: R) -> Status {
        if self.outbox.deposit(target, record) {
            return self.ship(target);
        }
        Status::Ok
    }

    /// Ship everything staged for `target` into its overflow region.
    ///
    /// The fetch-add pre-reserves the destination range, so concurrent
    /// shippers from different ranks never overlap.
    fn ship(&mut self, target: usize) -> Status {
        let records = self.outbox.records(target);
        debug_assert!(!records.is_empty());

        let len = records.len() as i64;
        let offset = self.ad.fetch_add(self.overflow_count[target], len);
        if offset + len > self.space.stripe() as i64 {
            error!(
                to = target,
                offset,
                len,
                stripe = self.space.stripe(),
                "overflow region saturated; table undersized for workload"
            );
            return Status::OverflowFull;
        }

        debug!(to = target, offset, len, "shipping staged records");
        self.world.put_slice(records, self.overflow[target] + offset as u64);
        self.outbox.clear(target);
        Status::Ok
    }
}
