//! Multi-rank placement: streaming, shipment, drain, and probe spill
//!
//! Every scenario asserts from both sides of the stripe boundary: the rank
//! that streamed a record and the rank that owns its final slot.

mod common;

use common::{key, rec, TestRecord};
use kmerdht::pgas;
use kmerdht::{DistHashTable, Status, TableOptions};

#[test]
fn test_cross_partition_streaming() {
    // N = 8 over two ranks: rank 0 owns slots 0..4, rank 1 owns 4..8.
    pgas::launch(2, |world| {
        let rank = world.rank();
        let mut table: DistHashTable<TestRecord> =
            DistHashTable::new(world, 8, TableOptions::default()).unwrap();

        if rank == 0 {
            table.insert(rec(0, 1)); // own stripe
            table.insert(rec(5, 2)); // rank 1's stripe: staged
        } else {
            table.insert(rec(1, 3)); // rank 0's stripe: staged
            table.insert(rec(6, 4)); // own stripe
        }

        // One local slot claimed, one record staged, nothing has crossed
        // the wire into a slot yet.
        if rank == 0 {
            assert!(table.slot_used(0));
            assert!(!table.slot_used(1));
            assert_eq!(table.staged_len(1), 1);
        } else {
            assert!(table.slot_used(6));
            assert!(!table.slot_used(5));
            assert_eq!(table.staged_len(0), 1);
        }

        table.finish_insert();

        // All four keys findable from both ranks.
        assert_eq!(table.find(&key(0, 1)), Some(rec(0, 1)));
        assert_eq!(table.find(&key(5, 2)), Some(rec(5, 2)));
        assert_eq!(table.find(&key(1, 3)), Some(rec(1, 3)));
        assert_eq!(table.find(&key(6, 4)), Some(rec(6, 4)));

        for slot in [0, 1, 5, 6] {
            assert!(table.slot_used(slot));
        }
        for slot in [2, 3, 4, 7] {
            assert!(!table.slot_used(slot));
        }
    });
}

#[test]
fn test_probe_spill_across_partition() {
    // Four records hash to slot 3, the last slot of rank 0's stripe. The
    // chain spills into rank 1's stripe: the spilled records travel through
    // the outbox, and rank 1's drain claims slots 4, 5, 6 locally.
    pgas::launch(2, |world| {
        let rank = world.rank();
        let mut table: DistHashTable<TestRecord> =
            DistHashTable::new(world, 8, TableOptions::default()).unwrap();

        if rank == 0 {
            for id in 1..=4u64 {
                assert_eq!(table.insert(rec(3, id)), Status::Ok);
            }
            assert!(table.slot_used(3));
            assert_eq!(table.staged_len(1), 3);
        }

        table.finish_insert();

        for slot in 3..=6 {
            assert!(table.slot_used(slot));
        }
        assert!(!table.slot_used(7));
        for id in 1..=4u64 {
            assert_eq!(table.find(&key(3, id)), Some(rec(3, id)));
        }
    });
}

#[test]
fn test_outbox_batching_through_overflow() {
    // Outboxes of four records: nine keys bound for rank 1 ship as two full
    // buffers during streaming plus one residual at the phase end.
    let options = TableOptions { outbox_capacity: 4 };
    pgas::launch(2, move |world| {
        let rank = world.rank();
        let mut table: DistHashTable<TestRecord> =
            DistHashTable::new(world, 32, options.clone()).unwrap();

        if rank == 0 {
            for id in 1..=9u64 {
                assert_eq!(table.insert(rec(16, id)), Status::Ok);
            }
            // Two shipments of four left one record staged.
            assert_eq!(table.staged_len(1), 1);
        }

        let status = table.finish_insert();
        assert_eq!(status, Status::Ok);

        if rank == 1 {
            assert_eq!(table.overflow_len(), 9);
        }
        for id in 1..=9u64 {
            assert_eq!(table.find(&key(16, id)), Some(rec(16, id)));
        }
        for slot in 16..25 {
            assert!(table.slot_used(slot));
        }
        assert!(!table.slot_used(25));
    });
}

#[test]
fn test_drain_wraps_past_partition_boundary() {
    // Nine records chase the eight slots at the end of the ring: one
    // claimed locally by rank 1 during streaming, eight shipped over from
    // rank 0. The last drained record wraps to slot 0, which rank 1 claims
    // remotely by compare-exchange.
    pgas::launch(2, |world| {
        let rank = world.rank();
        let mut table: DistHashTable<TestRecord> =
            DistHashTable::new(world, 16, TableOptions::default()).unwrap();

        if rank == 0 {
            for id in 1..=8u64 {
                assert_eq!(table.insert(rec(8, id)), Status::Ok);
            }
        } else {
            assert_eq!(table.insert(rec(8, 9)), Status::Ok);
            assert!(table.slot_used(8));
        }

        assert_eq!(table.finish_insert(), Status::Ok);

        for slot in 8..16 {
            assert!(table.slot_used(slot));
        }
        assert!(table.slot_used(0));
        for id in 1..=9u64 {
            assert_eq!(table.find(&key(8, id)), Some(rec(8, id)));
        }
    });
}

#[test]
fn test_single_slot_stripes() {
    // One slot per stripe: every record streams to a peer.
    pgas::launch(4, |world| {
        let rank = world.rank() as u64;
        let mut table: DistHashTable<TestRecord> =
            DistHashTable::new(world, 4, TableOptions::default()).unwrap();

        let hash = (rank + 1) % 4;
        assert_eq!(table.insert(rec(hash, rank + 1)), Status::Ok);
        table.finish_insert();

        for r in 0..4u64 {
            let hash = (r + 1) % 4;
            assert_eq!(table.find(&key(hash, r + 1)), Some(rec(hash, r + 1)));
        }
    });
}

#[test]
fn test_every_rank_sees_every_insert() {
    // Four ranks, one hundred records, arbitrary hashes: after the phase
    // barrier each rank observes the full set, no matter who inserted what.
    pgas::launch(4, |world| {
        let rank = world.rank() as u64;
        let mut table: DistHashTable<TestRecord> =
            DistHashTable::new(world, 512, TableOptions::default()).unwrap();

        for i in 0..25u64 {
            let id = rank * 100 + i + 1;
            assert_eq!(table.insert(rec(id.wrapping_mul(7919), id)), Status::Ok);
        }
        table.finish_insert();

        for r in 0..4u64 {
            for i in 0..25u64 {
                let id = r * 100 + i + 1;
                let k = key(id.wrapping_mul(7919), id);
                assert_eq!(table.find(&k), Some(rec(id.wrapping_mul(7919), id)));
            }
        }
        // Never inserted
        assert_eq!(table.find(&key(4242, 9999)), None);
    });
}

#[test]
fn test_overflow_saturation_is_fatal() {
    // Ten keys whose probes start in rank 0's stripe overrun it; six
    // records ship toward rank 1's four-slot overflow region. Both sides
    // report the overrun at the phase boundary.
    pgas::launch(2, |world| {
        let rank = world.rank();
        let mut table: DistHashTable<TestRecord> =
            DistHashTable::new(world, 8, TableOptions::default()).unwrap();

        if rank == 0 {
            for id in 1..=10u64 {
                assert_eq!(table.insert(rec(0, id)), Status::Ok);
            }
        }

        let status = table.finish_insert();
        if rank == 0 {
            // The residual shipment could not reserve space.
            assert_eq!(status, Status::OverflowFull);
        } else {
            // The counter overran this rank's region.
            assert_eq!(status, Status::OverflowFull);
        }
    });
}
