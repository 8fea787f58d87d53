//! SPMD world: rank identity, collectives, and one-sided transfers
//!
//! `launch` runs the same closure on every rank, each on its own OS thread,
//! over a shared segment registry. A `World` is one rank's handle into that
//! job; it is single-threaded by construction and every remote operation
//! blocks until complete.

use std::any::Any;
use std::panic;
use std::ptr;
use std::sync::{Arc, Barrier};
use std::thread;

use parking_lot::Mutex;

use crate::constants::CACHE_LINE_BYTES;
use crate::pgas::GlobalPtr;
use crate::utility::AlignedBuffer;

/// State shared by every rank of a job.
struct WorldShared {
    ranks: usize,
    barrier: Barrier,
    /// Keeps every global allocation alive until the job tears down.
    segments: Mutex<Vec<AlignedBuffer>>,
    /// Rendezvous slot for broadcast.
    bcast_slot: Mutex<Option<Box<dyn Any + Send>>>,
}

/// One rank's handle to the global address space.
pub struct World {
    rank: usize,
    shared: Arc<WorldShared>,
}

impl World {
    /// This rank's index in `[0, ranks)`.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of ranks in the job.
    #[inline]
    pub fn ranks(&self) -> usize {
        self.shared.ranks
    }

    /// Collective barrier: returns once every rank has entered.
    pub fn barrier(&self) {
        self.shared.barrier.wait();
    }

    /// Collective broadcast of `value` from `root` to every rank.
    ///
    /// Every rank passes its local `value`; the root's copy is the one
    /// returned everywhere.
    pub fn broadcast<T: Copy + Send + 'static>(&self, value: T, root: usize) -> T {
        debug_assert!(root < self.ranks());
        if self.rank == root {
            *self.shared.bcast_slot.lock() = Some(Box::new(value));
        }
        self.barrier();
        let out = {
            let slot = self.shared.bcast_slot.lock();
            let boxed = slot.as_ref().expect("broadcast slot empty");
            *boxed
                .downcast_ref::<T>()
                .expect("broadcast type mismatch between ranks")
        };
        // The slot may not be reused until every rank has read it.
        self.barrier();
        out
    }

    /// Allocate a zero-initialized global array of `len` elements in this
    /// rank's segment and return its base address.
    ///
    /// The storage lives until the job tears down. Returns `None` if the
    /// allocation fails.
    pub fn alloc<T: Copy>(&self, len: usize) -> Option<GlobalPtr<T>> {
        debug_assert!(len > 0);
        let align = CACHE_LINE_BYTES.max(std::mem::align_of::<T>());
        let buf = AlignedBuffer::zeroed(align, len * std::mem::size_of::<T>())?;
        let base = buf.as_mut_ptr() as *mut T;
        self.shared.segments.lock().push(buf);
        Some(GlobalPtr::new(self.rank, base))
    }

    /// One-sided blocking read of a single element.
    #[inline]
    pub fn get<T: Copy>(&self, src: GlobalPtr<T>) -> T {
        unsafe { ptr::read(src.raw()) }
    }

    /// One-sided blocking read of `dst.len()` contiguous elements.
    #[inline]
    pub fn get_slice<T: Copy>(&self, src: GlobalPtr<T>, dst: &mut [T]) {
        unsafe {
            ptr::copy_nonoverlapping(src.raw() as *const T, dst.as_mut_ptr(), dst.len());
        }
    }

    /// One-sided blocking write of a single element.
    #[inline]
    pub fn put<T: Copy>(&self, value: T, dst: GlobalPtr<T>) {
        unsafe {
            ptr::write(dst.raw(), value);
        }
    }

    /// One-sided blocking write of `src.len()` contiguous elements.
    #[inline]
    pub fn put_slice<T: Copy>(&self, src: &[T], dst: GlobalPtr<T>) {
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), dst.raw(), src.len());
        }
    }
}

/// Run `f(world)` on every rank of a `ranks`-wide job, one OS thread per
/// rank, and return each rank's result in rank order.
///
/// Panics on a rank are resumed on the launching thread after the other
/// ranks have been joined.
pub fn launch<F, T>(ranks: usize, f: F) -> Vec<T>
where
    F: Fn(World) -> T + Send + Sync,
    T: Send,
{
    assert!(ranks > 0, "a job needs at least one rank");

    let shared = Arc::new(WorldShared {
        ranks,
        barrier: Barrier::new(ranks),
        segments: Mutex::new(Vec::new()),
        bcast_slot: Mutex::new(None),
    });

    thread::scope(|scope| {
        let handles: Vec<_> = (0..ranks)
            .map(|rank| {
                let shared = Arc::clone(&shared);
                let f = &f;
                scope.spawn(move || f(World { rank, shared }))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
        results
            .into_iter()
            .map(|r| match r {
                Ok(value) => value,
                Err(payload) => panic::resume_unwind(payload),
            })
            .collect()
    })
}
