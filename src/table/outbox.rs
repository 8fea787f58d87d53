//! Per-target staging of records awaiting bulk shipment
//!
//! During the streaming phase a rank never places records into another
//! rank's stripe directly; it appends them here, one buffer per destination,
//! and ships a whole buffer at a time into the destination's overflow
//! region. Buffers are allocated once at construction and reused across
//! shipments.

/// Per-target staging buffers of fixed capacity.
pub struct Outbox<R> {
    buffers: Vec<Vec<R>>,
    capacity: usize,
}

impl<R: Copy> Outbox<R> {
    /// Create one buffer per target, each holding up to `capacity` records.
    pub fn new(targets: usize, capacity: usize) -> Self {
        Self {
            buffers: (0..targets).map(|_| Vec::with_capacity(capacity)).collect(),
            capacity,
        }
    }

    /// Append `record` to the buffer for `target`.
    ///
    /// Returns `true` when the deposit filled the buffer and it must be
    /// shipped before the next deposit.
    #[inline]
    pub fn deposit(&mut self, target: usize, record: R) -> bool {
        let buffer = &mut self.buffers[target];
        debug_assert!(buffer.len() < self.capacity);
        buffer.push(record);
        buffer.len() == self.capacity
    }

    /// The records currently staged for `target`.
    #[inline]
    pub fn records(&self, target: usize) -> &[R] {
        &self.buffers[target]
    }

    /// Number of records currently staged for `target`.
    #[inline]
    pub fn len(&self, target: usize) -> usize {
        self.buffers[target].len()
    }

    /// Whether nothing is staged for `target`.
    #[inline]
    pub fn is_empty(&self, target: usize) -> bool {
        self.buffers[target].is_empty()
    }

    /// Reset the buffer for `target` after a shipment, keeping its storage.
    #[inline]
    pub fn clear(&mut self, target: usize) {
        self.buffers[target].clear();
    }

    /// Number of targets.
    #[inline]
    pub fn targets(&self) -> usize {
        self.buffers.len()
    }
}
