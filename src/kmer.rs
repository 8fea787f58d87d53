//! Packed k-mers and the fixed-width records stored in the table
//!
//! A k-mer is a fixed-length string over `{A, C, G, T}`. Bases are packed
//! two bits each into `u64` words so records stay trivially copyable and
//! cheap to move over the one-sided transport. A record carries the k-mer
//! plus its backward and forward extension bases; the lookup phase follows
//! forward extensions to walk a contig k-mer by k-mer.
//!
//! The all-zero packing decodes to the all-`A` k-mer, which is what an
//! unclaimed table slot reads back as. Drivers must not insert or look up
//! the all-`A` k-mer.

use std::fmt;
use std::mem;
use std::str::FromStr;

use crate::constants::KMER_LEN;
use crate::record::{SlotKey, SlotRecord};
use crate::status::Status;
use crate::utility::{hash_combine, murmur3_finalize};

/// Number of `u64` words needed to pack [`KMER_LEN`] bases
pub const KMER_WORDS: usize = (KMER_LEN + 31) / 32;

/// Extension byte marking a contig endpoint
pub const TERMINAL_EXT: u8 = b'F';

/// Encode one base character to its 2-bit code
#[inline]
const fn encode_base(base: u8) -> Option<u64> {
    match base {
        b'A' => Some(0),
        b'C' => Some(1),
        b'G' => Some(2),
        b'T' => Some(3),
        _ => None,
    }
}

/// Decode a 2-bit code back to its base character
#[inline]
const fn decode_base(code: u64) -> u8 {
    match code & 0b11 {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        _ => b'T',
    }
}

/// A fixed-length k-mer packed two bits per base.
///
/// Base `i` occupies bits `2*(i % 32)..` of word `i / 32`; bits beyond
/// [`KMER_LEN`] bases are always zero, so equality and hashing operate on
/// the packed words directly.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedKmer {
    words: [u64; KMER_WORDS],
}

// PackedKmer moves over the wire as raw words
const _: () = assert!(mem::size_of::<PackedKmer>() == 8 * KMER_WORDS);

impl PackedKmer {
    /// Pack a byte string of exactly [`KMER_LEN`] bases.
    ///
    /// Returns `Status::InvalidArgument` on a wrong length or a character
    /// outside `ACGT`.
    pub fn from_bases(bases: &[u8]) -> Result<Self, Status> {
        if bases.len() != KMER_LEN {
            return Err(Status::InvalidArgument);
        }
        let mut words = [0u64; KMER_WORDS];
        for (i, &base) in bases.iter().enumerate() {
            let code = encode_base(base).ok_or(Status::InvalidArgument)?;
            words[i / 32] |= code << (2 * (i % 32));
        }
        Ok(Self { words })
    }

    /// Get base `i` as its character (`b'A'`..`b'T'`).
    #[inline]
    pub fn base(&self, i: usize) -> u8 {
        debug_assert!(i < KMER_LEN);
        decode_base(self.words[i / 32] >> (2 * (i % 32)))
    }

    /// The k-mer one base further along a contig: drop the first base,
    /// append `base` at the end.
    pub fn shift_append(&self, base: u8) -> Result<Self, Status> {
        let code = encode_base(base).ok_or(Status::InvalidArgument)?;
        let mut words = [0u64; KMER_WORDS];
        for w in 0..KMER_WORDS {
            words[w] = self.words[w] >> 2;
            if w + 1 < KMER_WORDS {
                words[w] |= (self.words[w + 1] & 0b11) << 62;
            }
        }
        let last = KMER_LEN - 1;
        words[last / 32] |= code << (2 * (last % 32));
        Ok(Self { words })
    }

    /// The packed words.
    #[inline]
    pub fn words(&self) -> &[u64; KMER_WORDS] {
        &self.words
    }
}

impl SlotKey for PackedKmer {
    /// Hash of the packed words, spread with the murmur3 finalizer.
    #[inline]
    fn hash(&self) -> u64 {
        let mut h = murmur3_finalize(self.words[0]);
        let mut w = 1;
        while w < KMER_WORDS {
            h = hash_combine(h, murmur3_finalize(self.words[w]));
            w += 1;
        }
        h
    }
}

impl FromStr for PackedKmer {
    type Err = Status;

    fn from_str(s: &str) -> Result<Self, Status> {
        Self::from_bases(s.as_bytes())
    }
}

impl fmt::Display for PackedKmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for i in 0..KMER_LEN {
            write!(f, "{}", self.base(i) as char)?;
        }
        Ok(())
    }
}

impl fmt::Debug for PackedKmer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PackedKmer({})", self)
    }
}

/// A fixed-width k-mer record: the k-mer plus its backward and forward
/// extension bases.
///
/// [`TERMINAL_EXT`] in place of an extension marks a contig endpoint.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct KmerRecord {
    kmer: PackedKmer,
    /// Backward then forward extension
    ext: [u8; 2],
}

impl KmerRecord {
    /// Build a record from a k-mer and its extensions.
    pub fn from_parts(kmer: PackedKmer, backward_ext: u8, forward_ext: u8) -> Self {
        Self {
            kmer,
            ext: [backward_ext, forward_ext],
        }
    }

    /// The k-mer this record keys on.
    #[inline]
    pub fn kmer(&self) -> &PackedKmer {
        &self.kmer
    }

    /// The backward extension base.
    #[inline]
    pub fn backward_ext(&self) -> u8 {
        self.ext[0]
    }

    /// The forward extension base.
    #[inline]
    pub fn forward_ext(&self) -> u8 {
        self.ext[1]
    }

    /// Whether the contig ends at this record.
    #[inline]
    pub fn is_forward_terminal(&self) -> bool {
        self.ext[1] == TERMINAL_EXT
    }

    /// Whether the contig starts at this record.
    #[inline]
    pub fn is_backward_terminal(&self) -> bool {
        self.ext[0] == TERMINAL_EXT
    }

    /// The key of the next record along the contig, or `None` at a forward
    /// terminal.
    pub fn next_kmer(&self) -> Option<PackedKmer> {
        if self.is_forward_terminal() {
            return None;
        }
        // The forward extension is a valid base for every non-terminal record
        self.kmer.shift_append(self.ext[1]).ok()
    }
}

impl SlotRecord for KmerRecord {
    type Key = PackedKmer;

    #[inline]
    fn key(&self) -> PackedKmer {
        self.kmer
    }
}
