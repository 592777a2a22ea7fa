//! Fixed-width bit set stored as `u64` words.

use crate::error::{Result, try_vec};

/// A bit set with a fixed number of bits, all initially clear.
#[derive(Clone, Debug)]
pub struct BitSet {
    words: Vec<u64>,
    num_bits: usize,
}

impl BitSet {
    /// Allocate `num_bits` cleared bits
    pub fn new(num_bits: usize) -> Result<Self> {
        let num_words = num_bits.div_ceil(64);
        let mut words = try_vec(num_words, "bit set")?;
        words.resize(num_words, 0);
        Ok(Self { words, num_bits })
    }

    #[inline]
    pub fn set(&mut self, index: usize) {
        debug_assert!(index < self.num_bits);
        self.words[index / 64] |= 1u64 << (index % 64);
    }

    #[inline]
    pub fn get(&self, index: usize) -> bool {
        debug_assert!(index < self.num_bits);
        self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    pub fn len(&self) -> usize {
        self.num_bits
    }

    pub fn is_empty(&self) -> bool {
        self.num_bits == 0
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Approximate memory usage in bytes
    pub fn memory_usage(&self) -> usize {
        self.words.len() * 8 + std::mem::size_of::<Self>()
    }
}
