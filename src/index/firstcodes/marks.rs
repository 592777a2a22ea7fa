//! Prefix and suffix filters over first codes
//!
//! Every distinct first code marks its leading and trailing `units` symbols
//! in two bit sets. A k-mer can only equal a first code if both its
//! projections are marked.

use crate::error::Result;
use crate::utils::bitset::BitSet;

pub struct Marks {
    prefix: BitSet,
    suffix: BitSet,
    shift: u32,
    mask: u64,
}

impl Marks {
    /// Filters for `k`-mers with `bits` bits per symbol projected onto
    /// `units` symbols. Callers guarantee `1 <= units <= k` and
    /// `bits * k <= 64`.
    pub fn new(bits: u32, k: usize, units: usize) -> Result<Self> {
        let width = bits as usize * units;
        let num_bits = 1usize << width;
        Ok(Self {
            prefix: BitSet::new(num_bits)?,
            suffix: BitSet::new(num_bits)?,
            shift: bits * (k - units) as u32,
            mask: (1u64 << width) - 1,
        })
    }

    #[inline]
    fn projections(&self, code: u64) -> (usize, usize) {
        ((code >> self.shift) as usize, (code & self.mask) as usize)
    }

    #[inline]
    pub fn mark(&mut self, code: u64) {
        let (prefix, suffix) = self.projections(code);
        self.prefix.set(prefix);
        self.suffix.set(suffix);
    }

    /// Both projections of `code` are marked
    #[inline]
    pub fn is_marked(&self, code: u64) -> bool {
        let (prefix, suffix) = self.projections(code);
        self.prefix.get(prefix) && self.suffix.get(suffix)
    }

    pub fn memory_usage(&self) -> usize {
        self.prefix.memory_usage() + self.suffix.memory_usage()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_projections() {
        // 4-mers over 2 bits, 2-symbol projections
        let mut marks = Marks::new(2, 4, 2).unwrap();
        marks.mark(0b01_10_11_00);

        assert!(marks.is_marked(0b01_10_11_00));
        // halves of different codes combine
        marks.mark(0b11_11_01_01);
        assert!(marks.is_marked(0b01_10_01_01));
        assert!(marks.is_marked(0b11_11_11_00));
        assert!(!marks.is_marked(0b00_00_11_00));
        assert!(!marks.is_marked(0b01_10_10_10));
    }
}
