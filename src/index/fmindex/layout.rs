//! Section layout of the consolidated FM-index data file (`.fmd`)
//!
//! All sections are arrays of integers of the index width, stored back to
//! back. Offsets and lengths below count entries, not bytes.

use super::meta::FmMeta;
use crate::error::{IndexError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FmLayout {
    /// Regular characters of the alphabet
    pub num_of_chars: usize,
    pub tfreq: usize,
    pub superbfreq: usize,
    pub num_superblocks: usize,
    pub bfreq: usize,
    pub num_blocks: usize,
    pub markpos: usize,
    pub num_marks: usize,
    /// `(row, position)` pairs
    pub specpos: usize,
    pub num_specpos: usize,
    /// `(lower, upper)` pairs
    pub boundaries: usize,
    pub num_boundaries: usize,
    /// Entries of the whole file
    pub total: u64,
}

fn overflow() -> IndexError {
    IndexError::Consistency("fm index layout exceeds the addressable size".to_string())
}

fn mul(a: u64, b: u64) -> Result<u64> {
    a.checked_mul(b).ok_or_else(overflow)
}

fn add(a: u64, b: u64) -> Result<u64> {
    a.checked_add(b).ok_or_else(overflow)
}

fn to_usize(v: u64) -> Result<usize> {
    usize::try_from(v).map_err(|_| overflow())
}

impl FmLayout {
    pub fn compute(meta: &FmMeta, num_of_chars: usize) -> Result<Self> {
        let sigma = num_of_chars as u64;
        let n = meta.bwt_length;
        let num_superblocks = add(n >> (2 * meta.log2_block_size), 2)?;
        let num_blocks = add(n >> meta.log2_block_size, 1)?;
        let num_marks = if meta.store_index_pos {
            n.div_ceil(1u64 << meta.log2_mark_dist)
        } else {
            0
        };
        let num_specpos = add(meta.special.special_characters, 1)?;
        let num_boundaries = if meta.suffix_length > 0 {
            sigma.checked_pow(meta.suffix_length).ok_or_else(overflow)?
        } else {
            0
        };

        let tfreq = 0u64;
        let superbfreq = add(tfreq, add(sigma, 1)?)?;
        let bfreq = add(superbfreq, mul(num_superblocks, sigma)?)?;
        let markpos = add(bfreq, mul(num_blocks, sigma)?)?;
        let specpos = add(markpos, num_marks)?;
        let boundaries = add(specpos, mul(num_specpos, 2)?)?;
        let total = add(boundaries, mul(num_boundaries, 2)?)?;

        Ok(Self {
            num_of_chars,
            tfreq: to_usize(tfreq)?,
            superbfreq: to_usize(superbfreq)?,
            num_superblocks: to_usize(num_superblocks)?,
            bfreq: to_usize(bfreq)?,
            num_blocks: to_usize(num_blocks)?,
            markpos: to_usize(markpos)?,
            num_marks: to_usize(num_marks)?,
            specpos: to_usize(specpos)?,
            num_specpos: to_usize(num_specpos)?,
            boundaries: to_usize(boundaries)?,
            num_boundaries: to_usize(num_boundaries)?,
            total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::SpecialCharInfo;

    fn meta(bwt_length: u64, store_index_pos: bool, suffix_length: u32) -> FmMeta {
        FmMeta {
            bwt_length,
            longest: 0,
            store_index_pos,
            log2_block_size: 2,
            log2_mark_dist: 3,
            special: SpecialCharInfo {
                special_characters: 2,
                ..Default::default()
            },
            suffix_length,
        }
    }

    #[test]
    fn test_layout_sections() {
        let layout = FmLayout::compute(&meta(17, true, 2), 4).unwrap();
        // tfreq 5, superblocks (17>>4)+2 = 3, blocks (17>>2)+1 = 5
        assert_eq!(layout.superbfreq, 5);
        assert_eq!(layout.num_superblocks, 3);
        assert_eq!(layout.bfreq, 5 + 12);
        assert_eq!(layout.num_blocks, 5);
        assert_eq!(layout.markpos, 17 + 20);
        assert_eq!(layout.num_marks, 3);
        assert_eq!(layout.specpos, 40);
        assert_eq!(layout.num_specpos, 3);
        assert_eq!(layout.boundaries, 46);
        assert_eq!(layout.num_boundaries, 16);
        assert_eq!(layout.total, 78);
    }

    #[test]
    fn test_optional_sections() {
        let layout = FmLayout::compute(&meta(17, false, 0), 4).unwrap();
        assert_eq!(layout.num_marks, 0);
        assert_eq!(layout.num_boundaries, 0);
        assert_eq!(layout.total, layout.boundaries as u64);
    }

    #[test]
    fn test_overflow_is_consistency_error() {
        let err = FmLayout::compute(&meta(17, true, 40), 20).unwrap_err();
        assert!(err.is_consistency());
    }
}
