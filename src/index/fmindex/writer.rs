//! FM-index writer
//!
//! Derives the sampled rank counts, position marks, special rows and prefix
//! ranges from a built suffix array and writes them as one data file. The
//! BWT becomes the encoded sequence of the FM-index, so an FM-index needs an
//! index name of its own.

use super::layout::FmLayout;
use super::meta::{FmIndexConfig, FmMeta, MAX_LOG2_BLOCK_SIZE, MAX_LOG2_MARK_DIST};
use crate::error::{IndexError, Result};
use crate::index::suffix_array::BuiltSuffixArray;
use crate::index::suffix_array::writer::{create_parent, write_bytes, write_table};
use crate::index::types::*;
use std::path::Path;
use tracing::debug;

pub struct FmIndexWriter;

impl FmIndexWriter {
    pub fn write(indexname: &Path, built: &BuiltSuffixArray, config: &FmIndexConfig) -> Result<()> {
        if !(1..=MAX_LOG2_BLOCK_SIZE).contains(&config.log2_block_size) {
            return Err(IndexError::Config(format!(
                "log2 block size must be in 1..={}",
                MAX_LOG2_BLOCK_SIZE
            )));
        }
        if config.log2_mark_dist > MAX_LOG2_MARK_DIST {
            return Err(IndexError::Config(format!(
                "log2 mark distance must be at most {}",
                MAX_LOG2_MARK_DIST
            )));
        }
        let longest = built.project.longest.ok_or_else(|| {
            IndexError::Consistency("suffix array has no row for position 0".to_string())
        })?;

        let meta = FmMeta {
            bwt_length: built.bwt.len() as Seqpos,
            longest,
            store_index_pos: config.store_index_pos,
            log2_block_size: config.log2_block_size,
            log2_mark_dist: config.log2_mark_dist,
            special: built.project.special,
            suffix_length: config.suffix_length,
        };
        let layout = FmLayout::compute(&meta, built.alphabet.num_of_chars())?;
        let data = fm_data(built, &meta, &layout);
        debug_assert_eq!(data.len() as u64, layout.total);

        create_parent(indexname)?;
        built.project.write(indexname)?;
        built
            .alphabet
            .write_al1(&index_file(indexname, ALPHABET_SUFFIX))?;
        write_bytes(&index_file(indexname, ENCSEQ_SUFFIX), &built.bwt)?;
        meta.write(indexname)?;
        write_table(
            &index_file(indexname, FM_DATA_SUFFIX),
            data,
            built.project.integer_width.bytes(),
        )?;

        debug!(
            index = %indexname.display(),
            bwt_length = meta.bwt_length,
            entries = layout.total,
            "wrote fm index"
        );
        Ok(())
    }
}

/// All sections of the data file in order
fn fm_data(built: &BuiltSuffixArray, meta: &FmMeta, layout: &FmLayout) -> Vec<u64> {
    let sigma = layout.num_of_chars;
    let bwt = &built.bwt;
    let n = bwt.len();
    let log2 = meta.log2_block_size;
    let block_mask = (1usize << log2) - 1;
    let superblock_mask = (1usize << (2 * log2)) - 1;

    let mut superbfreq = vec![0u64; layout.num_superblocks * sigma];
    let mut bfreq = vec![0u64; layout.num_blocks * sigma];
    let mut counts = vec![0u64; sigma];
    let mut superblock_base = vec![0u64; sigma];

    for i in 0..=n {
        if i & superblock_mask == 0 {
            let s = i >> (2 * log2);
            superbfreq[s * sigma..(s + 1) * sigma].copy_from_slice(&counts);
            superblock_base.copy_from_slice(&counts);
        }
        if i & block_mask == 0 {
            let b = i >> log2;
            for c in 0..sigma {
                bfreq[b * sigma + c] = counts[c] - superblock_base[c];
            }
        }
        if let Some(&c) = bwt.get(i).filter(|&&c| (c as usize) < sigma) {
            counts[c as usize] += 1;
        }
    }
    // superblocks past the end see the full counts
    let filled = (n >> (2 * log2)) + 1;
    for s in filled..layout.num_superblocks {
        superbfreq[s * sigma..(s + 1) * sigma].copy_from_slice(&counts);
    }

    let mut data = Vec::with_capacity(layout.total as usize);

    let mut smaller = 0;
    for &count in &counts {
        data.push(smaller);
        smaller += count;
    }
    data.push(smaller);

    data.extend(superbfreq);
    data.extend(bfreq);

    if meta.store_index_pos {
        let markdist = 1usize << meta.log2_mark_dist;
        data.extend(built.suffixes.iter().step_by(markdist).copied());
    }

    for (row, &c) in bwt.iter().enumerate() {
        if is_special(c) {
            data.push(row as u64);
            data.push(built.suffixes[row]);
        }
    }

    if meta.suffix_length > 0 {
        data.extend(prefix_ranges(built, meta.suffix_length as usize, sigma, layout.num_boundaries));
    }
    data
}

/// `(lower, upper)` row range for every prefix of length `k`, code order.
/// Absent prefixes get an empty range.
fn prefix_ranges(built: &BuiltSuffixArray, k: usize, sigma: usize, num: usize) -> Vec<u64> {
    let mut ranges = vec![0u64; 2 * num];
    let text = &built.encseq;

    for (row, &pos) in built.suffixes.iter().enumerate() {
        let pos = pos as usize;
        let Some(window) = text.get(pos..pos + k) else {
            continue;
        };
        if window.iter().any(|&c| c as usize >= sigma) {
            continue;
        }
        let code = window.iter().fold(0usize, |acc, &c| acc * sigma + c as usize);
        if ranges[2 * code + 1] == 0 {
            ranges[2 * code] = row as u64;
        }
        ranges[2 * code + 1] = row as u64 + 1;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::index::suffix_array::SuffixArrayBuilder;

    fn built(seqs: &[&[u8]]) -> BuiltSuffixArray {
        let mut builder = SuffixArrayBuilder::with_defaults(Alphabet::dna());
        builder.add_file("x.fa", seqs).unwrap();
        builder.build().unwrap()
    }

    fn meta_for(built: &BuiltSuffixArray, config: &FmIndexConfig) -> FmMeta {
        FmMeta {
            bwt_length: built.bwt.len() as u64,
            longest: built.project.longest.unwrap(),
            store_index_pos: config.store_index_pos,
            log2_block_size: config.log2_block_size,
            log2_mark_dist: config.log2_mark_dist,
            special: built.project.special,
            suffix_length: config.suffix_length,
        }
    }

    #[test]
    fn test_data_matches_layout() {
        let built = built(&[b"ACGTNNACGT", b"TTGACA"]);
        for config in [
            FmIndexConfig::default(),
            FmIndexConfig {
                log2_block_size: 1,
                log2_mark_dist: 0,
                store_index_pos: false,
                suffix_length: 0,
            },
        ] {
            let meta = meta_for(&built, &config);
            let layout = FmLayout::compute(&meta, 4).unwrap();
            let data = fm_data(&built, &meta, &layout);
            assert_eq!(data.len() as u64, layout.total);
        }
    }

    #[test]
    fn test_tfreq() {
        let built = built(&[b"AACGT"]);
        let meta = meta_for(&built, &FmIndexConfig::default());
        let layout = FmLayout::compute(&meta, 4).unwrap();
        let data = fm_data(&built, &meta, &layout);
        assert_eq!(&data[..5], &[0, 2, 3, 4, 5]);
    }

    #[test]
    fn test_prefix_ranges() {
        let built = built(&[b"ACAC"]);
        let ranges = prefix_ranges(&built, 2, 4, 16);
        // "AC" occurs twice and sorts first
        assert_eq!(&ranges[2..4], &[0, 2]);
        // "CA" once
        assert_eq!(ranges[2 * 4 + 1] - ranges[2 * 4], 1);
        // "GG" never
        assert_eq!(ranges[2 * 10 + 1], 0);
    }

    #[test]
    fn test_rejects_bad_config() {
        let built = built(&[b"ACGT"]);
        let dir = tempfile::tempdir().unwrap();
        let config = FmIndexConfig {
            log2_block_size: 0,
            ..Default::default()
        };
        let err = FmIndexWriter::write(&dir.path().join("fm"), &built, &config).unwrap_err();
        assert!(matches!(err, IndexError::Config(_)));
    }
}
