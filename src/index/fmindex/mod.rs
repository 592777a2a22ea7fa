//! FM-index
//!
//! Backward search over the BWT of an index. The BWT is stored as the
//! encoded sequence of the FM-index (`<index>.esq`) and loaded through
//! [`SuffixArray::map`]; rank samples, position marks, special rows and
//! precomputed prefix ranges live in the consolidated `<index>.fmd` file.
//!
//! ## Architecture
//!
//! - `meta`: The `.fma` key/value file and build parameters
//! - `layout`: Section offsets inside `.fmd`
//! - `writer`: Builds and persists an FM-index from a suffix array

pub mod layout;
pub mod meta;
pub mod writer;

pub use layout::FmLayout;
pub use meta::{FmIndexConfig, FmMeta};
pub use writer::FmIndexWriter;

use crate::alphabet::Alphabet;
use crate::error::{IndexError, Result};
use crate::index::suffix_array::SuffixArray;
use crate::index::suffix_array::table::MappedTable;
use crate::index::types::*;
use memchr::memchr_iter;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

/// Memory-mapped FM-index
pub struct FmIndex {
    meta: FmMeta,
    bwt: SuffixArray,
    data: MappedTable,
    layout: FmLayout,
}

impl FmIndex {
    /// Map the FM-index `indexname`
    pub fn map(indexname: &Path, config: &LoaderConfig) -> Result<Self> {
        let meta = FmMeta::read(indexname)?;
        let bwt = SuffixArray::map(indexname, Demand::ESQTAB, config)?;

        let expected = bwt.total_length() + 1;
        if meta.bwt_length != expected {
            return Err(IndexError::Consistency(format!(
                "{}: bwtlength = {} != {} = totallength + 1",
                index_file(indexname, FM_ASCII_SUFFIX).display(),
                meta.bwt_length,
                expected
            )));
        }
        if bwt.encoded(meta.longest) != Some(UNDEF_CHAR) {
            return Err(IndexError::Consistency(format!(
                "{}: row {} of the bwt does not hold the terminator",
                index_file(indexname, FM_ASCII_SUFFIX).display(),
                meta.longest
            )));
        }

        let layout = FmLayout::compute(&meta, bwt.alphabet().num_of_chars())?;
        let data = MappedTable::open(
            &index_file(indexname, FM_DATA_SUFFIX),
            layout.total,
            bwt.project().integer_width.bytes(),
        )?;

        debug!(
            index = %indexname.display(),
            bwt_length = meta.bwt_length,
            entries = layout.total,
            "mapped fm index"
        );
        Ok(Self {
            meta,
            bwt,
            data,
            layout,
        })
    }

    pub fn meta(&self) -> &FmMeta {
        &self.meta
    }

    pub fn alphabet(&self) -> &Alphabet {
        self.bwt.alphabet()
    }

    pub fn bwt_length(&self) -> Seqpos {
        self.meta.bwt_length
    }

    #[inline]
    fn bwt_bytes(&self) -> &[u8] {
        // mapped in `map`, never released
        self.bwt.encseq().unwrap_or(&[])
    }

    #[inline]
    fn sigma(&self) -> usize {
        self.layout.num_of_chars
    }

    #[inline]
    fn tfreq(&self, c: usize) -> Seqpos {
        self.data.get(self.layout.tfreq + c)
    }

    /// BWT symbol of `row`
    #[inline]
    pub fn last_column(&self, row: Seqpos) -> Option<u8> {
        self.bwt_bytes().get(row as usize).copied()
    }

    /// First symbol of the suffix at `row`, `None` for rows whose suffix
    /// starts with a special symbol or lies outside the index.
    pub fn first_column(&self, row: Seqpos) -> Option<u8> {
        let sigma = self.sigma();
        if row >= self.tfreq(sigma) {
            return None;
        }
        // largest c with tfreq[c] <= row
        let (mut lo, mut hi) = (0usize, sigma);
        while lo + 1 < hi {
            let mid = lo + (hi - lo) / 2;
            if self.tfreq(mid) <= row {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        Some(lo as u8)
    }

    /// Occurrences of the regular code `c` in rows `[0, i)` of the BWT
    pub fn occ(&self, c: u8, i: Seqpos) -> Seqpos {
        let sigma = self.sigma();
        let c = c as usize;
        if c >= sigma {
            return 0;
        }
        let i = i.min(self.meta.bwt_length);
        let log2 = self.meta.log2_block_size;
        let superblock = (i >> (2 * log2)) as usize;
        let block = (i >> log2) as usize;

        let base = self.data.get(self.layout.superbfreq + superblock * sigma + c)
            + self.data.get(self.layout.bfreq + block * sigma + c);
        let start = (block << log2) as usize;
        let tail = &self.bwt_bytes()[start..i as usize];
        base + memchr_iter(c as u8, tail).count() as Seqpos
    }

    /// Narrow `range` to the rows whose suffix is `c` followed by a suffix in
    /// `range`.
    pub fn refine(&self, range: Range<Seqpos>, c: u8) -> Range<Seqpos> {
        if c as usize >= self.sigma() {
            return 0..0;
        }
        let start = self.tfreq(c as usize);
        start + self.occ(c, range.start)..start + self.occ(c, range.end)
    }

    /// Rows of all suffixes starting with the encoded `pattern`
    pub fn backward_search(&self, pattern: &[u8]) -> Range<Seqpos> {
        if pattern.is_empty() || pattern.iter().any(|&c| c as usize >= self.sigma()) {
            return 0..0;
        }

        let k = self.meta.suffix_length as usize;
        let (mut range, rest) = if k > 0 && pattern.len() >= k {
            let (rest, tail) = pattern.split_at(pattern.len() - k);
            (self.boundaries(tail), rest)
        } else {
            (0..self.meta.bwt_length, pattern)
        };

        for &c in rest.iter().rev() {
            if range.is_empty() {
                break;
            }
            range = self.refine(range, c);
        }
        if range.is_empty() { 0..0 } else { range }
    }

    /// Encode `symbols` with the index alphabet, then search
    pub fn search_symbols(&self, symbols: &[u8]) -> Result<Range<Seqpos>> {
        let pattern = self.alphabet().encode_seq(symbols)?;
        Ok(self.backward_search(&pattern))
    }

    /// Precomputed range of a `suffix_length` prefix
    fn boundaries(&self, kmer: &[u8]) -> Range<Seqpos> {
        let sigma = self.sigma();
        let code = kmer.iter().fold(0usize, |acc, &c| acc * sigma + c as usize);
        let entry = self.layout.boundaries + 2 * code;
        self.data.get(entry)..self.data.get(entry + 1)
    }

    /// Number of occurrences of the encoded `pattern`
    pub fn count(&self, pattern: &[u8]) -> u64 {
        let range = self.backward_search(pattern);
        range.end - range.start
    }

    /// Last-to-first mapping, `None` at rows whose BWT symbol is special
    #[inline]
    pub fn lf(&self, row: Seqpos) -> Option<Seqpos> {
        let c = self.last_column(row)?;
        if is_special(c) {
            return None;
        }
        Some(self.tfreq(c as usize) + self.occ(c, row))
    }

    /// Text position of the suffix at `row`. Needs stored index positions.
    pub fn locate(&self, row: Seqpos) -> Option<Seqpos> {
        if !self.meta.store_index_pos || row >= self.meta.bwt_length {
            return None;
        }
        let mask = (1u64 << self.meta.log2_mark_dist) - 1;
        let mut row = row;
        let mut steps = 0;
        loop {
            if row & mask == 0 {
                let mark = (row >> self.meta.log2_mark_dist) as usize;
                return Some(self.data.get(self.layout.markpos + mark) + steps);
            }
            match self.lf(row) {
                Some(next) => {
                    row = next;
                    steps += 1;
                }
                None => return self.special_position(row).map(|pos| pos + steps),
            }
        }
    }

    /// Position stored for a row whose BWT symbol is special
    fn special_position(&self, row: Seqpos) -> Option<Seqpos> {
        let (mut lo, mut hi) = (0usize, self.layout.num_specpos);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let entry = self.layout.specpos + 2 * mid;
            let stored = self.data.get(entry);
            if stored == row {
                return Some(self.data.get(entry + 1));
            }
            if stored < row {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        None
    }

    /// Symbols preceding the suffix at `row`, nearest first. Ends before the
    /// first special symbol.
    pub fn context(&self, row: Seqpos) -> Context<'_> {
        Context {
            index: self,
            row: Some(row),
        }
    }
}

/// Iterator returned by [`FmIndex::context`]
pub struct Context<'a> {
    index: &'a FmIndex,
    row: Option<Seqpos>,
}

impl Iterator for Context<'_> {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        let row = self.row?;
        let c = self.index.last_column(row).filter(|&c| !is_special(c));
        self.row = c.and_then(|_| self.index.lf(row));
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::suffix_array::{BuildConfig, SuffixArrayBuilder, SuffixArrayWriter};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    const SEQS: [&[u8]; 3] = [b"ACGTACGTTGCA", b"GATTACANNACGT", b"CCCGGGAAATTT"];

    fn setup(config: FmIndexConfig) -> (tempfile::TempDir, PathBuf, PathBuf) {
        let temp_dir = tempdir().unwrap();
        let sa_name = temp_dir.path().join("sa");
        let fm_name = temp_dir.path().join("fm");

        let mut builder = SuffixArrayBuilder::new(Alphabet::dna(), BuildConfig::default());
        builder.add_file("x.fa", SEQS).unwrap();
        let built = builder.build().unwrap();
        SuffixArrayWriter::write(&sa_name, &built).unwrap();
        FmIndexWriter::write(&fm_name, &built, &config).unwrap();

        (temp_dir, sa_name, fm_name)
    }

    fn encode(pattern: &[u8]) -> Vec<u8> {
        Alphabet::dna().encode_seq(pattern).unwrap()
    }

    #[test]
    fn test_backward_search_agrees_with_suffix_array() {
        for suffix_length in [0, 2, 3] {
            let config = FmIndexConfig {
                suffix_length,
                log2_block_size: 2,
                ..Default::default()
            };
            let (_dir, sa_name, fm_name) = setup(config);
            let sa = SuffixArray::map(&sa_name, Demand::ALL, &LoaderConfig::default()).unwrap();
            let fm = FmIndex::map(&fm_name, &LoaderConfig::default()).unwrap();

            for pattern in [&b"A"[..], b"AC", b"ACG", b"GATTACA", b"TTT", b"CA", b"GGGG", b"T"] {
                let pattern = encode(pattern);
                let expected = sa.search(&pattern);
                if expected.is_empty() {
                    assert!(fm.backward_search(&pattern).is_empty());
                } else {
                    assert_eq!(fm.backward_search(&pattern), expected);
                }
            }
        }
    }

    #[test]
    fn test_locate_agrees_with_suffix_table() {
        let (_dir, sa_name, fm_name) = setup(FmIndexConfig::default());
        let sa = SuffixArray::map(&sa_name, Demand::ALL, &LoaderConfig::default()).unwrap();
        let fm = FmIndex::map(&fm_name, &LoaderConfig::default()).unwrap();

        for row in 0..fm.bwt_length() {
            assert_eq!(fm.locate(row), sa.suffix(row), "row {}", row);
        }
    }

    #[test]
    fn test_columns_and_lf() {
        let (_dir, sa_name, fm_name) = setup(FmIndexConfig::default());
        let sa = SuffixArray::map(&sa_name, Demand::ALL, &LoaderConfig::default()).unwrap();
        let fm = FmIndex::map(&fm_name, &LoaderConfig::default()).unwrap();

        for row in 0..fm.bwt_length() {
            let pos = sa.suffix(row).unwrap();
            let first = sa.encoded(pos).filter(|&c| !is_special(c));
            assert_eq!(fm.first_column(row), first, "row {}", row);
            assert_eq!(fm.last_column(row), sa.bwt(row));
            if let Some(prev) = fm.lf(row) {
                assert_eq!(sa.suffix(prev), Some(pos - 1));
            }
        }
    }

    #[test]
    fn test_context() {
        let (_dir, sa_name, fm_name) = setup(FmIndexConfig::default());
        let sa = SuffixArray::map(&sa_name, Demand::ALL, &LoaderConfig::default()).unwrap();
        let fm = FmIndex::map(&fm_name, &LoaderConfig::default()).unwrap();

        // suffix "GTTGCA" of the first sequence is preceded by "ACGTAC"
        let row = sa.search(&encode(b"GTTGCA")).start;
        let context: Vec<u8> = fm.context(row).collect();
        assert_eq!(context, encode(b"CATGCA"));
    }

    #[test]
    fn test_count_and_symbols() {
        let (_dir, _sa_name, fm_name) = setup(FmIndexConfig::default());
        let fm = FmIndex::map(&fm_name, &LoaderConfig::default()).unwrap();
        assert_eq!(fm.count(&encode(b"ACGT")), 3);
        assert_eq!(fm.search_symbols(b"acgt").unwrap().count(), 3);
        assert_eq!(fm.count(&[WILDCARD]), 0);
        assert_eq!(fm.count(&[]), 0);
    }

    #[test]
    fn test_without_marks() {
        let config = FmIndexConfig {
            store_index_pos: false,
            ..Default::default()
        };
        let (_dir, _sa_name, fm_name) = setup(config);
        let fm = FmIndex::map(&fm_name, &LoaderConfig::default()).unwrap();
        assert_eq!(fm.locate(0), None);
        assert_eq!(fm.count(&encode(b"ACGT")), 3);
    }

    #[test]
    fn test_truncated_data_file() {
        let (_dir, _sa_name, fm_name) = setup(FmIndexConfig::default());
        let fmd = index_file(&fm_name, FM_DATA_SUFFIX);
        let mut data = fs::read(&fmd).unwrap();
        data.truncate(data.len() - 8);
        fs::write(&fmd, data).unwrap();

        let err = FmIndex::map(&fm_name, &LoaderConfig::default()).err().unwrap();
        assert!(err.is_consistency());
    }

    #[test]
    fn test_bwt_length_mismatch() {
        let (_dir, _sa_name, fm_name) = setup(FmIndexConfig::default());
        let fma = index_file(&fm_name, FM_ASCII_SUFFIX);
        let text = fs::read_to_string(&fma).unwrap();
        let text: String = text
            .lines()
            .map(|l| match l.strip_prefix("bwtlength=") {
                Some(v) => format!("bwtlength={}\n", v.parse::<u64>().unwrap() + 1),
                None => format!("{}\n", l),
            })
            .collect();
        fs::write(&fma, text).unwrap();

        let err = FmIndex::map(&fm_name, &LoaderConfig::default()).err().unwrap();
        assert!(err.is_consistency());
    }
}
