//! Memory-mapped suffix array
//!
//! Provides random access to the requested tables and O(m log n) pattern
//! search over the suffix table.

use super::load_common;
use super::table::MappedTable;
use super::types::SuffixArrayStats;
use crate::alphabet::Alphabet;
use crate::error::{IndexError, Result};
use crate::index::project::ProjectRecord;
use crate::index::types::*;
use memchr::memchr_iter;
use roaring::RoaringBitmap;
use std::cmp::Ordering;
use std::ops::Range;
use std::path::Path;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Suffix array with memory-mapped tables
///
/// Tables that were not demanded stay `None`; the query methods return
/// `None` (or an empty result) for them.
pub struct SuffixArray {
    project: ProjectRecord,
    alphabet: Alphabet,
    encseq: Option<MappedTable>,
    suftab: Option<MappedTable>,
    lcptab: Option<MappedTable>,
    llvtab: Option<MappedTable>,
    bwttab: Option<MappedTable>,
    /// Positions of all separators, collected on first use
    separators: OnceLock<Vec<Seqpos>>,
}

impl SuffixArray {
    /// Map the tables named in `demand` of the index `indexname`.
    ///
    /// A failure after some tables were mapped drops those mappings before
    /// the error is returned.
    pub fn map(indexname: &Path, demand: Demand, config: &LoaderConfig) -> Result<Self> {
        let (project, alphabet) = load_common(indexname, config)?;
        let expected = project.total_length + 1;
        let width = project.integer_width.bytes();

        let mut sa = Self {
            project,
            alphabet,
            encseq: None,
            suftab: None,
            lcptab: None,
            llvtab: None,
            bwttab: None,
            separators: OnceLock::new(),
        };

        if demand.contains(Demand::ESQTAB) {
            let path = index_file(indexname, ENCSEQ_SUFFIX);
            sa.encseq = Some(MappedTable::open(&path, expected, 1)?);
        }
        if demand.contains(Demand::SUFTAB) {
            let path = index_file(indexname, SUFTAB_SUFFIX);
            sa.suftab = Some(MappedTable::open(&path, expected, width)?);
        }
        if demand.contains(Demand::LCPTAB) {
            let path = index_file(indexname, LCPTAB_SUFFIX);
            sa.lcptab = Some(MappedTable::open(&path, expected, 1)?);
            let Some(large) = sa.project.large_lcp_values else {
                return Err(IndexError::Format(format!(
                    "{}: largelcpvalues is required for the lcp table",
                    index_file(indexname, PROJECT_SUFFIX).display()
                )));
            };
            if large > 0 {
                let path = index_file(indexname, LARGE_LCP_SUFFIX);
                // pairs of (row, value)
                sa.llvtab = Some(MappedTable::open(&path, 2 * large, width)?);
            }
        }
        if demand.contains(Demand::BWTTAB) {
            let path = index_file(indexname, BWTTAB_SUFFIX);
            sa.bwttab = Some(MappedTable::open(&path, expected, 1)?);
        }

        debug!(
            index = %indexname.display(),
            total_length = sa.project.total_length,
            tables = ?sa.table_names(),
            "mapped suffix array"
        );
        Ok(sa)
    }

    /// Unmap every table. Calling this more than once is harmless.
    pub fn release(&mut self) {
        self.encseq = None;
        self.suftab = None;
        self.lcptab = None;
        self.llvtab = None;
        self.bwttab = None;
        self.separators = OnceLock::new();
    }

    /// Tables currently mapped
    pub fn loaded(&self) -> Demand {
        let mut demand = Demand::NONE;
        if self.encseq.is_some() {
            demand |= Demand::ESQTAB;
        }
        if self.suftab.is_some() {
            demand |= Demand::SUFTAB;
        }
        if self.lcptab.is_some() {
            demand |= Demand::LCPTAB;
        }
        if self.bwttab.is_some() {
            demand |= Demand::BWTTAB;
        }
        demand
    }

    pub fn project(&self) -> &ProjectRecord {
        &self.project
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    #[inline]
    pub fn total_length(&self) -> Seqpos {
        self.project.total_length
    }

    /// The encoded sequence including its terminator
    pub fn encseq(&self) -> Option<&[u8]> {
        self.encseq.as_ref().map(|t| t.as_bytes())
    }

    #[inline]
    pub fn encoded(&self, i: Seqpos) -> Option<u8> {
        self.encseq()?.get(i as usize).copied()
    }

    #[inline]
    pub fn suffix(&self, row: Seqpos) -> Option<Seqpos> {
        let table = self.suftab.as_ref()?;
        let row = row as usize;
        (row < table.len()).then(|| table.get(row))
    }

    /// LCP of row `row` with row `row - 1`. Row 0 holds the reserved header.
    pub fn lcp(&self, row: Seqpos) -> Option<Seqpos> {
        let table = self.lcptab.as_ref()?;
        let small = *table.as_bytes().get(row as usize)?;
        if small < LCP_OVERFLOW {
            return Some(small as Seqpos);
        }
        self.large_lcp(row)
    }

    /// Binary search of the overflow table, which is sorted by row
    fn large_lcp(&self, row: Seqpos) -> Option<Seqpos> {
        let table = self.llvtab.as_ref()?;
        let (mut lo, mut hi) = (0usize, table.len() / 2);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let entry = self.large_lcp_entry(table, mid);
            match entry.position.cmp(&row) {
                Ordering::Less => lo = mid + 1,
                Ordering::Greater => hi = mid,
                Ordering::Equal => return Some(entry.value),
            }
        }
        None
    }

    fn large_lcp_entry(&self, table: &MappedTable, i: usize) -> LargeLcpValue {
        LargeLcpValue {
            position: table.get(2 * i),
            value: table.get(2 * i + 1),
        }
    }

    #[inline]
    pub fn bwt(&self, row: Seqpos) -> Option<u8> {
        self.bwttab
            .as_ref()?
            .as_bytes()
            .get(row as usize)
            .copied()
    }

    /// Rows `[lo, hi)` of all suffixes starting with the encoded `pattern`.
    ///
    /// Requires the encoded sequence and suffix tables. An empty pattern, or
    /// one containing a special code, matches nothing.
    pub fn search(&self, pattern: &[u8]) -> Range<Seqpos> {
        let (Some(text), Some(_)) = (self.encseq(), self.suftab.as_ref()) else {
            return 0..0;
        };
        if pattern.is_empty() || pattern.iter().any(|&c| is_special(c)) {
            return 0..0;
        }

        let lo = self.lower_bound(text, pattern);
        let hi = self.upper_bound(text, pattern, lo);
        lo..hi
    }

    /// Encode `symbols` with the index alphabet, then [`search`](Self::search)
    pub fn search_symbols(&self, symbols: &[u8]) -> Result<Range<Seqpos>> {
        let pattern = self.alphabet.encode_seq(symbols)?;
        Ok(self.search(&pattern))
    }

    #[inline]
    fn text_at<'a>(&self, text: &'a [u8], row: Seqpos) -> &'a [u8] {
        let pos = self.suffix(row).unwrap_or(self.project.total_length) as usize;
        &text[pos.min(text.len())..]
    }

    /// First row whose suffix is not smaller than `pattern`.
    ///
    /// Byte comparison is exact here: specials are larger than every
    /// regular code and never occur in the pattern.
    fn lower_bound(&self, text: &[u8], pattern: &[u8]) -> Seqpos {
        let mut lo: Seqpos = 0;
        let mut hi: Seqpos = self.total_length() + 1;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let suffix = self.text_at(text, mid);
            let cmp_len = pattern.len().min(suffix.len());
            if &suffix[..cmp_len] < pattern {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        lo
    }

    /// First row from `start` whose suffix does not start with `pattern`
    fn upper_bound(&self, text: &[u8], pattern: &[u8], start: Seqpos) -> Seqpos {
        let mut lo = start;
        let mut hi: Seqpos = self.total_length() + 1;

        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.text_at(text, mid).starts_with(pattern) {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }

        lo
    }

    pub fn count_matches(&self, pattern: &[u8]) -> u64 {
        let range = self.search(pattern);
        range.end - range.start
    }

    pub fn contains(&self, pattern: &[u8]) -> bool {
        !self.search(pattern).is_empty()
    }

    fn separators(&self) -> &[Seqpos] {
        self.separators.get_or_init(|| {
            let Some(text) = self.encseq() else {
                return Vec::new();
            };
            let body = &text[..self.project.total_length as usize];
            memchr_iter(SEPARATOR, body).map(|p| p as Seqpos).collect()
        })
    }

    /// Number of the sequence containing position `pos`, `None` for
    /// separators and positions outside the sequence.
    pub fn sequence_number(&self, pos: Seqpos) -> Option<u64> {
        if self.encoded(pos).is_none_or(|c| c == SEPARATOR) || pos >= self.total_length() {
            return None;
        }
        let separators = self.separators();
        Some(separators.partition_point(|&s| s < pos) as u64)
    }

    /// Numbers of all sequences containing the encoded `pattern`.
    ///
    /// The set holds 32-bit numbers; matches in sequences numbered above
    /// `u32::MAX` are left out with a warning.
    pub fn sequences_containing(&self, pattern: &[u8]) -> RoaringBitmap {
        let mut sequences = RoaringBitmap::new();
        for row in self.search(pattern) {
            if let Some(seqnum) = self.suffix(row).and_then(|pos| self.sequence_number(pos)) {
                insert_sequence(&mut sequences, seqnum);
            }
        }
        sequences
    }

    fn table_names(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        for (table, name) in [
            (&self.encseq, "esq"),
            (&self.suftab, "suf"),
            (&self.lcptab, "lcp"),
            (&self.llvtab, "llv"),
            (&self.bwttab, "bwt"),
        ] {
            if table.is_some() {
                names.push(name);
            }
        }
        names
    }

    pub fn stats(&self) -> SuffixArrayStats {
        let mapped_bytes = [
            &self.encseq,
            &self.suftab,
            &self.lcptab,
            &self.llvtab,
            &self.bwttab,
        ]
        .iter()
        .filter_map(|t| t.as_ref().map(|t| t.byte_len()))
        .sum();

        SuffixArrayStats {
            total_length: self.project.total_length,
            num_of_sequences: self.project.num_of_sequences,
            tables: self.table_names(),
            mapped_bytes,
        }
    }
}

fn insert_sequence(sequences: &mut RoaringBitmap, seqnum: u64) -> bool {
    match u32::try_from(seqnum) {
        Ok(seqnum) => sequences.insert(seqnum),
        Err(_) => {
            warn!(seqnum, "sequence number does not fit a 32-bit set, skipped");
            false
        }
    }
}
