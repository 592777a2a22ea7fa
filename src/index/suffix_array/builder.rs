//! Suffix array builder
//!
//! Builds all tables of an index from raw sequences by:
//! 1. Encoding each sequence and joining sequences with separators
//! 2. Sorting all suffixes (in parallel for large texts)
//! 3. Deriving the LCP table with Kasai's algorithm and the BWT
//!
//! Suffix order treats special codes as larger than every regular code and
//! orders two specials by their text position, so no two suffixes compare
//! equal.

use super::types::BuildConfig;
use crate::alphabet::Alphabet;
use crate::error::{IndexError, Result};
use crate::index::project::{DbFile, ProjectRecord};
use crate::index::types::*;
use rayon::prelude::*;
use std::cmp::Ordering;
use tracing::debug;

/// Builder for constructing suffix arrays from sequences
pub struct SuffixArrayBuilder {
    config: BuildConfig,
    alphabet: Alphabet,
    /// Encoded sequences joined by separators, without terminator
    encseq: Vec<u8>,
    files: Vec<DbFile>,
    num_of_sequences: u64,
}

impl SuffixArrayBuilder {
    pub fn new(alphabet: Alphabet, config: BuildConfig) -> Self {
        Self {
            config,
            alphabet,
            encseq: Vec::new(),
            files: Vec::new(),
            num_of_sequences: 0,
        }
    }

    /// Create a builder with default configuration
    pub fn with_defaults(alphabet: Alphabet) -> Self {
        Self::new(alphabet, BuildConfig::default())
    }

    /// Add the sequences of one input file.
    ///
    /// Sequences must be non-empty and consist of alphabet symbols. On error
    /// nothing of this file is kept.
    pub fn add_file<I, S>(&mut self, name: &str, sequences: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let rollback = self.encseq.len();
        let result = self.append_sequences(name, sequences);
        if result.is_err() {
            self.encseq.truncate(rollback);
        }
        let (length, effective_length, count) = result?;

        self.num_of_sequences += count;
        self.files.push(DbFile {
            name: name.to_string(),
            length,
            effective_length,
        });
        Ok(())
    }

    fn append_sequences<I, S>(&mut self, name: &str, sequences: I) -> Result<(u64, u64, u64)>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let (mut length, mut effective_length, mut count) = (0u64, 0u64, 0u64);

        for sequence in sequences {
            let sequence = sequence.as_ref();
            if sequence.is_empty() {
                return Err(IndexError::Format(format!(
                    "{}: sequence {} is empty",
                    name, count
                )));
            }
            if !self.encseq.is_empty() {
                self.encseq.push(SEPARATOR);
                effective_length += 1;
            }
            let start = self.encseq.len();
            self.encseq.resize(start + sequence.len(), 0);
            self.alphabet
                .encode_seq_into(sequence, &mut self.encseq[start..])?;

            length += sequence.len() as u64;
            effective_length += sequence.len() as u64;
            count += 1;
        }

        if count == 0 {
            return Err(IndexError::Format(format!("{}: no sequences", name)));
        }
        Ok((length, effective_length, count))
    }

    /// Sort the suffixes and derive every table
    pub fn build(self) -> Result<BuiltSuffixArray> {
        let n = self.encseq.len();
        if n == 0 {
            return Err(IndexError::Format("no sequences were added".to_string()));
        }
        let width = self.config.integer_width;
        if n as u64 >= width.max_value() {
            return Err(IndexError::Config(format!(
                "total length {} does not fit into {}-bit tables",
                n,
                width.bits()
            )));
        }

        let suffixes = build_suffix_array(&self.encseq, self.config.parallel_sort_threshold);
        let lcp = compute_lcp(&self.encseq, &suffixes);
        let bwt = compute_bwt(&self.encseq, &suffixes);

        let longest = suffixes
            .iter()
            .position(|&p| p == 0)
            .map(|row| row as Seqpos);
        let large_lcp_values = lcp.iter().filter(|&&v| v >= LCP_OVERFLOW as Seqpos).count() as u64;
        let max_branch_depth = lcp.iter().copied().max().unwrap_or(0);
        let total_length = n as Seqpos;

        let project = ProjectRecord {
            total_length,
            special: SpecialCharInfo::from_encoded(&self.encseq),
            num_of_sequences: self.num_of_sequences,
            num_of_db_sequences: self.num_of_sequences,
            num_of_query_sequences: Some(0),
            longest,
            prefix_length: self.config.prefix_length.unwrap_or_else(|| {
                recommended_prefix_length(total_length, self.alphabet.num_of_chars())
            }),
            large_lcp_values: Some(large_lcp_values),
            max_branch_depth: Some(max_branch_depth),
            integer_width: width,
            little_endian: cfg!(target_endian = "little"),
            files: self.files,
        };

        debug!(
            total_length,
            sequences = project.num_of_sequences,
            large_lcp_values,
            max_branch_depth,
            "built suffix array"
        );

        let mut encseq = self.encseq;
        encseq.push(UNDEF_CHAR);

        Ok(BuiltSuffixArray {
            alphabet: self.alphabet,
            project,
            encseq,
            suffixes,
            lcp,
            bwt,
        })
    }

    /// Number of encoded positions so far, separators included
    pub fn text_size(&self) -> usize {
        self.encseq.len()
    }

    pub fn num_of_sequences(&self) -> u64 {
        self.num_of_sequences
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }
}

/// Result of building a suffix array. Every table has `totallength + 1`
/// entries.
pub struct BuiltSuffixArray {
    pub alphabet: Alphabet,
    pub project: ProjectRecord,
    /// Encoded sequence with the `UNDEF_CHAR` terminator
    pub encseq: Vec<u8>,
    pub suffixes: Vec<Seqpos>,
    /// Row 0 is the reserved header and holds 0
    pub lcp: Vec<Seqpos>,
    pub bwt: Vec<u8>,
}

/// Sort positions `0..=text.len()` by their suffixes
pub(crate) fn build_suffix_array(text: &[u8], parallel_threshold: usize) -> Vec<Seqpos> {
    let n = text.len();
    let mut sa: Vec<Seqpos> = (0..=n as Seqpos).collect();

    if n > parallel_threshold {
        sa.par_sort_unstable_by(|&a, &b| compare_suffixes(text, a as usize, b as usize));
    } else {
        sa.sort_unstable_by(|&a, &b| compare_suffixes(text, a as usize, b as usize));
    }

    sa
}

/// Compare two suffixes. The end of the text acts as a special symbol at
/// position `text.len()`.
#[inline]
fn compare_suffixes(text: &[u8], a: usize, b: usize) -> Ordering {
    let common = text.len() - a.max(b);
    let (sa, sb) = (&text[a..a + common], &text[b..b + common]);
    let mismatch = sa
        .iter()
        .zip(sb)
        .position(|(x, y)| x != y || is_special(*x))
        .unwrap_or(common);

    let (i, j) = (a + mismatch, b + mismatch);
    let x = text.get(i).copied().unwrap_or(UNDEF_CHAR);
    let y = text.get(j).copied().unwrap_or(UNDEF_CHAR);
    match (is_special(x), is_special(y)) {
        (false, false) => x.cmp(&y),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => i.cmp(&j),
    }
}

#[inline]
fn symbols_match(text: &[u8], i: usize, j: usize) -> bool {
    match (text.get(i), text.get(j)) {
        (Some(&x), Some(&y)) => x == y && !is_special(x),
        _ => false,
    }
}

/// LCP of every row with its predecessor (Kasai et al.)
fn compute_lcp(text: &[u8], sa: &[Seqpos]) -> Vec<Seqpos> {
    let n = sa.len();
    let mut rank = vec![0usize; n];
    for (row, &pos) in sa.iter().enumerate() {
        rank[pos as usize] = row;
    }

    let mut lcp = vec![0 as Seqpos; n];
    let mut h = 0usize;
    for pos in 0..n {
        let row = rank[pos];
        if row == 0 {
            h = 0;
            continue;
        }
        let prev = sa[row - 1] as usize;
        while symbols_match(text, pos + h, prev + h) {
            h += 1;
        }
        lcp[row] = h as Seqpos;
        h = h.saturating_sub(1);
    }
    lcp
}

/// Symbol preceding each suffix; `UNDEF_CHAR` for the suffix at position 0
fn compute_bwt(text: &[u8], sa: &[Seqpos]) -> Vec<u8> {
    sa.iter()
        .map(|&pos| match pos {
            0 => UNDEF_CHAR,
            p => text[p as usize - 1],
        })
        .collect()
}

/// Largest prefix length whose bucket count stays below a quarter of the
/// text length, at least 1
pub fn recommended_prefix_length(total_length: Seqpos, num_of_chars: usize) -> u64 {
    let base = num_of_chars.max(2) as u64;
    let limit = (total_length / 4).max(1);
    let mut prefix_length = 1;
    let mut buckets = base;
    while buckets.saturating_mul(base) <= limit {
        buckets *= base;
        prefix_length += 1;
    }
    prefix_length
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dna_builder() -> SuffixArrayBuilder {
        SuffixArrayBuilder::with_defaults(Alphabet::dna())
    }

    /// Naive LCP for cross-checking
    fn naive_lcp(text: &[u8], a: usize, b: usize) -> Seqpos {
        let mut h = 0;
        while symbols_match(text, a + h, b + h) {
            h += 1;
        }
        h as Seqpos
    }

    #[test]
    fn test_build_simple() {
        let mut builder = dna_builder();
        builder.add_file("one.fa", [b"ACGT"]).unwrap();
        let built = builder.build().unwrap();

        assert_eq!(built.encseq, vec![0, 1, 2, 3, UNDEF_CHAR]);
        assert_eq!(built.suffixes, vec![0, 1, 2, 3, 4]);
        assert_eq!(built.bwt, vec![UNDEF_CHAR, 0, 1, 2, 3]);
        assert_eq!(built.lcp, vec![0; 5]);
        assert_eq!(built.project.longest, Some(0));
        assert_eq!(built.project.total_length, 4);
    }

    #[test]
    fn test_suffix_array_correctness() {
        // "banana" over a,b,n -> codes 0,1,2
        let text = [1u8, 0, 2, 0, 2, 0];
        let sa = build_suffix_array(&text, 100_000);
        // The text end sorts after every regular symbol: anana, ana, a,
        // banana, nana, na, end
        assert_eq!(sa, vec![1, 3, 5, 0, 2, 4, 6]);
    }

    #[test]
    fn test_specials_sort_by_position() {
        let text = [0u8, SEPARATOR, 0, WILDCARD, 0];
        let sa = build_suffix_array(&text, 100_000);
        // Ties after the shared "A" are broken by the position of the
        // special that ends them.
        assert_eq!(sa, vec![0, 2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_parallel_sort_agrees() {
        let text: Vec<u8> = (0..5000u32).map(|i| ((i * 7 + i / 13) % 4) as u8).collect();
        assert_eq!(build_suffix_array(&text, 0), build_suffix_array(&text, usize::MAX));
    }

    #[test]
    fn test_lcp_matches_naive() {
        let mut builder = dna_builder();
        builder
            .add_file("a.fa", [&b"ACGTNACGTACG"[..], b"ACGTTT", b"GGGG"])
            .unwrap();
        let built = builder.build().unwrap();
        let text = &built.encseq[..built.encseq.len() - 1];

        assert_eq!(built.lcp[0], 0);
        for row in 1..built.suffixes.len() {
            let a = built.suffixes[row] as usize;
            let b = built.suffixes[row - 1] as usize;
            assert_eq!(built.lcp[row], naive_lcp(text, a, b), "row {}", row);
        }
    }

    #[test]
    fn test_multiple_files() {
        let mut builder = dna_builder();
        builder.add_file("a.fa", [&b"ACG"[..], b"TT"]).unwrap();
        builder.add_file("b.fa", [b"GATC"]).unwrap();
        assert_eq!(builder.num_of_sequences(), 3);
        // 3 + 1 + 2 + 1 + 4
        assert_eq!(builder.text_size(), 11);

        let built = builder.build().unwrap();
        let files = &built.project.files;
        assert_eq!(files[0].length, 5);
        assert_eq!(files[0].effective_length, 6);
        assert_eq!(files[1].length, 4);
        assert_eq!(files[1].effective_length, 5);
        assert_eq!(built.project.special.special_characters, 2);
    }

    #[test]
    fn test_invalid_symbol_rolls_back() {
        let mut builder = dna_builder();
        builder.add_file("a.fa", [b"ACGT"]).unwrap();
        let err = builder.add_file("b.fa", [&b"AC"[..], b"AJ"]).unwrap_err();
        assert!(matches!(err, IndexError::InvalidSymbol { symbol: 'J', .. }));
        assert_eq!(builder.text_size(), 4);
        assert_eq!(builder.num_of_sequences(), 1);
    }

    #[test]
    fn test_rejects_empty_input() {
        let mut builder = dna_builder();
        assert!(builder.add_file("a.fa", [b""]).unwrap_err().is_format());
        assert!(builder.add_file("a.fa", Vec::<Vec<u8>>::new()).unwrap_err().is_format());
        assert!(dna_builder().build().err().unwrap().is_format());
    }

    #[test]
    fn test_recommended_prefix_length() {
        assert_eq!(recommended_prefix_length(3, 4), 1);
        assert_eq!(recommended_prefix_length(64, 4), 2);
        assert_eq!(recommended_prefix_length(1 << 20, 4), 9);
    }
}
