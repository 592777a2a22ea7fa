//! First-codes engine
//!
//! Collects the code of the first k-mer of every sequence, reduces them to
//! the sorted distinct codes, and then counts how often each of them occurs
//! anywhere in the sequences. The counts end up as prefix sums, i.e. bucket
//! boundaries for the suffixes starting with each first code.
//!
//! The pipeline runs in five phases:
//! 1. First code of every sequence into an array sized by the sequence count
//! 2. Sort
//! 3. Deduplicate with counts, marking both projection filters
//! 4. Binary-search cache over the distinct codes (large inputs only)
//! 5. Every k-mer passing both filters is buffered; full buffers are radix
//!    sorted and merged against the distinct codes
//!
//! ## Architecture
//!
//! - `kmer`: k-mer packing and sequence splitting
//! - `marks`: Prefix/suffix projection filters
//! - `cache`: Bounded-depth binary-search cache

pub mod cache;
pub mod kmer;
pub mod marks;

pub use cache::BinarySearchCache;
pub use kmer::{KmerCoder, bits_per_symbol, sequences};
pub use marks::Marks;

use crate::error::{IndexError, Result, try_vec};
use crate::utils::radix::radix_sort_u64;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::ops::Range;
use tracing::{debug, info, warn};

/// Configuration of the first-codes engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirstCodesConfig {
    /// Symbols per k-mer
    pub kmer_size: usize,
    /// Symbols in each filter projection
    pub mark_units: usize,
    /// Deepest level of the binary-search cache
    pub cache_depth: u32,
    /// k-mers buffered before a flush
    pub buffer_capacity: usize,
}

impl Default for FirstCodesConfig {
    fn default() -> Self {
        Self {
            kmer_size: 32,
            mark_units: 14,
            cache_depth: 15,
            buffer_capacity: 3_000_000,
        }
    }
}

/// Counters collected while running the engine
#[derive(Debug, Clone, Default, Serialize)]
pub struct FirstCodesStats {
    pub sequences: u64,
    /// Sequences without any k-mer free of special symbols
    pub skipped_sequences: u64,
    pub distinct_codes: u64,
    /// Buffered k-mers equal to a first code
    pub first_code_hits: u64,
    pub buffered_total: u64,
    pub flushes: u64,
    pub cache_entries: u64,
    pub average_uncached_width: f64,
}

/// Validated engine for one alphabet size
pub struct FirstCodes {
    config: FirstCodesConfig,
    coder: KmerCoder,
}

impl FirstCodes {
    pub fn new(num_of_chars: usize, config: FirstCodesConfig) -> Result<Self> {
        let bits = bits_per_symbol(num_of_chars);
        let k = config.kmer_size;
        let units = config.mark_units;

        if k == 0 || units == 0 {
            return Err(IndexError::Config(
                "k-mer size and mark units must be positive".to_string(),
            ));
        }
        if 2 * units > k {
            return Err(IndexError::Config(format!(
                "mark units ({}) must be at most half the k-mer size ({})",
                units, k
            )));
        }
        if bits as usize * k > 64 {
            return Err(IndexError::Config(format!(
                "{}-mers with {} bits per symbol do not fit into 64 bits",
                k, bits
            )));
        }
        if config.cache_depth >= 48 {
            return Err(IndexError::Config(format!(
                "cache depth {} is too large",
                config.cache_depth
            )));
        }
        if config.buffer_capacity == 0 {
            return Err(IndexError::Config("buffer capacity must be positive".to_string()));
        }

        Ok(Self {
            config,
            coder: KmerCoder::new(k, bits),
        })
    }

    pub fn coder(&self) -> &KmerCoder {
        &self.coder
    }

    /// Run all phases over an encoded sequence table
    pub fn run(&self, encseq: &[u8]) -> Result<FirstCodesIndex> {
        let (first_codes, sequences) = self.collect_first_codes(encseq)?;
        let skipped = sequences - first_codes.len() as u64;
        let marks = Marks::new(self.coder.bits(), self.coder.k(), self.config.mark_units)?;
        let mut index = FirstCodesIndex::from_first_codes(first_codes, marks, self.config.cache_depth)?;
        index.stats.sequences = sequences;
        index.stats.skipped_sequences = skipped;

        index.accumulate(encseq, &self.coder, self.config.buffer_capacity)?;
        index.finalize();

        let stats = &index.stats;
        info!(
            sequences = stats.sequences,
            distinct = stats.distinct_codes,
            hits = stats.first_code_hits,
            buffered = stats.buffered_total,
            flushes = stats.flushes,
            avg_uncached_width = stats.average_uncached_width,
            "first codes counted"
        );
        Ok(index)
    }

    /// Phase 1: the first k-mer code of every sequence. Returns the codes and
    /// the number of sequences scanned.
    pub fn collect_first_codes(&self, encseq: &[u8]) -> Result<(Vec<u64>, u64)> {
        let num_of_sequences = sequences(encseq).count();
        let mut codes = try_vec(num_of_sequences, "first codes")?;

        let mut skipped = 0u64;
        for seq in sequences(encseq) {
            match self.coder.first_code(seq) {
                Some(code) => codes.push(code),
                None => skipped += 1,
            }
        }
        if skipped > 0 {
            warn!(
                skipped,
                k = self.coder.k(),
                "sequences without a k-mer free of wildcards were skipped"
            );
        }
        debug!(codes = codes.len(), "collected first codes");
        Ok((codes, num_of_sequences as u64))
    }
}

/// Sorted distinct first codes with their counts
pub struct FirstCodesIndex {
    codes: Vec<u64>,
    /// One entry per code plus a trailing slot
    counts: Vec<u64>,
    marks: Marks,
    cache: Option<BinarySearchCache>,
    finalized: bool,
    stats: FirstCodesStats,
}

impl FirstCodesIndex {
    /// Phases 2 to 4 over the collected first codes
    pub fn from_first_codes(mut first_codes: Vec<u64>, mut marks: Marks, cache_depth: u32) -> Result<Self> {
        first_codes.sort_unstable();

        let distinct = first_codes.chunk_by(|a, b| a == b).count();
        let mut codes = try_vec(distinct, "distinct codes")?;
        let mut counts = try_vec(distinct + 1, "code counts")?;
        for run in first_codes.chunk_by(|a, b| a == b) {
            codes.push(run[0]);
            counts.push(run.len() as u64);
            marks.mark(run[0]);
        }
        counts.push(0);
        debug!(
            distinct,
            sequences = first_codes.len(),
            "removed duplicate first codes"
        );
        let num_first_codes = first_codes.len() as u64;
        drop(first_codes);

        let cache = BinarySearchCache::build(&codes, cache_depth);
        let stats = FirstCodesStats {
            sequences: num_first_codes,
            distinct_codes: distinct as u64,
            cache_entries: cache.as_ref().map_or(0, |c| c.len() as u64),
            average_uncached_width: cache.as_ref().map_or(0.0, |c| c.average_uncached_width()),
            ..Default::default()
        };
        match &cache {
            Some(cache) => debug!(
                entries = cache.len(),
                avg_uncached_width = cache.average_uncached_width(),
                "built binary search cache"
            ),
            None => debug!(distinct, "too few codes for a binary search cache"),
        }

        Ok(Self {
            codes,
            counts,
            marks,
            cache,
            finalized: false,
            stats,
        })
    }

    /// Index of `code` among the distinct codes
    pub fn find(&self, code: u64) -> Option<usize> {
        match &self.cache {
            Some(cache) => cache.find(&self.codes, code),
            None => self.codes.binary_search(&code).ok(),
        }
    }

    /// Phase 5: count every k-mer of `encseq` equal to a first code
    pub fn accumulate(&mut self, encseq: &[u8], coder: &KmerCoder, capacity: usize) -> Result<()> {
        let mut buffer: Vec<u64> = try_vec(capacity, "code buffer")?;
        let mut scratch: Vec<u64> = Vec::new();

        for seq in sequences(encseq) {
            for code in coder.codes(seq) {
                if !self.marks.is_marked(code) {
                    continue;
                }
                buffer.push(code);
                if buffer.len() == capacity {
                    self.flush(&mut buffer, &mut scratch);
                }
            }
        }
        if !buffer.is_empty() {
            self.flush(&mut buffer, &mut scratch);
        }
        Ok(())
    }

    /// Sort the buffer and merge it into the counts, starting at the first
    /// buffered code that is a first code
    fn flush(&mut self, buffer: &mut Vec<u64>, scratch: &mut Vec<u64>) {
        radix_sort_u64(buffer, scratch);
        self.stats.buffered_total += buffer.len() as u64;
        self.stats.flushes += 1;

        let start = buffer
            .iter()
            .enumerate()
            .find_map(|(b, &code)| self.find(code).map(|d| (b, d)));
        if let Some((mut b, mut d)) = start {
            while b < buffer.len() && d < self.codes.len() {
                match buffer[b].cmp(&self.codes[d]) {
                    Ordering::Less => b += 1,
                    Ordering::Greater => d += 1,
                    Ordering::Equal => {
                        self.counts[d] += 1;
                        self.stats.first_code_hits += 1;
                        b += 1;
                    }
                }
            }
        }
        debug!(flush = self.stats.flushes, size = buffer.len(), "flushed code buffer");
        buffer.clear();
    }

    /// Turn the counts into inclusive prefix sums with one trailing copy
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        let mut sum = 0;
        for count in &mut self.counts[..self.codes.len()] {
            sum += *count;
            *count = sum;
        }
        self.counts[self.codes.len()] = sum;
        self.finalized = true;
    }

    pub fn codes(&self) -> &[u64] {
        &self.codes
    }

    /// Raw counts before [`finalize`](Self::finalize), prefix sums after
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn num_of_distinct(&self) -> usize {
        self.codes.len()
    }

    /// Bucket of the code at index `i` after finalization
    pub fn bucket(&self, i: usize) -> Option<Range<u64>> {
        if !self.finalized || i >= self.codes.len() {
            return None;
        }
        let start = if i == 0 { 0 } else { self.counts[i - 1] };
        Some(start..self.counts[i])
    }

    pub fn cache(&self) -> Option<&BinarySearchCache> {
        self.cache.as_ref()
    }

    pub fn stats(&self) -> &FirstCodesStats {
        &self.stats
    }

    pub fn memory_usage(&self) -> usize {
        (self.codes.capacity() + self.counts.capacity()) * 8 + self.marks.memory_usage()
    }
}
