//! Binary-search cache over the sorted distinct codes
//!
//! The cache holds the pivots of the first `depth + 1` levels of a plain
//! binary search, stored in order so that the pivot of a cache range
//! `[cl, ch)` sits at its midpoint `cl + (ch - 1 - cl) / 2`, exactly like the
//! pivot of a code range `[lo, hi)`. A lookup walks the cache first and only
//! touches the large code array for the final, narrowed binary search.

use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheEntry {
    code: u64,
    index: usize,
}

#[derive(Debug, Clone)]
pub struct BinarySearchCache {
    entries: Vec<CacheEntry>,
    depth: u32,
    /// Sum of the widths of the ranges below the deepest level
    uncached_width: u64,
    uncached_ranges: u64,
}

/// Entries of a complete cache of the given depth
pub fn cache_size(depth: u32) -> u64 {
    (1u64 << (depth + 1)) - 1
}

impl BinarySearchCache {
    /// Build a cache of `depth + 1` levels, `None` when the cache would not
    /// be smaller than `codes`.
    pub fn build(codes: &[u64], depth: u32) -> Option<Self> {
        let size = cache_size(depth);
        if size >= codes.len() as u64 {
            return None;
        }

        let mut cache = Self {
            entries: Vec::with_capacity(size as usize),
            depth,
            uncached_width: 0,
            uncached_ranges: 0,
        };
        cache.fill(codes, 0, codes.len(), 0);
        debug_assert_eq!(cache.entries.len() as u64, size);
        Some(cache)
    }

    /// In-order construction: left subtree, pivot, right subtree
    fn fill(&mut self, codes: &[u64], lo: usize, hi: usize, level: u32) {
        if level > self.depth {
            self.uncached_width += (hi - lo) as u64;
            self.uncached_ranges += 1;
            return;
        }
        let mid = lo + (hi - 1 - lo) / 2;
        self.fill(codes, lo, mid, level + 1);
        self.entries.push(CacheEntry {
            code: codes[mid],
            index: mid,
        });
        self.fill(codes, mid + 1, hi, level + 1);
    }

    /// Index of `code` in `codes`, which must be the array the cache was
    /// built from
    pub fn find(&self, codes: &[u64], code: u64) -> Option<usize> {
        let (mut cl, mut ch) = (0usize, self.entries.len());
        let (mut lo, mut hi) = (0usize, codes.len());

        while cl < ch {
            let cm = cl + (ch - 1 - cl) / 2;
            let entry = self.entries[cm];
            match code.cmp(&entry.code) {
                Ordering::Equal => return Some(entry.index),
                Ordering::Less => {
                    ch = cm;
                    hi = entry.index;
                }
                Ordering::Greater => {
                    cl = cm + 1;
                    lo = entry.index + 1;
                }
            }
        }

        codes[lo..hi].binary_search(&code).ok().map(|i| lo + i)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Average width of the code ranges left to the final binary search
    pub fn average_uncached_width(&self) -> f64 {
        if self.uncached_ranges == 0 {
            0.0
        } else {
            self.uncached_width as f64 / self.uncached_ranges as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(n: u64) -> Vec<u64> {
        (0..n).map(|i| i * 3 + 1).collect()
    }

    #[test]
    fn test_not_built_when_too_large() {
        assert!(BinarySearchCache::build(&codes(7), 2).is_none());
        assert!(BinarySearchCache::build(&codes(8), 2).is_some());
    }

    #[test]
    fn test_exact_size_and_order() {
        for n in [8, 9, 15, 16, 100, 1000] {
            let codes = codes(n);
            let cache = BinarySearchCache::build(&codes, 2).unwrap();
            assert_eq!(cache.len(), 7);
            let pivots: Vec<u64> = cache.entries.iter().map(|e| e.code).collect();
            assert!(pivots.windows(2).all(|w| w[0] < w[1]));
            assert!(cache.entries.iter().all(|e| codes[e.index] == e.code));
        }
    }

    #[test]
    fn test_find_every_depth() {
        let codes = codes(1000);
        for depth in 0..9 {
            let cache = BinarySearchCache::build(&codes, depth).unwrap();
            for query in 0..3005 {
                assert_eq!(
                    cache.find(&codes, query),
                    codes.binary_search(&query).ok(),
                    "depth {} query {}",
                    depth,
                    query
                );
            }
        }
    }

    #[test]
    fn test_uncached_width() {
        let codes = codes(15);
        let cache = BinarySearchCache::build(&codes, 1).unwrap();
        // 3 pivots leave 4 ranges of 3 codes
        assert_eq!(cache.average_uncached_width(), 3.0);
    }
}
