//! Types for building and inspecting suffix arrays

use crate::index::types::{IntegerWidth, Seqpos};
use serde::{Deserialize, Serialize};

/// Configuration for suffix array building
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Integer width of the written tables (default: native)
    pub integer_width: IntegerWidth,
    /// Sort suffixes with rayon once the text is longer than this
    pub parallel_sort_threshold: usize,
    /// Bucket prefix length recorded in the project file. Derived from the
    /// text length when unset.
    pub prefix_length: Option<u64>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            integer_width: IntegerWidth::native(),
            parallel_sort_threshold: 100_000,
            prefix_length: None,
        }
    }
}

/// Statistics about a loaded suffix array
#[derive(Debug, Clone, Serialize)]
pub struct SuffixArrayStats {
    pub total_length: Seqpos,
    pub num_of_sequences: u64,
    /// Names of the tables currently held
    pub tables: Vec<&'static str>,
    /// Bytes of all mapped tables
    pub mapped_bytes: usize,
}
