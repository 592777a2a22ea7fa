//! Shared building blocks
//!
//! - [`bitset`] - Fixed-size bit sets for the first-code filters
//! - [`encoding`] - Native-endian fixed-width integers for table files
//! - [`fasta`] - FASTA input for the builder
//! - [`progress`] - Progress bars, no-op without the `progress` feature
//! - [`radix`] - LSD radix sort for k-mer code buffers

pub mod bitset;
pub mod encoding;
pub mod fasta;
pub mod progress;
pub mod radix;

pub use bitset::BitSet;
pub use encoding::*;
pub use fasta::{FastaRecord, parse_fasta, read_fasta};
pub use radix::radix_sort_u64;
