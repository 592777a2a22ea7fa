//! # seqindex - Suffix array and FM-index tables for encoded sequences
//!
//! seqindex stores biological sequences as a family of flat table files
//! (encoded sequence, suffix table, LCP with overflow table, BWT and an
//! FM-index data file) described by a small `key=value` project file, and
//! loads them either by memory mapping or by streaming.
//!
//! ## Architecture
//!
//! The crate is organized into these main modules:
//!
//! - [`alphabet`] - Symbol to code mapping and the `.al1` format
//! - [`index`] - Project metadata, suffix array and FM-index loaders and
//!   writers, and the first-codes k-mer engine
//! - [`utils`] - Integer codec, bit sets, radix sort, FASTA input
//!
//! ## Quick Start
//!
//! ```no_run
//! use seqindex::alphabet::Alphabet;
//! use seqindex::index::suffix_array::{SuffixArray, SuffixArrayBuilder, SuffixArrayWriter};
//! use seqindex::index::{Demand, LoaderConfig};
//! use std::path::Path;
//!
//! let mut builder = SuffixArrayBuilder::with_defaults(Alphabet::dna());
//! builder.add_file("reads.fa", [&b"ACGTACGT"[..], b"GATTACA"])?;
//! let built = builder.build()?;
//!
//! let name = Path::new("/tmp/reads");
//! SuffixArrayWriter::write(name, &built)?;
//!
//! let sa = SuffixArray::map(name, Demand::ALL, &LoaderConfig::default())?;
//! assert_eq!(sa.search_symbols(b"ACGT")?.count(), 2);
//! # Ok::<(), seqindex::IndexError>(())
//! ```
//!
//! ## Table access
//!
//! Mapped tables answer random access queries directly from the page cache.
//! Streamed tables read sequentially through a fixed buffer, so a full scan
//! of a table never holds more than one buffer in memory.

pub mod alphabet;
pub mod error;
pub mod index;
pub mod utils;

pub use error::{IndexError, Result};
