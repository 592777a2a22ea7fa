//! Suffix array tables
//!
//! An index consists of parallel tables over the encoded sequence, each with
//! `totallength + 1` elements: the encoded sequence itself, the suffix table,
//! the LCP table (one byte per row, larger values in a separate overflow
//! table) and the BWT. Tables are loaded in one of two ways:
//!
//! - [`SuffixArray::map`] memory-maps the requested tables for random access
//! - [`SuffixArrayStream::open`] opens them as buffered forward-only streams
//!
//! Both read the project and alphabet files first and only touch the tables
//! named in the [`Demand`](crate::index::types::Demand).
//!
//! ## Architecture
//!
//! - `builder`: Encodes sequences and sorts their suffixes
//! - `writer`: Persists the tables and metadata files
//! - `table`: Mapped and streamed table primitives
//! - `mapped`: Memory-mapped loading and searching
//! - `stream`: Sequential loading
//! - `types`: Build configuration and statistics

pub mod builder;
pub mod mapped;
pub mod stream;
pub mod table;
pub mod types;
pub mod writer;

// Re-exports for convenience
pub use builder::{BuiltSuffixArray, SuffixArrayBuilder};
pub use mapped::SuffixArray;
pub use stream::SuffixArrayStream;
pub use types::{BuildConfig, SuffixArrayStats};
pub use writer::SuffixArrayWriter;

use crate::alphabet::Alphabet;
use crate::error::Result;
use crate::index::project::ProjectRecord;
use crate::index::types::{ALPHABET_SUFFIX, LoaderConfig, index_file};
use std::path::Path;

/// Setup shared by both loaders: project file, then alphabet file
pub(crate) fn load_common(indexname: &Path, config: &LoaderConfig) -> Result<(ProjectRecord, Alphabet)> {
    let project = ProjectRecord::read(indexname, config)?;
    let alphabet = Alphabet::read_al1(&index_file(indexname, ALPHABET_SUFFIX))?;
    Ok((project, alphabet))
}
