//! Error type shared by the loaders, writers and the first-codes engine.

use std::collections::TryReserveError;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors returned while reading, writing or building an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Malformed metadata line, unknown or duplicate key, missing required key.
    #[error("{0}")]
    Format(String),
    /// The index was built for another integer width or byte order, or a file
    /// does not have the size implied by its metadata.
    #[error("{0}")]
    Consistency(String),
    /// Opening, mapping, seeking or reading a file failed.
    #[error("cannot {op} \"{}\": {source}", path.display())]
    Resource {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// A large table could not be allocated.
    #[error("cannot allocate {what}: {source}")]
    Allocation {
        what: &'static str,
        #[source]
        source: TryReserveError,
    },
    /// A symbol outside the alphabet was passed to the encoder.
    #[error("symbol {symbol:?} at position {position} is not part of the alphabet")]
    InvalidSymbol { symbol: char, position: usize },
    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl IndexError {
    pub(crate) fn resource(op: &'static str, path: &Path, source: io::Error) -> Self {
        Self::Resource {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn allocation(what: &'static str, source: TryReserveError) -> Self {
        Self::Allocation { what, source }
    }

    /// True for width/endianness/size mismatches
    pub fn is_consistency(&self) -> bool {
        matches!(self, Self::Consistency(_))
    }

    /// True for malformed or incomplete metadata
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

/// Allocate a vector with exactly `len` reserved slots, reporting failure
/// instead of aborting.
pub(crate) fn try_vec<T>(len: usize, what: &'static str) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|e| IndexError::allocation(what, e))?;
    Ok(v)
}
