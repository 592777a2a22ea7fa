//! Suffix array writer
//!
//! Writes the tables of a built suffix array next to its project and
//! alphabet files, in the layout read back by the loaders.

use super::builder::BuiltSuffixArray;
use crate::error::{IndexError, Result};
use crate::index::types::*;
use crate::utils::encoding::encode_ne;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::debug;

const WRITE_BUFFER: usize = 65536;

/// Writes every file of an index named by a path prefix
pub struct SuffixArrayWriter;

impl SuffixArrayWriter {
    /// Write all files of `built` for the index `indexname`
    ///
    /// Creates:
    /// - `.prj` and `.al1`: project metadata and alphabet
    /// - `.esq`, `.bwt`: encoded sequence and BWT, one byte per row
    /// - `.suf`: suffix table
    /// - `.lcp`, `.llv`: LCP bytes and the overflow pairs
    pub fn write(indexname: &Path, built: &BuiltSuffixArray) -> Result<()> {
        create_parent(indexname)?;
        let width = built.project.integer_width.bytes();

        built.project.write(indexname)?;
        built
            .alphabet
            .write_al1(&index_file(indexname, ALPHABET_SUFFIX))?;
        write_bytes(&index_file(indexname, ENCSEQ_SUFFIX), &built.encseq)?;
        write_table(
            &index_file(indexname, SUFTAB_SUFFIX),
            built.suffixes.iter().copied(),
            width,
        )?;
        Self::write_lcp(indexname, &built.lcp, width)?;
        write_bytes(&index_file(indexname, BWTTAB_SUFFIX), &built.bwt)?;

        debug!(index = %indexname.display(), "wrote suffix array");
        Ok(())
    }

    /// One byte per row, saturated at the overflow marker; the overflow
    /// table lists `(row, value)` for each saturated row in row order.
    fn write_lcp(indexname: &Path, lcp: &[Seqpos], width: usize) -> Result<()> {
        let small: Vec<u8> = lcp
            .iter()
            .map(|&v| v.min(LCP_OVERFLOW as Seqpos) as u8)
            .collect();
        write_bytes(&index_file(indexname, LCPTAB_SUFFIX), &small)?;

        let large = lcp
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v >= LCP_OVERFLOW as Seqpos)
            .flat_map(|(row, &v)| [row as Seqpos, v]);
        write_table(&index_file(indexname, LARGE_LCP_SUFFIX), large, width)
    }
}

pub(crate) fn create_parent(indexname: &Path) -> Result<()> {
    match indexname.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| IndexError::resource("create", dir, e))
        }
        _ => Ok(()),
    }
}

pub(crate) fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    let file = File::create(path).map_err(|e| IndexError::resource("create", path, e))?;
    let mut out = BufWriter::with_capacity(WRITE_BUFFER, file);
    out.write_all(bytes)
        .and_then(|_| out.flush())
        .map_err(|e| IndexError::resource("write", path, e))
}

/// Write `values` as `width`-byte integers in host byte order
pub(crate) fn write_table<I>(path: &Path, values: I, width: usize) -> Result<()>
where
    I: IntoIterator<Item = u64>,
{
    let file = File::create(path).map_err(|e| IndexError::resource("create", path, e))?;
    let mut out = BufWriter::with_capacity(WRITE_BUFFER, file);

    // Encode in chunks to reduce write_all overhead
    let mut buffer = Vec::with_capacity(WRITE_BUFFER);
    let mut slot = [0u8; 8];
    let write_err = |e: std::io::Error| IndexError::resource("write", path, e);
    for value in values {
        encode_ne(value, &mut slot[..width]);
        buffer.extend_from_slice(&slot[..width]);
        if buffer.len() >= WRITE_BUFFER {
            out.write_all(&buffer).map_err(write_err)?;
            buffer.clear();
        }
    }
    if !buffer.is_empty() {
        out.write_all(&buffer).map_err(write_err)?;
    }
    out.flush().map_err(write_err)
}
