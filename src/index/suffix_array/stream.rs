//! Sequential suffix array access
//!
//! The encoded sequence is mapped; suffix, LCP, overflow-LCP and BWT tables
//! are read front to back through buffered readers. The BWT and overflow
//! streams are opened on first read.

use super::load_common;
use super::table::{LazyStream, MappedTable, TableStream};
use crate::alphabet::Alphabet;
use crate::error::{IndexError, Result};
use crate::index::project::ProjectRecord;
use crate::index::types::*;
use std::path::Path;
use tracing::debug;

/// Suffix array whose tables are read as streams
pub struct SuffixArrayStream {
    project: ProjectRecord,
    alphabet: Alphabet,
    encseq: Option<MappedTable>,
    suftab: Option<TableStream>,
    lcptab: Option<TableStream>,
    llvtab: Option<LazyStream>,
    bwttab: Option<LazyStream>,
}

impl SuffixArrayStream {
    /// Open the tables named in `demand` of the index `indexname`.
    pub fn open(indexname: &Path, demand: Demand, config: &LoaderConfig) -> Result<Self> {
        let (project, alphabet) = load_common(indexname, config)?;
        let width = project.integer_width.bytes();
        let buffer_size = config.stream_buffer_size;
        let prj = || index_file(indexname, PROJECT_SUFFIX);

        let mut sa = Self {
            project,
            alphabet,
            encseq: None,
            suftab: None,
            lcptab: None,
            llvtab: None,
            bwttab: None,
        };

        if demand.contains(Demand::ESQTAB) {
            let path = index_file(indexname, ENCSEQ_SUFFIX);
            sa.encseq = Some(MappedTable::open(&path, sa.project.total_length + 1, 1)?);
        }
        if demand.contains(Demand::SUFTAB) {
            if sa.project.longest.is_none() {
                return Err(IndexError::Format(format!(
                    "{}: longest is required for the suffix table",
                    prj().display()
                )));
            }
            let path = index_file(indexname, SUFTAB_SUFFIX);
            sa.suftab = Some(TableStream::open(&path, width, buffer_size)?);
        }
        if demand.contains(Demand::BWTTAB) {
            let path = index_file(indexname, BWTTAB_SUFFIX);
            sa.bwttab = Some(LazyStream::new(path, 1, buffer_size));
        }
        if demand.contains(Demand::LCPTAB) {
            let path = index_file(indexname, LCPTAB_SUFFIX);
            let mut lcp = TableStream::open(&path, 1, buffer_size)?;
            // skip the reserved header element
            lcp.seek_to(1)?;
            sa.lcptab = Some(lcp);

            let Some(large) = sa.project.large_lcp_values else {
                return Err(IndexError::Format(format!(
                    "{}: largelcpvalues is required for the lcp table",
                    prj().display()
                )));
            };
            if large > 0 {
                let path = index_file(indexname, LARGE_LCP_SUFFIX);
                sa.llvtab = Some(LazyStream::new(path, width, buffer_size));
            }
        }

        debug!(
            index = %indexname.display(),
            total_length = sa.project.total_length,
            "opened suffix array streams"
        );
        Ok(sa)
    }

    /// Close every stream and unmap the encoded sequence. Calling this more
    /// than once is harmless.
    pub fn release(&mut self) {
        self.encseq = None;
        self.suftab = None;
        self.lcptab = None;
        self.llvtab = None;
        self.bwttab = None;
    }

    pub fn project(&self) -> &ProjectRecord {
        &self.project
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn total_length(&self) -> Seqpos {
        self.project.total_length
    }

    /// Row of the suffix starting at position 0
    pub fn longest(&self) -> Option<Seqpos> {
        self.project.longest
    }

    #[inline]
    pub fn encoded(&self, i: Seqpos) -> Option<u8> {
        self.encseq.as_ref()?.as_bytes().get(i as usize).copied()
    }

    /// Next entry of the suffix table, `None` after the last row
    pub fn next_suffix(&mut self) -> Result<Option<Seqpos>> {
        not_opened(self.suftab.as_mut(), "suffix")?.next_value()
    }

    /// LCP of the next row, starting with row 1
    pub fn next_lcp(&mut self) -> Result<Option<Seqpos>> {
        let Some(small) = not_opened(self.lcptab.as_mut(), "lcp")?.next_value()? else {
            return Ok(None);
        };
        if small < LCP_OVERFLOW as u64 {
            return Ok(Some(small));
        }

        let llv = not_opened(self.llvtab.as_mut(), "large lcp")?.get()?;
        let (Some(_position), Some(value)) = (llv.next_value()?, llv.next_value()?) else {
            return Err(IndexError::Consistency(
                "large lcp table has fewer entries than the lcp table refers to".to_string(),
            ));
        };
        Ok(Some(value))
    }

    /// Next BWT symbol, `None` after the last row
    pub fn next_bwt(&mut self) -> Result<Option<u8>> {
        let stream = not_opened(self.bwttab.as_mut(), "bwt")?.get()?;
        Ok(stream.next_value()?.map(|c| c as u8))
    }

    /// Iterate the remaining suffix table entries
    pub fn suffixes(&mut self) -> impl Iterator<Item = Result<Seqpos>> + '_ {
        std::iter::from_fn(move || self.next_suffix().transpose())
    }

    /// Iterate the remaining LCP values
    pub fn lcps(&mut self) -> impl Iterator<Item = Result<Seqpos>> + '_ {
        std::iter::from_fn(move || self.next_lcp().transpose())
    }
}

fn not_opened<'a, T>(table: Option<&'a mut T>, name: &str) -> Result<&'a mut T> {
    table.ok_or_else(|| IndexError::Config(format!("the {} table was not requested", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::suffix_array::{BuildConfig, SuffixArray, SuffixArrayBuilder, SuffixArrayWriter};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn setup_index(sequences: &[&[u8]]) -> (tempfile::TempDir, PathBuf) {
        let temp_dir = tempdir().unwrap();
        let indexname = temp_dir.path().join("idx");

        let mut builder = SuffixArrayBuilder::new(Alphabet::dna(), BuildConfig::default());
        builder.add_file("reads.fa", sequences).unwrap();
        SuffixArrayWriter::write(&indexname, &builder.build().unwrap()).unwrap();

        (temp_dir, indexname)
    }

    #[test]
    fn test_stream_matches_mapped() {
        let long = vec![b'C'; 280];
        let (_dir, indexname) = setup_index(&[b"ACGTNACGT", &long, b"GATTACA"]);
        let config = LoaderConfig::default();
        let mapped = SuffixArray::map(&indexname, Demand::ALL, &config).unwrap();
        let mut stream = SuffixArrayStream::open(&indexname, Demand::ALL, &config).unwrap();

        let n = mapped.total_length() + 1;
        for row in 0..n {
            assert_eq!(stream.next_suffix().unwrap(), mapped.suffix(row));
            assert_eq!(stream.next_bwt().unwrap(), mapped.bwt(row));
            assert_eq!(stream.encoded(row), mapped.encoded(row));
        }
        for row in 1..n {
            assert_eq!(stream.next_lcp().unwrap(), mapped.lcp(row), "row {}", row);
        }
        assert_eq!(stream.next_suffix().unwrap(), None);
        assert_eq!(stream.next_lcp().unwrap(), None);
        assert_eq!(stream.next_bwt().unwrap(), None);
    }

    #[test]
    fn test_iterators() {
        let (_dir, indexname) = setup_index(&[b"ACGT"]);
        let mut stream =
            SuffixArrayStream::open(&indexname, Demand::SUFTAB | Demand::LCPTAB, &LoaderConfig::default())
                .unwrap();

        let suffixes: Vec<Seqpos> = stream.suffixes().collect::<Result<_>>().unwrap();
        let mut sorted = suffixes.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..=4).collect::<Vec<_>>());
        assert_eq!(stream.lcps().count(), 4);
    }

    #[test]
    fn test_bwt_opened_lazily() {
        let (_dir, indexname) = setup_index(&[b"ACGT"]);
        fs::remove_file(index_file(&indexname, BWTTAB_SUFFIX)).unwrap();

        let mut stream = SuffixArrayStream::open(&indexname, Demand::ALL, &LoaderConfig::default()).unwrap();
        assert!(stream.next_suffix().unwrap().is_some());
        let err = stream.next_bwt().unwrap_err();
        assert!(matches!(err, IndexError::Resource { op: "open", .. }));
    }

    #[test]
    fn test_unrequested_table() {
        let (_dir, indexname) = setup_index(&[b"ACGT"]);
        let mut stream = SuffixArrayStream::open(&indexname, Demand::SUFTAB, &LoaderConfig::default()).unwrap();
        assert!(matches!(stream.next_lcp(), Err(IndexError::Config(_))));
        assert_eq!(stream.encoded(0), None);
    }

    #[test]
    fn test_requires_longest() {
        let (_dir, indexname) = setup_index(&[b"ACGT"]);
        let prj = index_file(&indexname, PROJECT_SUFFIX);
        let text = fs::read_to_string(&prj).unwrap();
        let text: String = text
            .lines()
            .filter(|l| !l.starts_with("longest="))
            .map(|l| format!("{}\n", l))
            .collect();
        fs::write(&prj, text).unwrap();

        let err = SuffixArrayStream::open(&indexname, Demand::SUFTAB, &LoaderConfig::default())
            .err()
            .unwrap();
        assert!(err.is_format());
        // without the suffix table the key is not needed
        assert!(SuffixArrayStream::open(&indexname, Demand::ESQTAB, &LoaderConfig::default()).is_ok());
    }

    #[test]
    fn test_release_twice() {
        let (_dir, indexname) = setup_index(&[b"ACGT"]);
        let mut stream = SuffixArrayStream::open(&indexname, Demand::ALL, &LoaderConfig::default()).unwrap();
        stream.release();
        stream.release();
        assert!(stream.next_suffix().is_err());
    }
}
