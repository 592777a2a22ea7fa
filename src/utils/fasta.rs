//! FASTA input for the index builder, parsed with needletail (plain or
//! compressed input is detected from the first bytes).

use crate::error::{IndexError, Result};
use needletail::errors::{ParseError, ParseErrorKind};
use needletail::parse_fastx_reader;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// One FASTA record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub header: String,
    pub sequence: Vec<u8>,
}

/// Read all records from a FASTA file. Whitespace inside sequence lines is
/// dropped; data before the first header is a format error. An empty file
/// has no records.
pub fn read_fasta(path: &Path) -> Result<Vec<FastaRecord>> {
    let file = File::open(path).map_err(|e| IndexError::resource("open", path, e))?;
    parse_fasta(file, &path.display().to_string())
}

pub fn parse_fasta<R: Read + Send>(reader: R, source: &str) -> Result<Vec<FastaRecord>> {
    let mut reader = match parse_fastx_reader(reader) {
        Ok(reader) => reader,
        Err(e) if matches!(e.kind, ParseErrorKind::EmptyFile) => return Ok(Vec::new()),
        Err(e) => return Err(format_error(source, e)),
    };

    let mut records = Vec::new();
    while let Some(record) = reader.next() {
        let record = record.map_err(|e| format_error(source, e))?;
        records.push(FastaRecord {
            header: String::from_utf8_lossy(record.id()).trim().to_string(),
            sequence: record.seq().iter().copied().filter(|b| !b.is_ascii_whitespace()).collect(),
        });
    }
    Ok(records)
}

fn format_error(source: &str, e: ParseError) -> IndexError {
    IndexError::Format(format!("{}: {}", source, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_records() {
        let text = b">seq1 first\nACGT\nAC GT\n\n>seq2\nTTTT\n";
        let records = parse_fasta(&text[..], "test.fa").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].header, "seq1 first");
        assert_eq!(records[0].sequence, b"ACGTACGT".to_vec());
        assert_eq!(records[1].sequence, b"TTTT".to_vec());
    }

    #[test]
    fn test_crlf_line_endings() {
        let records = parse_fasta(&b">a\r\nAC\r\nGT\r\n"[..], "dos.fa").unwrap();
        assert_eq!(records[0].header, "a");
        assert_eq!(records[0].sequence, b"ACGT".to_vec());
    }

    #[test]
    fn test_data_before_header() {
        let err = parse_fasta(&b"ACGT\n>x\nA\n"[..], "bad.fa").unwrap_err();
        assert!(err.is_format());
    }

    #[test]
    fn test_empty_and_missing_files() {
        let dir = tempdir().unwrap();
        let empty = dir.path().join("empty.fa");
        fs::write(&empty, b"").unwrap();
        assert!(read_fasta(&empty).unwrap().is_empty());

        let err = read_fasta(&dir.path().join("absent.fa")).unwrap_err();
        assert!(matches!(err, IndexError::Resource { .. }), "{}", err);
    }
}
