//! Table primitives shared by the loaders
//!
//! A table is a flat file of fixed-width integers in host byte order.
//! [`MappedTable`] maps the whole file and checks its size against the
//! element count implied by the project file; [`TableStream`] reads it front
//! to back through a buffer. Both release their resources on drop.

use crate::error::{IndexError, Result};
use crate::utils::encoding::{decode_ne, read_uint_or_eof};
use memmap2::Mmap;
use std::fs::File;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Read-only mapping of a table file
pub struct MappedTable {
    mmap: Mmap,
    element_size: usize,
    path: PathBuf,
}

impl MappedTable {
    /// Map `path` and require exactly `expected` elements of `element_size`
    /// bytes.
    pub fn open(path: &Path, expected: u64, element_size: usize) -> Result<Self> {
        let file = File::open(path).map_err(|e| IndexError::resource("open", path, e))?;
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| IndexError::resource("map", path, e))?;
        // The mapping outlives the descriptor, so `file` is closed here.
        drop(file);

        let len = mmap.len();
        if len % element_size != 0 {
            return Err(IndexError::Consistency(format!(
                "size of file \"{}\" is {} which is not a multiple of {}",
                path.display(),
                len,
                element_size
            )));
        }
        let units = (len / element_size) as u64;
        if units != expected {
            return Err(IndexError::Consistency(format!(
                "number of mapped integers in \"{}\" = {} != {} = expected number of integers",
                path.display(),
                units,
                expected
            )));
        }

        Ok(Self {
            mmap,
            element_size,
            path: path.to_path_buf(),
        })
    }

    /// Element `i`. Panics when out of range.
    #[inline]
    pub fn get(&self, i: usize) -> u64 {
        let start = i * self.element_size;
        decode_ne(&self.mmap[start..start + self.element_size])
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.mmap.len() / self.element_size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn byte_len(&self) -> usize {
        self.mmap.len()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Buffered forward reader over a table file
pub struct TableStream {
    reader: BufReader<File>,
    width: usize,
    path: PathBuf,
}

impl TableStream {
    pub fn open(path: &Path, width: usize, buffer_size: usize) -> Result<Self> {
        let file = File::open(path).map_err(|e| IndexError::resource("open", path, e))?;
        Ok(Self {
            reader: BufReader::with_capacity(buffer_size, file),
            width,
            path: path.to_path_buf(),
        })
    }

    /// Next element, `None` at the end of the table
    pub fn next_value(&mut self) -> Result<Option<u64>> {
        read_uint_or_eof(&mut self.reader, self.width)
            .map_err(|e| IndexError::resource("read", &self.path, e))
    }

    /// Position the stream at element `index`
    pub fn seek_to(&mut self, index: u64) -> Result<()> {
        self.reader
            .seek(SeekFrom::Start(index * self.width as u64))
            .map_err(|e| IndexError::resource("seek", &self.path, e))?;
        Ok(())
    }
}

/// A stream that is only opened on first use
pub(crate) struct LazyStream {
    path: PathBuf,
    width: usize,
    buffer_size: usize,
    stream: Option<TableStream>,
}

impl LazyStream {
    pub(crate) fn new(path: PathBuf, width: usize, buffer_size: usize) -> Self {
        Self {
            path,
            width,
            buffer_size,
            stream: None,
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    pub(crate) fn get(&mut self) -> Result<&mut TableStream> {
        let stream = match self.stream.take() {
            Some(stream) => stream,
            None => TableStream::open(&self.path, self.width, self.buffer_size)?,
        };
        Ok(self.stream.insert(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::encoding::write_uint;
    use std::fs;
    use tempfile::tempdir;

    fn write_table(path: &Path, values: &[u64], width: usize) {
        let mut data = Vec::new();
        for &v in values {
            write_uint(&mut data, v, width).unwrap();
        }
        fs::write(path, data).unwrap();
    }

    #[test]
    fn test_mapped_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.suf");
        write_table(&path, &[3, 1, 4, 1, 5], 4);

        let table = MappedTable::open(&path, 5, 4).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.get(2), 4);
        assert_eq!(table.byte_len(), 20);
    }

    #[test]
    fn test_mapped_table_wrong_count() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.suf");
        write_table(&path, &[1, 2, 3], 4);

        let err = MappedTable::open(&path, 4, 4).err().unwrap();
        assert!(err.is_consistency());
    }

    #[test]
    fn test_mapped_table_not_multiple() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.suf");
        fs::write(&path, [0u8; 7]).unwrap();

        let err = MappedTable::open(&path, 1, 4).err().unwrap();
        assert!(err.is_consistency());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let err = MappedTable::open(&dir.path().join("none"), 0, 1).err().unwrap();
        assert!(matches!(err, IndexError::Resource { op: "open", .. }));
    }

    #[test]
    fn test_stream_and_seek() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.lcp");
        write_table(&path, &[0, 7, 9], 1);

        let mut stream = TableStream::open(&path, 1, 16).unwrap();
        stream.seek_to(1).unwrap();
        assert_eq!(stream.next_value().unwrap(), Some(7));
        assert_eq!(stream.next_value().unwrap(), Some(9));
        assert_eq!(stream.next_value().unwrap(), None);
    }

    #[test]
    fn test_lazy_stream_opens_on_use() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.bwt");
        write_table(&path, &[2], 1);

        let mut lazy = LazyStream::new(path, 1, 16);
        assert!(!lazy.is_open());
        assert_eq!(lazy.get().unwrap().next_value().unwrap(), Some(2));
        assert!(lazy.is_open());
    }
}
