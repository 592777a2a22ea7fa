//! Fixed-width unsigned integers in host byte order.
//!
//! Index tables are written on the machine that built them and read back
//! without conversion, so every element is stored in native order. Widths of
//! 1, 4 and 8 bytes are used by the tables; any width up to 8 works.

use std::io::{self, ErrorKind, Read, Write};

/// Decode an integer stored in `bytes.len()` bytes of host byte order
#[inline]
pub fn decode_ne(bytes: &[u8]) -> u64 {
    let n = bytes.len();
    let mut buf = [0u8; 8];
    if cfg!(target_endian = "little") {
        buf[..n].copy_from_slice(bytes);
        u64::from_le_bytes(buf)
    } else {
        buf[8 - n..].copy_from_slice(bytes);
        u64::from_be_bytes(buf)
    }
}

/// Encode the low `out.len()` bytes of `value` in host byte order
#[inline]
pub fn encode_ne(value: u64, out: &mut [u8]) {
    let n = out.len();
    if cfg!(target_endian = "little") {
        out.copy_from_slice(&value.to_le_bytes()[..n]);
    } else {
        out.copy_from_slice(&value.to_be_bytes()[8 - n..]);
    }
}

/// Write `value` using `width` bytes
pub fn write_uint<W: Write>(writer: &mut W, value: u64, width: usize) -> io::Result<()> {
    let mut buf = [0u8; 8];
    encode_ne(value, &mut buf[..width]);
    writer.write_all(&buf[..width])
}

/// Read one `width`-byte integer, `None` on a clean end of input.
///
/// Running out of input in the middle of an element is an error.
pub fn read_uint_or_eof<R: Read>(reader: &mut R, width: usize) -> io::Result<Option<u64>> {
    let mut buf = [0u8; 8];
    let mut filled = 0;
    while filled < width {
        match reader.read(&mut buf[filled..width]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    match filled {
        0 => Ok(None),
        n if n == width => Ok(Some(decode_ne(&buf[..width]))),
        _ => Err(io::Error::new(
            ErrorKind::UnexpectedEof,
            "table ends inside an element",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encode_decode_widths() {
        for (value, width) in [(7u64, 1usize), (0xDEAD_BEEF, 4), (u64::MAX - 3, 8)] {
            let mut buf = vec![0u8; width];
            encode_ne(value, &mut buf);
            assert_eq!(decode_ne(&buf), value);
        }
    }

    #[test]
    fn test_matches_native_layout() {
        let mut buf = [0u8; 4];
        encode_ne(0x0102_0304, &mut buf);
        assert_eq!(buf, 0x0102_0304u32.to_ne_bytes());
    }

    #[test]
    fn test_stream_reading() {
        let mut data = Vec::new();
        write_uint(&mut data, 42, 4).unwrap();
        write_uint(&mut data, 7, 4).unwrap();
        let mut cursor = Cursor::new(data);
        assert_eq!(read_uint_or_eof(&mut cursor, 4).unwrap(), Some(42));
        assert_eq!(read_uint_or_eof(&mut cursor, 4).unwrap(), Some(7));
        assert_eq!(read_uint_or_eof(&mut cursor, 4).unwrap(), None);
    }

    #[test]
    fn test_truncated_element() {
        let mut cursor = Cursor::new(vec![1u8, 2, 3]);
        let err = read_uint_or_eof(&mut cursor, 4).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
