//! k-mer codes over an encoded sequence
//!
//! A k-mer is packed into a `u64` with `bits` bits per symbol, the first
//! symbol in the most significant position. Windows that contain a special
//! code produce no k-mer.

use crate::index::types::{SEPARATOR, UNDEF_CHAR, is_special};
use memchr::memchr;

/// Packs k-mers of a fixed size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KmerCoder {
    k: usize,
    bits: u32,
    mask: u64,
}

/// Bits needed for one symbol of an alphabet with `num_of_chars` regular
/// characters
pub fn bits_per_symbol(num_of_chars: usize) -> u32 {
    (usize::BITS - num_of_chars.saturating_sub(1).leading_zeros()).max(1)
}

impl KmerCoder {
    /// Callers guarantee `bits * k <= 64`
    pub fn new(k: usize, bits: u32) -> Self {
        let total = bits as usize * k;
        let mask = if total >= 64 { u64::MAX } else { (1u64 << total) - 1 };
        Self { k, bits, mask }
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Code of the first k-mer of `seq` without special symbols
    pub fn first_code(&self, seq: &[u8]) -> Option<u64> {
        self.codes(seq).next()
    }

    /// Codes of all k-mers of `seq` in sequence order
    pub fn codes<'a>(&self, seq: &'a [u8]) -> KmerCodes<'a> {
        KmerCodes {
            coder: *self,
            seq,
            pos: 0,
            code: 0,
            valid: 0,
        }
    }
}

/// Rolling k-mer iterator
pub struct KmerCodes<'a> {
    coder: KmerCoder,
    seq: &'a [u8],
    pos: usize,
    code: u64,
    /// Symbols since the last special
    valid: usize,
}

impl Iterator for KmerCodes<'_> {
    type Item = u64;

    fn next(&mut self) -> Option<u64> {
        while let Some(&c) = self.seq.get(self.pos) {
            self.pos += 1;
            if is_special(c) {
                self.valid = 0;
                self.code = 0;
                continue;
            }
            self.code = ((self.code << self.coder.bits) | c as u64) & self.coder.mask;
            self.valid += 1;
            if self.valid >= self.coder.k {
                return Some(self.code);
            }
        }
        None
    }
}

/// The sequences of an encoded table, split at separators. A trailing
/// terminator is ignored.
pub fn sequences(encseq: &[u8]) -> Sequences<'_> {
    let body = match encseq.split_last() {
        Some((&UNDEF_CHAR, body)) => body,
        _ => encseq,
    };
    Sequences {
        rest: body,
        done: false,
    }
}

pub struct Sequences<'a> {
    rest: &'a [u8],
    done: bool,
}

impl<'a> Iterator for Sequences<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.done {
            return None;
        }
        match memchr(SEPARATOR, self.rest) {
            Some(i) => {
                let seq = &self.rest[..i];
                self.rest = &self.rest[i + 1..];
                Some(seq)
            }
            None => {
                self.done = true;
                Some(self.rest)
            }
        }
    }
}
