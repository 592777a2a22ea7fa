//! Alphabet codec
//!
//! Maps input symbols to minimal integer codes and back. Symbols are grouped
//! into equivalence classes; the first symbol added to a class is the one
//! returned by [`Alphabet::decode`]. An alphabet may additionally carry one
//! wildcard class which encodes to the special code [`WILDCARD`].
//!
//! ## File Format
//!
//! The `.al1` file stores one class per line, canonical symbol first. The
//! last line is always the wildcard class and may be empty.

use crate::error::{IndexError, Result};
use crate::index::types::WILDCARD;
use std::fs;
use std::path::Path;

/// Marker for symbols without a class
const UNMAPPED: u8 = u8::MAX;

/// Maximum number of regular classes (codes `0..MAX_CHARS`)
pub const MAX_CHARS: usize = WILDCARD as usize;

/// How many leading symbols [`Alphabet::guess`] inspects
const GUESS_SAMPLE: usize = 1000;

/// Symbols that only occur in protein sequences
const PROTEIN_ONLY: &[u8] = b"LIFEQPXZlifeqpxz";

const DNA_CLASSES: &[&[u8]] = &[b"Aa", b"Cc", b"Gg", b"TtUu"];
const DNA_WILDCARDS: &[u8] = b"nsywrkvbdhmNSYWRKVBDHM";

const PROTEIN_CLASSES: &[&[u8]] = &[
    b"Ll", b"Vv", b"Ii", b"Ff", b"Kk", b"Rr", b"Ee", b"Dd", b"Aa", b"Gg", b"Ss", b"Tt", b"Nn",
    b"Qq", b"Yy", b"Ww", b"Pp", b"Hh", b"Mm", b"Cc",
];
const PROTEIN_WILDCARDS: &[u8] = b"XUBZ*xubz";

/// Symbol-to-code mapping with canonical decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    /// Code for every byte value, `UNMAPPED` when unregistered
    map: [u8; 256],
    /// Regular classes in code order, canonical symbol first
    classes: Vec<Vec<u8>>,
    /// Wildcard class, empty if the alphabet has none
    wildcard: Vec<u8>,
}

impl Default for Alphabet {
    fn default() -> Self {
        Self::new()
    }
}

impl Alphabet {
    /// Create an alphabet without any classes
    pub fn new() -> Self {
        Self {
            map: [UNMAPPED; 256],
            classes: Vec::new(),
            wildcard: Vec::new(),
        }
    }

    /// Nucleotide alphabet: A, C, G, T/U plus IUPAC wildcards
    pub fn dna() -> Self {
        Self::preset(DNA_CLASSES, DNA_WILDCARDS)
    }

    /// Amino acid alphabet with X, U, B, Z and `*` as wildcards
    pub fn protein() -> Self {
        Self::preset(PROTEIN_CLASSES, PROTEIN_WILDCARDS)
    }

    /// Pick the DNA or protein preset from a sequence sample
    pub fn guess(sample: &[u8]) -> Self {
        let window = &sample[..sample.len().min(GUESS_SAMPLE)];
        if window.iter().any(|b| PROTEIN_ONLY.contains(b)) {
            Self::protein()
        } else {
            Self::dna()
        }
    }

    fn preset(classes: &[&[u8]], wildcard: &[u8]) -> Self {
        let mut alpha = Self::new();
        for (code, class) in classes.iter().enumerate() {
            for &symbol in class.iter() {
                alpha.map[symbol as usize] = code as u8;
            }
            alpha.classes.push(class.to_vec());
        }
        for &symbol in wildcard {
            alpha.map[symbol as usize] = WILDCARD;
        }
        alpha.wildcard = wildcard.to_vec();
        alpha
    }

    /// Register a class of equivalent symbols. The first symbol becomes the
    /// result of decoding the class's code.
    pub fn add_mapping(&mut self, symbols: &[u8]) -> Result<()> {
        if self.classes.len() >= MAX_CHARS {
            return Err(IndexError::Format(format!(
                "alphabet cannot hold more than {} classes",
                MAX_CHARS
            )));
        }
        self.check_new_class(symbols)?;
        let code = self.classes.len() as u8;
        for &symbol in symbols {
            self.map[symbol as usize] = code;
        }
        self.classes.push(symbols.to_vec());
        Ok(())
    }

    /// Register the wildcard class. Only one wildcard class is allowed.
    pub fn add_wildcard_mapping(&mut self, symbols: &[u8]) -> Result<()> {
        if !self.wildcard.is_empty() {
            return Err(IndexError::Format(
                "alphabet already has a wildcard class".to_string(),
            ));
        }
        self.check_new_class(symbols)?;
        for &symbol in symbols {
            self.map[symbol as usize] = WILDCARD;
        }
        self.wildcard = symbols.to_vec();
        Ok(())
    }

    fn check_new_class(&self, symbols: &[u8]) -> Result<()> {
        if symbols.is_empty() {
            return Err(IndexError::Format("empty symbol class".to_string()));
        }
        for (i, &symbol) in symbols.iter().enumerate() {
            if self.map[symbol as usize] != UNMAPPED || symbols[..i].contains(&symbol) {
                return Err(IndexError::Format(format!(
                    "symbol {:?} is mapped twice",
                    symbol as char
                )));
            }
        }
        Ok(())
    }

    /// Code of a symbol, `None` if the symbol is not registered
    #[inline]
    pub fn encode(&self, symbol: u8) -> Option<u8> {
        let code = self.map[symbol as usize];
        (code != UNMAPPED).then_some(code)
    }

    /// Canonical symbol of a code
    #[inline]
    pub fn decode(&self, code: u8) -> Option<u8> {
        if let Some(class) = self.classes.get(code as usize) {
            return Some(class[0]);
        }
        if code == WILDCARD {
            return self.wildcard.first().copied();
        }
        None
    }

    /// The canonical representative of a symbol's class
    pub fn canonical(&self, symbol: u8) -> Option<u8> {
        self.encode(symbol).and_then(|code| self.decode(code))
    }

    #[inline]
    pub fn is_valid(&self, symbol: u8) -> bool {
        self.map[symbol as usize] != UNMAPPED
    }

    /// Two alphabets are compatible when they map every symbol identically
    pub fn is_compatible_with(&self, other: &Alphabet) -> bool {
        self == other
    }

    /// Number of classes including the wildcard class
    pub fn size(&self) -> usize {
        self.classes.len() + usize::from(self.has_wildcard())
    }

    /// Number of regular (non-wildcard) classes
    pub fn num_of_chars(&self) -> usize {
        self.classes.len()
    }

    pub fn has_wildcard(&self) -> bool {
        !self.wildcard.is_empty()
    }

    /// Encode `input` into `output`, which must have the same length
    pub fn encode_seq_into(&self, input: &[u8], output: &mut [u8]) -> Result<()> {
        check_lengths(input.len(), output.len())?;
        for (position, (&symbol, slot)) in input.iter().zip(output.iter_mut()).enumerate() {
            *slot = self.encode(symbol).ok_or(IndexError::InvalidSymbol {
                symbol: symbol as char,
                position,
            })?;
        }
        Ok(())
    }

    /// Encode a buffer in place. The buffer is left untouched on error.
    pub fn encode_seq_in_place(&self, buf: &mut [u8]) -> Result<()> {
        if let Some(position) = buf.iter().position(|&b| !self.is_valid(b)) {
            return Err(IndexError::InvalidSymbol {
                symbol: buf[position] as char,
                position,
            });
        }
        for b in buf.iter_mut() {
            *b = self.map[*b as usize];
        }
        Ok(())
    }

    pub fn encode_seq(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; input.len()];
        self.encode_seq_into(input, &mut out)?;
        Ok(out)
    }

    /// Decode `input` into `output`, which must have the same length
    pub fn decode_seq_into(&self, input: &[u8], output: &mut [u8]) -> Result<()> {
        check_lengths(input.len(), output.len())?;
        for (position, (&code, slot)) in input.iter().zip(output.iter_mut()).enumerate() {
            *slot = self.decode(code).ok_or_else(|| undecodable(code, position))?;
        }
        Ok(())
    }

    /// Decode a buffer in place. The buffer is left untouched on error.
    pub fn decode_seq_in_place(&self, buf: &mut [u8]) -> Result<()> {
        if let Some(position) = buf.iter().position(|&c| self.decode(c).is_none()) {
            return Err(undecodable(buf[position], position));
        }
        for c in buf.iter_mut() {
            if let Some(symbol) = self.decode(*c) {
                *c = symbol;
            }
        }
        Ok(())
    }

    pub fn decode_seq(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![0u8; input.len()];
        self.decode_seq_into(input, &mut out)?;
        Ok(out)
    }

    /// Render in `.al1` format. Symbols are written as raw bytes.
    pub fn to_al1_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for class in self.classes.iter().chain(std::iter::once(&self.wildcard)) {
            out.extend_from_slice(class);
            out.push(b'\n');
        }
        out
    }

    /// Parse `.al1` content; `source` names the file in error messages
    pub fn parse_al1(data: &[u8], source: &str) -> Result<Self> {
        let lines: Vec<&[u8]> = if data.is_empty() {
            Vec::new()
        } else {
            let body = data.strip_suffix(b"\n").unwrap_or(data);
            body.split(|&b| b == b'\n')
                .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
                .collect()
        };
        let Some((wildcard, regular)) = lines.split_last() else {
            return Err(IndexError::Format(format!("{}: alphabet file is empty", source)));
        };

        let mut alpha = Self::new();
        for (linenum, line) in regular.iter().enumerate() {
            alpha.add_mapping(line).map_err(|e| {
                IndexError::Format(format!("{}: line {}: {}", source, linenum + 1, e))
            })?;
        }
        if !wildcard.is_empty() {
            alpha.add_wildcard_mapping(wildcard).map_err(|e| {
                IndexError::Format(format!("{}: line {}: {}", source, lines.len(), e))
            })?;
        }
        Ok(alpha)
    }

    pub fn read_al1(path: &Path) -> Result<Self> {
        let data = fs::read(path).map_err(|e| IndexError::resource("read", path, e))?;
        Self::parse_al1(&data, &path.display().to_string())
    }

    pub fn write_al1(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_al1_bytes()).map_err(|e| IndexError::resource("write", path, e))
    }
}

fn check_lengths(input: usize, output: usize) -> Result<()> {
    if input != output {
        return Err(IndexError::Config(format!(
            "output buffer holds {} symbols, input has {}",
            output, input
        )));
    }
    Ok(())
}

fn undecodable(code: u8, position: usize) -> IndexError {
    IndexError::Format(format!("code {} at position {} cannot be decoded", code, position))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dna_codes() {
        let dna = Alphabet::dna();
        assert_eq!(dna.encode(b'A'), Some(0));
        assert_eq!(dna.encode(b'c'), Some(1));
        assert_eq!(dna.encode(b'U'), Some(3));
        assert_eq!(dna.encode(b'N'), Some(WILDCARD));
        assert_eq!(dna.encode(b'J'), None);
        assert_eq!(dna.num_of_chars(), 4);
        assert_eq!(dna.size(), 5);
    }

    #[test]
    fn test_decode_is_canonical() {
        let dna = Alphabet::dna();
        assert_eq!(dna.canonical(b'u'), Some(b'T'));
        assert_eq!(dna.canonical(b'y'), Some(b'n'));
        assert_eq!(dna.decode(200), None);
    }

    #[test]
    fn test_seq_round_trip() {
        let dna = Alphabet::dna();
        let seq = b"ACGTTGCAnACGT";
        let encoded = dna.encode_seq(seq).unwrap();
        assert_eq!(dna.decode_seq(&encoded).unwrap(), seq.to_vec());

        let mut buf = seq.to_vec();
        dna.encode_seq_in_place(&mut buf).unwrap();
        assert_eq!(buf, encoded);
        dna.decode_seq_in_place(&mut buf).unwrap();
        assert_eq!(buf, seq.to_vec());
    }

    #[test]
    fn test_invalid_symbol_leaves_buffer() {
        let dna = Alphabet::dna();
        let mut buf = b"ACJT".to_vec();
        let err = dna.encode_seq_in_place(&mut buf).unwrap_err();
        assert!(matches!(err, IndexError::InvalidSymbol { symbol: 'J', position: 2 }));
        assert_eq!(buf, b"ACJT".to_vec());
    }

    #[test]
    fn test_add_mapping_rejects_duplicates() {
        let mut alpha = Alphabet::new();
        alpha.add_mapping(b"Aa").unwrap();
        assert!(alpha.add_mapping(b"Bb").is_ok());
        assert!(alpha.add_mapping(b"aC").is_err());
        assert!(alpha.add_mapping(b"DD").is_err());
        assert!(alpha.add_mapping(b"").is_err());
        assert_eq!(alpha.size(), 2);
    }

    #[test]
    fn test_guess() {
        assert_eq!(Alphabet::guess(b"ACGTNNACGT"), Alphabet::dna());
        assert_eq!(Alphabet::guess(b"MKVLAAGIL"), Alphabet::protein());
    }

    #[test]
    fn test_al1_round_trip() {
        for alpha in [Alphabet::dna(), Alphabet::protein()] {
            let text = alpha.to_al1_bytes();
            let parsed = Alphabet::parse_al1(&text, "test.al1").unwrap();
            assert!(parsed.is_compatible_with(&alpha));
        }

        let mut plain = Alphabet::new();
        plain.add_mapping(b"01").unwrap();
        plain.add_mapping(b"2").unwrap();
        let parsed = Alphabet::parse_al1(&plain.to_al1_bytes(), "plain.al1").unwrap();
        assert_eq!(parsed, plain);
        assert!(!parsed.has_wildcard());
    }

    #[test]
    fn test_al1_rejects_bad_input() {
        assert!(Alphabet::parse_al1(b"", "empty.al1").unwrap_err().is_format());
        assert!(Alphabet::parse_al1(b"Aa\nA\n\n", "dup.al1").unwrap_err().is_format());
    }

    #[test]
    fn test_al1_file_keeps_high_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin.al1");
        let mut alpha = Alphabet::new();
        alpha.add_mapping(b"\xE9\xC9").unwrap();
        alpha.add_mapping(b"x").unwrap();
        alpha.add_wildcard_mapping(b"\xFE").unwrap();

        alpha.write_al1(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"\xE9\xC9\nx\n\xFE\n".to_vec());
        let parsed = Alphabet::read_al1(&path).unwrap();
        assert_eq!(parsed, alpha);
        assert_eq!(parsed.encode(0xC9), Some(0));
        assert_eq!(parsed.decode(0), Some(0xE9));
        assert_eq!(parsed.encode(0xFE), Some(WILDCARD));
    }

    #[test]
    fn test_al1_crlf_lines() {
        let parsed = Alphabet::parse_al1(b"Aa\r\nCc\r\n\r\n", "dos.al1").unwrap();
        assert_eq!(parsed.num_of_chars(), 2);
        assert!(!parsed.has_wildcard());
    }

    #[test]
    fn test_incompatible_alphabets() {
        assert!(!Alphabet::dna().is_compatible_with(&Alphabet::protein()));
    }
}
