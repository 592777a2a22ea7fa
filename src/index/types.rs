use serde::{Deserialize, Serialize};
use std::ops::{BitOr, BitOrAssign};
use std::path::{Path, PathBuf};

/// Position in the encoded sequence. Values are widened to 64 bits in memory
/// regardless of the on-disk integer width.
pub type Seqpos = u64;

/// Code of every wildcard symbol
pub const WILDCARD: u8 = 253;
/// Code placed between two sequences
pub const SEPARATOR: u8 = 254;
/// Terminator of the encoded table and BWT symbol of the row of suffix 0
pub const UNDEF_CHAR: u8 = 255;

/// Codes at or above `WILDCARD` never match anything
#[inline]
pub fn is_special(code: u8) -> bool {
    code >= WILDCARD
}

pub const PROJECT_SUFFIX: &str = ".prj";
pub const ALPHABET_SUFFIX: &str = ".al1";
pub const ENCSEQ_SUFFIX: &str = ".esq";
pub const SUFTAB_SUFFIX: &str = ".suf";
pub const LCPTAB_SUFFIX: &str = ".lcp";
pub const LARGE_LCP_SUFFIX: &str = ".llv";
pub const BWTTAB_SUFFIX: &str = ".bwt";
pub const FM_ASCII_SUFFIX: &str = ".fma";
pub const FM_DATA_SUFFIX: &str = ".fmd";

/// LCP values at or above this byte are stored in the large-LCP table
pub const LCP_OVERFLOW: u8 = u8::MAX;

/// Path of one file of an index: the index name with `suffix` appended
pub fn index_file(indexname: &Path, suffix: &str) -> PathBuf {
    let mut name = indexname.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Width of the integers stored in the binary tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntegerWidth {
    W32,
    W64,
}

impl IntegerWidth {
    /// Width of the running build
    pub fn native() -> Self {
        if cfg!(target_pointer_width = "64") {
            IntegerWidth::W64
        } else {
            IntegerWidth::W32
        }
    }

    pub fn from_bits(bits: u64) -> Option<Self> {
        match bits {
            32 => Some(IntegerWidth::W32),
            64 => Some(IntegerWidth::W64),
            _ => None,
        }
    }

    pub fn bits(self) -> u32 {
        match self {
            IntegerWidth::W32 => 32,
            IntegerWidth::W64 => 64,
        }
    }

    /// Bytes per stored integer
    pub fn bytes(self) -> usize {
        self.bits() as usize / 8
    }

    /// Largest value representable in this width
    pub fn max_value(self) -> u64 {
        match self {
            IntegerWidth::W32 => u32::MAX as u64,
            IntegerWidth::W64 => u64::MAX,
        }
    }
}

impl Default for IntegerWidth {
    fn default() -> Self {
        Self::native()
    }
}

/// Statistics about wildcard and separator positions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SpecialCharInfo {
    pub special_characters: Seqpos,
    pub special_ranges: Seqpos,
    pub real_special_ranges: Seqpos,
    pub length_of_special_prefix: Seqpos,
    pub length_of_special_suffix: Seqpos,
}

impl SpecialCharInfo {
    /// Compute the statistics of an encoded sequence (without terminator)
    pub fn from_encoded(encseq: &[u8]) -> Self {
        let special_characters = encseq.iter().filter(|&&c| is_special(c)).count() as Seqpos;
        let mut special_ranges = 0;
        let mut previous_special = false;
        for &c in encseq {
            let special = is_special(c);
            if special && !previous_special {
                special_ranges += 1;
            }
            previous_special = special;
        }
        let length_of_special_prefix =
            encseq.iter().take_while(|&&c| is_special(c)).count() as Seqpos;
        let length_of_special_suffix =
            encseq.iter().rev().take_while(|&&c| is_special(c)).count() as Seqpos;

        Self {
            special_characters,
            special_ranges,
            real_special_ranges: special_ranges,
            length_of_special_prefix,
            length_of_special_suffix,
        }
    }
}

/// Set of tables requested from the suffix array loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Demand(pub u8);

impl Demand {
    pub const NONE: Demand = Demand(0);
    pub const ESQTAB: Demand = Demand(1 << 0);
    pub const SUFTAB: Demand = Demand(1 << 1);
    pub const LCPTAB: Demand = Demand(1 << 2);
    pub const BWTTAB: Demand = Demand(1 << 3);
    pub const ALL: Demand = Demand(0b1111);

    #[inline]
    pub fn contains(self, other: Demand) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Demand {
    type Output = Demand;

    fn bitor(self, rhs: Demand) -> Demand {
        Demand(self.0 | rhs.0)
    }
}

impl BitOrAssign for Demand {
    fn bitor_assign(&mut self, rhs: Demand) {
        self.0 |= rhs.0;
    }
}

/// Entry of the large-LCP table: an LCP value that did not fit in a byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LargeLcpValue {
    /// Row in the suffix table
    pub position: Seqpos,
    pub value: Seqpos,
}

/// Configuration for opening an index
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Integer width this consumer was built for; indexes with another
    /// width are rejected
    pub integer_width: IntegerWidth,
    /// Read buffer size for streamed tables (bytes)
    pub stream_buffer_size: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            integer_width: IntegerWidth::native(),
            stream_buffer_size: 64 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_file_appends_suffix() {
        let path = index_file(Path::new("/tmp/idx/genome"), PROJECT_SUFFIX);
        assert_eq!(path, PathBuf::from("/tmp/idx/genome.prj"));
    }

    #[test]
    fn test_demand_flags() {
        let demand = Demand::SUFTAB | Demand::LCPTAB;
        assert!(demand.contains(Demand::SUFTAB));
        assert!(demand.contains(Demand::LCPTAB));
        assert!(!demand.contains(Demand::BWTTAB));
        assert!(Demand::ALL.contains(demand));
        assert!(demand.contains(Demand::NONE));
    }

    #[test]
    fn test_special_char_info() {
        let seq = [WILDCARD, 0, 1, SEPARATOR, WILDCARD, 2, 3, WILDCARD];
        let info = SpecialCharInfo::from_encoded(&seq);
        assert_eq!(info.special_characters, 4);
        assert_eq!(info.special_ranges, 3);
        assert_eq!(info.length_of_special_prefix, 1);
        assert_eq!(info.length_of_special_suffix, 1);
    }

    #[test]
    fn test_width() {
        assert_eq!(IntegerWidth::from_bits(32), Some(IntegerWidth::W32));
        assert_eq!(IntegerWidth::from_bits(16), None);
        assert_eq!(IntegerWidth::W64.bytes(), 8);
    }
}
