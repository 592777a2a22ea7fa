//! FM-index metadata file (`.fma`)

use crate::error::{IndexError, Result};
use crate::index::keyval::{Field, read_key_values, write_key_values};
use crate::index::types::{FM_ASCII_SUFFIX, Seqpos, SpecialCharInfo, index_file};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Largest supported block size exponent
pub const MAX_LOG2_BLOCK_SIZE: u32 = 16;
/// Mark distances must stay below 2^32
pub const MAX_LOG2_MARK_DIST: u32 = 31;

/// Parameters of an FM-index build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmIndexConfig {
    /// Rank counts are sampled every `2^log2_block_size` rows, and every
    /// `2^(2 * log2_block_size)` rows at superblock granularity
    pub log2_block_size: u32,
    /// Suffix positions are sampled every `2^log2_mark_dist` rows
    pub log2_mark_dist: u32,
    /// Store sampled positions so that `locate` works
    pub store_index_pos: bool,
    /// Length of the prefixes whose row ranges are precomputed
    pub suffix_length: u32,
}

impl Default for FmIndexConfig {
    fn default() -> Self {
        Self {
            log2_block_size: 7,
            log2_mark_dist: 4,
            store_index_pos: true,
            suffix_length: 3,
        }
    }
}

/// Scalars of the `.fma` file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FmMeta {
    pub bwt_length: Seqpos,
    /// Row of the suffix starting at position 0
    pub longest: Seqpos,
    pub store_index_pos: bool,
    pub log2_block_size: u32,
    pub log2_mark_dist: u32,
    pub special: SpecialCharInfo,
    pub suffix_length: u32,
}

#[derive(Default)]
struct RawMeta {
    bwt_length: u64,
    longest: u64,
    store_index_pos: u64,
    log2_block_size: u64,
    log2_mark_dist: u64,
    special: SpecialCharInfo,
    suffix_length: u64,
}

const FMA_FIELDS: &[Field<RawMeta>] = &[
    Field::required("bwtlength", |m, v| m.bwt_length = v),
    Field::required("longest", |m, v| m.longest = v),
    Field::required("storeindexpos", |m, v| m.store_index_pos = v),
    Field::required("log2blocksize", |m, v| m.log2_block_size = v),
    Field::required("log2markdist", |m, v| m.log2_mark_dist = v),
    Field::required("specialcharacters", |m, v| m.special.special_characters = v),
    Field::required("specialranges", |m, v| m.special.special_ranges = v),
    Field::required("realspecialranges", |m, v| m.special.real_special_ranges = v),
    Field::required("lengthofspecialprefix", |m, v| {
        m.special.length_of_special_prefix = v
    }),
    Field::required("lengthofspecialsuffix", |m, v| {
        m.special.length_of_special_suffix = v
    }),
    Field::required("suffixlength", |m, v| m.suffix_length = v),
];

impl FmMeta {
    pub fn read(indexname: &Path) -> Result<Self> {
        let path = index_file(indexname, FM_ASCII_SUFFIX);
        let file = File::open(&path).map_err(|e| IndexError::resource("open", &path, e))?;
        Self::parse(BufReader::new(file), &path)
    }

    pub fn parse<R: BufRead>(reader: R, source: &Path) -> Result<Self> {
        let raw: RawMeta = read_key_values(reader, source, FMA_FIELDS, |_, _| Ok(false))?;
        let illegal = |key: &str, value: u64| {
            IndexError::Format(format!(
                "{}: illegal value {} in line matching \"{}=\"",
                source.display(),
                value,
                key
            ))
        };

        let store_index_pos = match raw.store_index_pos {
            0 => false,
            1 => true,
            v => return Err(illegal("storeindexpos", v)),
        };
        if !(1..=MAX_LOG2_BLOCK_SIZE as u64).contains(&raw.log2_block_size) {
            return Err(illegal("log2blocksize", raw.log2_block_size));
        }
        if raw.log2_mark_dist > MAX_LOG2_MARK_DIST as u64 {
            return Err(illegal("log2markdist", raw.log2_mark_dist));
        }
        let suffix_length =
            u32::try_from(raw.suffix_length).map_err(|_| illegal("suffixlength", raw.suffix_length))?;

        Ok(Self {
            bwt_length: raw.bwt_length,
            longest: raw.longest,
            store_index_pos,
            log2_block_size: raw.log2_block_size as u32,
            log2_mark_dist: raw.log2_mark_dist as u32,
            special: raw.special,
            suffix_length,
        })
    }

    pub fn write(&self, indexname: &Path) -> Result<()> {
        let path = index_file(indexname, FM_ASCII_SUFFIX);
        let file = File::create(&path).map_err(|e| IndexError::resource("create", &path, e))?;
        let mut out = BufWriter::new(file);
        write_key_values(
            &mut out,
            &[
                ("bwtlength", self.bwt_length),
                ("longest", self.longest),
                ("storeindexpos", u64::from(self.store_index_pos)),
                ("log2blocksize", self.log2_block_size as u64),
                ("log2markdist", self.log2_mark_dist as u64),
                ("specialcharacters", self.special.special_characters),
                ("specialranges", self.special.special_ranges),
                ("realspecialranges", self.special.real_special_ranges),
                ("lengthofspecialprefix", self.special.length_of_special_prefix),
                ("lengthofspecialsuffix", self.special.length_of_special_suffix),
                ("suffixlength", self.suffix_length as u64),
            ],
        )
        .and_then(|_| out.flush())
        .map_err(|e| IndexError::resource("write", &path, e))
    }
}
