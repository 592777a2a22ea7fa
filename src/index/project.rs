//! Project file (`.prj`) of an index
//!
//! The project file describes one index build: total length, special
//! character statistics, sequence counts, the integer width and byte order of
//! the machine that wrote the binary tables, and one `dbfile=` line per input
//! file. Both loaders read it through [`ProjectRecord::read`] and refuse
//! indexes written for another integer width or byte order.

use super::keyval::{Field, read_key_values, write_key_values};
use super::types::*;
use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

const DBFILE_KEY: &str = "dbfile=";

/// One input file of the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DbFile {
    pub name: String,
    pub length: u64,
    pub effective_length: u64,
}

/// Parsed content of a project file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub total_length: Seqpos,
    pub special: SpecialCharInfo,
    pub num_of_sequences: u64,
    pub num_of_db_sequences: u64,
    pub num_of_query_sequences: Option<u64>,
    /// Row of the suffix starting at position 0
    pub longest: Option<Seqpos>,
    pub prefix_length: u64,
    pub large_lcp_values: Option<u64>,
    pub max_branch_depth: Option<u64>,
    pub integer_width: IntegerWidth,
    pub little_endian: bool,
    pub files: Vec<DbFile>,
}

/// Values as they appear in the file, before width/endianness checks
#[derive(Default)]
struct RawProject {
    total_length: u64,
    special: SpecialCharInfo,
    real_special_ranges: Option<u64>,
    num_of_sequences: u64,
    num_of_db_sequences: u64,
    num_of_query_sequences: Option<u64>,
    longest: Option<u64>,
    prefix_length: u64,
    large_lcp_values: Option<u64>,
    max_branch_depth: Option<u64>,
    integer_size: u64,
    little_endian: u64,
    files: Vec<DbFile>,
}

const PROJECT_FIELDS: &[Field<RawProject>] = &[
    Field::required("totallength", |r, v| r.total_length = v),
    Field::required("specialcharacters", |r, v| r.special.special_characters = v),
    Field::required("specialranges", |r, v| r.special.special_ranges = v),
    Field::optional("realspecialranges", |r, v| r.real_special_ranges = Some(v)),
    Field::required("lengthofspecialprefix", |r, v| {
        r.special.length_of_special_prefix = v
    }),
    Field::required("lengthofspecialsuffix", |r, v| {
        r.special.length_of_special_suffix = v
    }),
    Field::required("numofsequences", |r, v| r.num_of_sequences = v),
    Field::required("numofdbsequences", |r, v| r.num_of_db_sequences = v),
    Field::optional("numofquerysequences", |r, v| {
        r.num_of_query_sequences = Some(v)
    }),
    Field::optional("longest", |r, v| r.longest = Some(v)),
    Field::required("prefixlength", |r, v| r.prefix_length = v),
    Field::optional("largelcpvalues", |r, v| r.large_lcp_values = Some(v)),
    Field::optional("maxbranchdepth", |r, v| r.max_branch_depth = Some(v)),
    Field::required("integersize", |r, v| r.integer_size = v),
    Field::required("littleendian", |r, v| r.little_endian = v),
];

/// Parse a `dbfile=<name> <length> <effectiveLength>` line
fn parse_dbfile(line: &str) -> Result<Option<DbFile>> {
    let Some(rest) = line.strip_prefix(DBFILE_KEY) else {
        return Ok(None);
    };
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let [name, length, effective_length] = fields.as_slice() else {
        return Err(IndexError::Format(format!("cannot parse line \"{}\"", line)));
    };
    let parse = |s: &str| {
        s.parse::<u64>()
            .map_err(|_| IndexError::Format(format!("cannot parse line \"{}\"", line)))
    };
    let length = parse(*length)?;
    let effective_length = parse(*effective_length)?;
    if length < 1 || effective_length < 1 {
        return Err(IndexError::Format(format!(
            "need positive integers in line \"{}\"",
            line
        )));
    }
    Ok(Some(DbFile {
        name: name.to_string(),
        length,
        effective_length,
    }))
}

impl ProjectRecord {
    /// Read `<indexname>.prj`
    pub fn read(indexname: &Path, config: &LoaderConfig) -> Result<Self> {
        let path = index_file(indexname, PROJECT_SUFFIX);
        let file = File::open(&path).map_err(|e| IndexError::resource("open", &path, e))?;
        Self::parse(BufReader::new(file), &path, config)
    }

    /// Parse project metadata; `source` names the input in error messages
    pub fn parse<R: BufRead>(reader: R, source: &Path, config: &LoaderConfig) -> Result<Self> {
        let raw = read_key_values(reader, source, PROJECT_FIELDS, |raw: &mut RawProject, line| {
            match parse_dbfile(line)? {
                Some(file) => {
                    raw.files.push(file);
                    Ok(true)
                }
                None => Ok(false),
            }
        })?;
        Self::validate(raw, source, config)
    }

    fn validate(raw: RawProject, source: &Path, config: &LoaderConfig) -> Result<Self> {
        let Some(integer_width) = IntegerWidth::from_bits(raw.integer_size) else {
            return Err(IndexError::Format(format!(
                "{} contains illegal line defining the integer size",
                source.display()
            )));
        };
        if integer_width != config.integer_width {
            return Err(IndexError::Consistency(format!(
                "index was generated for {}-bit integers while this program uses {}-bit integers",
                integer_width.bits(),
                config.integer_width.bits()
            )));
        }

        let little_endian = match raw.little_endian {
            0 => false,
            1 => true,
            other => {
                return Err(IndexError::Format(format!(
                    "{}: illegal value {} for littleendian",
                    source.display(),
                    other
                )));
            }
        };
        let host_little = cfg!(target_endian = "little");
        if little_endian != host_little {
            let (host, index) = if host_little {
                ("little", "big")
            } else {
                ("big", "little")
            };
            return Err(IndexError::Consistency(format!(
                "computer has {} endian byte order, while index was built on computer with {} endian byte order",
                host, index
            )));
        }

        if raw.total_length >= integer_width.max_value() {
            return Err(IndexError::Consistency(format!(
                "total length {} does not fit into {}-bit integers",
                raw.total_length,
                integer_width.bits()
            )));
        }

        let mut special = raw.special;
        special.real_special_ranges = raw.real_special_ranges.unwrap_or(special.special_ranges);

        Ok(Self {
            total_length: raw.total_length,
            special,
            num_of_sequences: raw.num_of_sequences,
            num_of_db_sequences: raw.num_of_db_sequences,
            num_of_query_sequences: raw.num_of_query_sequences,
            longest: raw.longest,
            prefix_length: raw.prefix_length,
            large_lcp_values: raw.large_lcp_values,
            max_branch_depth: raw.max_branch_depth,
            integer_width,
            little_endian,
            files: raw.files,
        })
    }

    /// Write `<indexname>.prj`
    pub fn write(&self, indexname: &Path) -> Result<()> {
        let path = index_file(indexname, PROJECT_SUFFIX);
        let file = File::create(&path).map_err(|e| IndexError::resource("create", &path, e))?;
        let mut out = BufWriter::new(file);
        self.write_to(&mut out)
            .and_then(|_| out.flush())
            .map_err(|e| IndexError::resource("write", &path, e))
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        for file in &self.files {
            writeln!(
                out,
                "{}{} {} {}",
                DBFILE_KEY, file.name, file.length, file.effective_length
            )?;
        }

        let mut pairs: Vec<(&str, u64)> = vec![
            ("totallength", self.total_length),
            ("specialcharacters", self.special.special_characters),
            ("specialranges", self.special.special_ranges),
            ("realspecialranges", self.special.real_special_ranges),
            ("lengthofspecialprefix", self.special.length_of_special_prefix),
            ("lengthofspecialsuffix", self.special.length_of_special_suffix),
            ("numofsequences", self.num_of_sequences),
            ("numofdbsequences", self.num_of_db_sequences),
        ];
        if let Some(n) = self.num_of_query_sequences {
            pairs.push(("numofquerysequences", n));
        }
        if let Some(longest) = self.longest {
            pairs.push(("longest", longest));
        }
        pairs.push(("prefixlength", self.prefix_length));
        if let Some(n) = self.large_lcp_values {
            pairs.push(("largelcpvalues", n));
        }
        if let Some(depth) = self.max_branch_depth {
            pairs.push(("maxbranchdepth", depth));
        }
        pairs.push(("integersize", self.integer_width.bits() as u64));
        pairs.push(("littleendian", u64::from(self.little_endian)));
        write_key_values(out, &pairs)
    }
}
