//! Generic `key=value` metadata reader
//!
//! A metadata file is read against a schema: a slice of [`Field`]s naming
//! every recognized key, whether it is required, and how its value is stored
//! into the record being built. One loop handles all keys; the first problem
//! (unparseable line, unknown or repeated key, non-numeric value, missing
//! required key) fails the whole read.

use crate::error::{IndexError, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;

/// One recognized key of a metadata file
pub struct Field<T> {
    pub key: &'static str,
    pub required: bool,
    /// Stores the parsed value into the record
    pub assign: fn(&mut T, u64),
}

impl<T> Field<T> {
    pub const fn required(key: &'static str, assign: fn(&mut T, u64)) -> Self {
        Self {
            key,
            required: true,
            assign,
        }
    }

    pub const fn optional(key: &'static str, assign: fn(&mut T, u64)) -> Self {
        Self {
            key,
            required: false,
            assign,
        }
    }
}

/// Read a metadata stream into a `T` according to `fields`.
///
/// `hook` sees every non-empty line first and returns `Ok(true)` when it
/// handled the line itself (used for repeated entries that do not fit the
/// scalar schema).
pub fn read_key_values<T, R, H>(reader: R, source: &Path, fields: &[Field<T>], mut hook: H) -> Result<T>
where
    T: Default,
    R: BufRead,
    H: FnMut(&mut T, &str) -> Result<bool>,
{
    let mut record = T::default();
    let mut seen = vec![false; fields.len()];

    for (linenum, bytes) in reader.split(b'\n').enumerate() {
        let bytes = bytes.map_err(|e| IndexError::resource("read", source, e))?;
        let at = |message: String| {
            IndexError::Format(format!("{}: line {}: {}", source.display(), linenum + 1, message))
        };
        let line = std::str::from_utf8(&bytes).map_err(|e| at(format!("not valid UTF-8 ({})", e)))?;
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        if hook(&mut record, line).map_err(|e| at(e.to_string()))? {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(at(format!("cannot parse \"{}\"", line)));
        };
        let Some(index) = fields.iter().position(|f| f.key == key) else {
            return Err(at(format!("unknown key \"{}\"", key)));
        };
        if seen[index] {
            return Err(at(format!("key \"{}\" occurs more than once", key)));
        }
        let value: u64 = value.trim().parse().map_err(|_| {
            at(format!(
                "value \"{}\" of key \"{}\" is not a non-negative integer",
                value, key
            ))
        })?;

        (fields[index].assign)(&mut record, value);
        seen[index] = true;
    }

    if let Some(missing) = fields
        .iter()
        .zip(&seen)
        .find(|(field, seen)| field.required && !**seen)
    {
        return Err(IndexError::Format(format!(
            "{}: required key \"{}\" is missing",
            source.display(),
            missing.0.key
        )));
    }

    Ok(record)
}

/// Write `key=value` lines in the given order
pub fn write_key_values<W: Write>(writer: &mut W, pairs: &[(&str, u64)]) -> io::Result<()> {
    for (key, value) in pairs {
        writeln!(writer, "{}={}", key, value)?;
    }
    Ok(())
}
