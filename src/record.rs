// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Reading logical records from a capability database

use std::{
    collections::TryReserveError,
    fmt,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    string::FromUtf8Error,
};

/// Separator between the fields of a record
pub const FIELD_SEPARATOR: u8 = b':';

/// Separator between the aliases in the name field
pub const ALIAS_SEPARATOR: u8 = b'|';

/// Errors reported when reading a record
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input/output error while reading the database
    #[error("I/O error")]
    IO(#[from] std::io::Error),
    /// The record is not valid UTF-8
    #[error("Invalid UTF-8 in record")]
    Utf8(#[from] FromUtf8Error),
    /// The record length does not fit in memory
    #[error("Record too large")]
    RecordTooLarge,
    /// Memory for the record could not be allocated
    #[error("Out of memory")]
    OutOfMemory(#[from] TryReserveError),
}

/// One logical database entry with continuation lines joined
///
/// The text starts with the name field (aliases separated by `|`) followed by
/// `:` separated capability fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record(String);

impl Record {
    /// Return the record text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the record and return its text
    pub fn into_string(self) -> String {
        self.0
    }

    /// Return the name field without the terminating `:`
    pub fn name_field(&self) -> &str {
        &self.0[..field_end(self.0.as_bytes(), 0)]
    }

    /// Iterate over the aliases in the name field
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.name_field().split(ALIAS_SEPARATOR as char)
    }

    /// Return the first alias, which is the canonical name of the record
    pub fn name(&self) -> &str {
        self.names().next().unwrap_or_default()
    }

    /// Check whether `name` is one of the aliases of the record
    ///
    /// Only the name field is considered, capability fields never match.
    pub fn matches(&self, name: &str) -> bool {
        self.names().any(|alias| alias == name)
    }
}

impl From<String> for Record {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Record {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for Record {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Find the end of the field starting at `start`
///
/// Returns the index of the next `:` not escaped by a backslash, or the length of
/// `text` if the field is the last one.
pub(crate) fn field_end(text: &[u8], start: usize) -> usize {
    let mut index = start;
    while let Some(&c) = text.get(index) {
        match c {
            FIELD_SEPARATOR => return index,
            b'\\' => index += 2,
            _ => index += 1,
        }
    }
    text.len()
}

/// Make room for `extra` more bytes without aborting on overflow or exhaustion
fn reserve(buffer: &mut Vec<u8>, extra: usize) -> Result<(), Error> {
    if buffer.len().checked_add(extra).is_none() {
        return Err(Error::RecordTooLarge);
    }
    buffer.try_reserve(extra)?;
    Ok(())
}

fn append(buffer: &mut Vec<u8>, data: &[u8]) -> Result<(), Error> {
    reserve(buffer, data.len())?;
    buffer.extend_from_slice(data);
    Ok(())
}

fn finish(buffer: Vec<u8>) -> Result<Option<Record>, Error> {
    if buffer.is_empty() {
        return Ok(None);
    }
    Ok(Some(Record(String::from_utf8(buffer)?)))
}

/// Read the next logical record
///
/// Blank lines and lines starting with `#` are skipped between records. A line
/// ending with a backslash is continued on the next physical line, which is
/// appended verbatim.
///
/// Returns `None` at the end of the input.
pub fn read_record(reader: &mut impl BufRead) -> Result<Option<Record>, Error> {
    let mut line = Vec::new();
    let mut record = Vec::new();
    let mut continued = false;

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            // A missing final newline or a dangling backslash still ends the record.
            return finish(record);
        }

        while let Some(b'\n' | b'\r') = line.last() {
            line.pop();
        }

        if !continued {
            match line.iter().find(|c| !c.is_ascii_whitespace()) {
                None | Some(b'#') => continue,
                Some(_) => {}
            }
        }

        continued = line.last() == Some(&b'\\');
        if continued {
            line.pop();
        }

        append(&mut record, &line)?;

        if !continued {
            if record.is_empty() {
                continue;
            }
            return finish(record);
        }
    }
}

/// Sequential reader of logical records
pub struct RecordReader<R> {
    reader: R,
}

impl<R: BufRead> RecordReader<R> {
    /// Wrap a buffered reader
    pub const fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Read the next record, `None` at the end of the input
    pub fn read_record(&mut self) -> Result<Option<Record>, Error> {
        read_record(&mut self.reader)
    }

    /// Read up to and including the first record that has `name` as an alias
    ///
    /// Returns `None` if the input ends without a match.
    pub fn find_name(&mut self, name: &str) -> Result<Option<Record>, Error> {
        while let Some(record) = self.read_record()? {
            if record.matches(name) {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}

impl RecordReader<BufReader<File>> {
    /// Open a database file for reading
    pub fn open(path: &Path) -> io::Result<Self> {
        Ok(Self::new(BufReader::new(File::open(path)?)))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.read_record().transpose()
    }
}
