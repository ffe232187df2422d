// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Expansion of `tc` references
//!
//! A [`Session`] looks up records and replaces every `tc=name` field with the
//! capabilities of the named record, recursively. It also enumerates the whole
//! database with every record expanded.

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    capability::PARENT_CAPABILITY,
    escape::decode,
    record::{self, FIELD_SEPARATOR, Record, RecordReader, field_end},
};

/// Maximum nesting of `tc` references
pub const MAX_RECURSION: usize = 32;

/// Errors reported by an expansion session
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// The database file could not be opened
    #[error("Cannot open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The database could not be read
    #[error("Cannot read database")]
    Record(#[from] record::Error),
    /// `tc` references are nested too deep, most likely a loop
    #[error("Reference loop through {0}")]
    ReferenceLoop(String),
}

/// Expansion session over one database file
///
/// The session owns the enumeration state used by [`Session::first_record`] and
/// [`Session::next_record`]. Lookups with [`Session::get`] are independent of it.
pub struct Session<'a> {
    db: &'a Path,
    reader: Option<RecordReader<BufReader<File>>>,
}

impl<'a> Session<'a> {
    /// Create a session for the database file `db`
    pub const fn new(db: &'a Path) -> Self {
        Self { db, reader: None }
    }

    fn open(&self) -> Result<RecordReader<BufReader<File>>, Error> {
        RecordReader::open(self.db).map_err(|source| Error::Open {
            path: self.db.to_path_buf(),
            source,
        })
    }

    fn lookup(&self, name: &str) -> Result<Option<Record>, Error> {
        Ok(self.open()?.find_name(name)?)
    }

    /// Look up record `name` with all `tc` references expanded
    ///
    /// A reference to a missing record is left in place.
    ///
    /// Returns `None` if there is no such record.
    pub fn get(&self, name: &str) -> Result<Option<Record>, Error> {
        debug!(db = %self.db.display(), name, "expanded lookup");
        match self.lookup(name)? {
            Some(record) => self.expand(record, 0).map(Some),
            None => Ok(None),
        }
    }

    fn expand(&self, record: Record, depth: usize) -> Result<Record, Error> {
        if depth > MAX_RECURSION {
            return Err(Error::ReferenceLoop(record.name().to_string()));
        }

        let mut text = record.into_string();
        let mut end = field_end(text.as_bytes(), 0);
        while end < text.len() {
            let start = end + 1;
            end = field_end(text.as_bytes(), start);
            let Some(reference) = text[start..end]
                .strip_prefix(PARENT_CAPABILITY)
                .and_then(|rest| rest.strip_prefix('='))
            else {
                continue;
            };
            let parent_name = String::from_utf8_lossy(&decode(reference)).into_owned();
            let Some(parent) = self.lookup(&parent_name)? else {
                warn!(db = %self.db.display(), parent = %parent_name, "unresolved tc reference");
                continue;
            };
            debug!(parent = %parent_name, depth, "expanding tc reference");
            let parent = self.expand(parent, depth + 1)?;
            let inherited = capabilities(parent.as_str());
            text.replace_range(start..end, inherited);
            end = start + inherited.len();
        }

        Ok(Record::from(text))
    }

    /// Start enumerating the database from the beginning
    ///
    /// Any enumeration in progress is discarded first.
    ///
    /// Returns the first record, expanded, or `None` if the database is empty.
    pub fn first_record(&mut self) -> Result<Option<Record>, Error> {
        self.close();
        self.reader = Some(self.open()?);
        self.next_record()
    }

    /// Return the next record of the enumeration, expanded
    ///
    /// Starts a new enumeration if none is in progress.
    pub fn next_record(&mut self) -> Result<Option<Record>, Error> {
        let Some(reader) = self.reader.as_mut() else {
            return self.first_record();
        };
        match reader.read_record()? {
            Some(record) => self.expand(record, 0).map(Some),
            None => Ok(None),
        }
    }

    /// End the enumeration, safe to call at any time
    pub fn close(&mut self) {
        self.reader = None;
    }
}

/// Return the capability fields of a record without the name field and
/// without trailing separators
fn capabilities(text: &str) -> &str {
    let name_end = field_end(text.as_bytes(), 0);
    let mut fields = text.get(name_end + 1..).unwrap_or_default();
    while let Some(rest) = fields.strip_suffix(FIELD_SEPARATOR as char) {
        if rest.ends_with('\\') {
            break;
        }
        fields = rest;
    }
    fields
}

#[cfg(test)]
mod test {
    use std::{fs, path::PathBuf};

    use tempfile::{TempDir, tempdir};

    use super::*;

    fn database(contents: &str) -> (TempDir, PathBuf) {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("test.db");
        fs::write(&path, contents).unwrap();
        (temp_dir, path)
    }

    const SIMPLE: &str = "default:te=xterm:co#80:bold:\nxterm:tc=default:\n";

    #[test]
    fn inherits_parent() {
        let (_dir, path) = database(SIMPLE);
        let session = Session::new(&path);
        let record = session.get("xterm").unwrap().unwrap();
        assert_eq!(record.as_str(), "xterm:te=xterm:co#80:bold:");
        assert_eq!(record.capability("co").unwrap().to_string(), "80");
        assert_eq!(record.capability("bold").unwrap().to_string(), "true");
        assert!(record.capability("missing").is_none());
    }

    #[test]
    fn missing_record() {
        let (_dir, path) = database(SIMPLE);
        assert!(Session::new(&path).get("vt100").unwrap().is_none());
    }

    #[test]
    fn child_overrides_parent() {
        let (_dir, path) = database("base:co#80:am:\nwide:co#132:am@:tc=base:\n");
        let record = Session::new(&path).get("wide").unwrap().unwrap();
        assert_eq!(record.as_str(), "wide:co#132:am@:co#80:am:");
        assert_eq!(record.number("co"), Ok(Some(132)));
        assert!(!record.boolean("am"));
    }

    #[test]
    fn nested_and_multiple_references() {
        let (_dir, path) = database(
            "root:r:\nmiddle:m:tc=root:\nside:s:\nleaf:l:tc=middle:tc=side:\n",
        );
        let record = Session::new(&path).get("leaf").unwrap().unwrap();
        assert_eq!(record.as_str(), "leaf:l:m:r:s:");
    }

    #[test]
    fn unresolved_reference_kept() {
        let (_dir, path) = database("orphan:a:tc=nowhere:b:\n");
        let record = Session::new(&path).get("orphan").unwrap().unwrap();
        assert_eq!(record.as_str(), "orphan:a:tc=nowhere:b:");
    }

    #[test]
    fn reference_loop() {
        let (_dir, path) = database("a:x:tc=b:\nb:y:tc=a:\n");
        let result = Session::new(&path).get("a");
        assert!(matches!(result, Err(Error::ReferenceLoop(_))));
    }

    #[test]
    fn missing_database() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("absent.db");
        let result = Session::new(&path).get("xterm");
        assert!(matches!(result, Err(Error::Open { .. })));
    }

    #[test]
    fn enumeration() {
        let (_dir, path) = database(SIMPLE);
        let mut session = Session::new(&path);
        let first = session.first_record().unwrap().unwrap();
        assert_eq!(first.as_str(), "default:te=xterm:co#80:bold:");
        let second = session.next_record().unwrap().unwrap();
        assert_eq!(second.as_str(), "xterm:te=xterm:co#80:bold:");
        assert!(session.next_record().unwrap().is_none());

        // Starting over discards the finished enumeration.
        let again = session.first_record().unwrap().unwrap();
        assert_eq!(again, first);
        session.close();
        session.close();
    }

    #[test]
    fn capabilities_of_parent() {
        assert_eq!(capabilities("name:a:b:"), "a:b");
        assert_eq!(capabilities("name:a:b"), "a:b");
        assert_eq!(capabilities("name"), "");
        assert_eq!(capabilities("name::"), "");
        assert_eq!(capabilities(r"name:a=x\:"), r"a=x\:");
    }
}
