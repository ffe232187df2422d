// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Looking up and enumerating database entries

use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    expand::{self, Session},
    record::{self, Record, RecordReader},
};

/// Errors reported when looking up entries
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
    /// The expansion session failed
    #[error("Cannot expand entry")]
    Expand(#[from] expand::Error),
}

/// How entries are looked up
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Records are returned as written, `tc` references are not followed
    Raw,
    /// Records have their `tc` references expanded
    Expanded,
}

/// Entry lookup strategy
pub trait Lookup {
    /// Look up entry `name`
    ///
    /// Returns `None` if there is no such entry.
    fn resolve(&self, name: &str) -> Result<Option<Record>, Error>;

    /// Return a cursor over all entries of the database
    fn cursor(&self) -> Cursor<'_>;
}

/// Lookup by scanning the database text
pub struct RawLookup<'a> {
    db: &'a Path,
}

impl<'a> RawLookup<'a> {
    pub const fn new(db: &'a Path) -> Self {
        Self { db }
    }
}

impl Lookup for RawLookup<'_> {
    fn resolve(&self, name: &str) -> Result<Option<Record>, Error> {
        debug!(db = %self.db.display(), name, "raw lookup");
        Ok(open(self.db)?.find_name(name)?)
    }

    fn cursor(&self) -> Cursor<'_> {
        Cursor::new(self.db, Mode::Raw)
    }
}

/// Lookup through an expansion session
pub struct ExpandedLookup<'a> {
    db: &'a Path,
}

impl<'a> ExpandedLookup<'a> {
    pub const fn new(db: &'a Path) -> Self {
        Self { db }
    }
}

impl Lookup for ExpandedLookup<'_> {
    fn resolve(&self, name: &str) -> Result<Option<Record>, Error> {
        Ok(Session::new(self.db).get(name)?)
    }

    fn cursor(&self) -> Cursor<'_> {
        Cursor::new(self.db, Mode::Expanded)
    }
}

/// Return the lookup strategy for `mode`
pub fn lookup(db: &Path, mode: Mode) -> Box<dyn Lookup + '_> {
    match mode {
        Mode::Raw => Box::new(RawLookup::new(db)),
        Mode::Expanded => Box::new(ExpandedLookup::new(db)),
    }
}

fn open(db: &Path) -> Result<RecordReader<BufReader<File>>, Error> {
    RecordReader::open(db).map_err(|source| Error::Open {
        path: db.to_path_buf(),
        source,
    })
}

enum Source<'a> {
    Raw(Option<RecordReader<BufReader<File>>>),
    Expanded(Session<'a>),
}

/// One pass over all entries of a database
///
/// Nothing is opened until the first record is requested. The cursor ends after
/// the last record or after the first error.
pub struct Cursor<'a> {
    db: &'a Path,
    source: Source<'a>,
    started: bool,
    closed: bool,
}

impl<'a> Cursor<'a> {
    /// Create a cursor over the database file `db`
    pub fn new(db: &'a Path, mode: Mode) -> Self {
        let source = match mode {
            Mode::Raw => Source::Raw(None),
            Mode::Expanded => Source::Expanded(Session::new(db)),
        };
        Self {
            db,
            source,
            started: false,
            closed: false,
        }
    }

    fn advance(&mut self) -> Result<Option<Record>, Error> {
        let started = self.started;
        self.started = true;
        match &mut self.source {
            Source::Raw(slot) => {
                if slot.is_none() {
                    *slot = Some(open(self.db)?);
                }
                match slot {
                    Some(reader) => Ok(reader.read_record()?),
                    None => Ok(None),
                }
            }
            // The first request resets the session before enumerating.
            Source::Expanded(session) if !started => Ok(session.first_record()?),
            Source::Expanded(session) => Ok(session.next_record()?),
        }
    }

    /// Return the next record
    ///
    /// Returns `None` once the database is exhausted or the cursor is closed.
    pub fn next_record(&mut self) -> Result<Option<Record>, Error> {
        if self.closed {
            return Ok(None);
        }
        let result = self.advance();
        if !matches!(result, Ok(Some(_))) {
            self.close();
        }
        result
    }

    /// Release the file or expansion session, safe to call repeatedly
    pub fn close(&mut self) {
        match &mut self.source {
            Source::Raw(slot) => *slot = None,
            Source::Expanded(session) => session.close(),
        }
        self.closed = true;
    }
}

impl Iterator for Cursor<'_> {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record().transpose()
    }
}
