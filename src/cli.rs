// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Query handling for command line front ends

use std::{
    ffi::OsString,
    io::{self, Write},
    path::Path,
    process::ExitCode,
};

use clap::{Parser, error::ErrorKind};
use tracing::{debug, error};

use crate::{
    print::{self, Options, render},
    resolve::{Lookup, Mode, lookup},
};

/// Outcome of a query
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// The query succeeded
    Ok = 0,
    /// The arguments were invalid
    Usage = 1,
    /// The entry was not found or the database could not be read
    NotFound = 2,
}

impl From<Status> for ExitCode {
    fn from(status: Status) -> Self {
        Self::from(status as u8)
    }
}

/// Arguments following the database identifier
#[derive(Parser, Debug)]
struct Query {
    /// Do not expand tc references
    #[arg(short = 'n')]
    no_expand: bool,

    /// Print the records named by tc after each record, implies -n
    #[arg(short = 'r')]
    recurse: bool,

    /// Wrap long records
    #[arg(short = 'p')]
    pretty: bool,

    /// Entry to look up, every entry is printed if omitted
    #[arg(allow_hyphen_values = true)]
    name: Option<String>,

    /// Capabilities of the entry to print instead of the entry
    ///
    /// Options are not recognized after the entry name.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    capabilities: Vec<String>,
}

/// Run a query against database file `db`
///
/// `args` starts with the name to show in the usage message, followed by the
/// options `-n`, `-r` and `-p`, an optional entry name and optional capability
/// names. Results are written to `out`, usage errors to stderr.
///
/// Only errors writing the results are returned, lookup failures are reported
/// through the status.
pub fn handle<I, T>(db: &Path, args: I, out: &mut impl Write) -> io::Result<Status>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let query = match Query::try_parse_from(args) {
        Ok(query) => query,
        Err(err) => {
            err.print()?;
            return Ok(match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => Status::Ok,
                _ => Status::Usage,
            });
        }
    };

    let mode = if query.no_expand || query.recurse {
        Mode::Raw
    } else {
        Mode::Expanded
    };
    let options = Options {
        follow_parent: query.recurse,
        pretty: query.pretty,
    };
    let lookup = lookup(db, mode);

    let Some(name) = query.name else {
        return print_all(lookup.as_ref(), options, out);
    };

    let record = match lookup.resolve(&name) {
        Ok(Some(record)) => record,
        Ok(None) => {
            debug!(db = %db.display(), name = %name, "entry not found");
            return Ok(Status::NotFound);
        }
        Err(err) => {
            error!(db = %db.display(), name = %name, error = %err, "lookup failed");
            return Ok(Status::NotFound);
        }
    };

    if query.capabilities.is_empty() {
        return Ok(match render(out, lookup.as_ref(), record, options)? {
            print::Status::Complete => Status::Ok,
            print::Status::Truncated => Status::NotFound,
        });
    }

    for capability in &query.capabilities {
        match record.capability(capability) {
            Some(value) => writeln!(out, "{value}")?,
            None => writeln!(out, "false")?,
        }
    }
    Ok(Status::Ok)
}

fn print_all(lookup: &dyn Lookup, options: Options, out: &mut impl Write) -> io::Result<Status> {
    let mut status = Status::Ok;
    let mut cursor = lookup.cursor();
    for record in &mut cursor {
        match record {
            Ok(record) => {
                render(out, lookup, record, options)?;
            }
            Err(err) => {
                error!(error = %err, "cannot enumerate database");
                status = Status::NotFound;
            }
        }
    }
    cursor.close();
    Ok(status)
}
