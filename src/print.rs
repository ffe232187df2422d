// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Printing records

use std::io::{self, Write};

use tracing::{debug, warn};

use crate::{
    expand::MAX_RECURSION,
    record::{FIELD_SEPARATOR, Record},
    resolve::Lookup,
};

/// Maximum width of a wrapped line, not counting the continuation marker
pub const WRAP_WIDTH: usize = 65;

/// Print options
#[derive(Clone, Copy, Debug, Default)]
pub struct Options {
    /// Print the records named by `tc` after the record itself
    pub follow_parent: bool,
    /// Wrap long records
    pub pretty: bool,
}

/// Outcome of rendering a record and its ancestors
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// Everything that could be found was printed
    Complete,
    /// The chain of ancestors was cut at the depth limit
    Truncated,
}

/// Print a record wrapped at field boundaries
///
/// Lines are broken after a `:` so that no line exceeds [`WRAP_WIDTH`]. Broken
/// lines end with a backslash and continuation lines start with a tab and `:`.
/// If a line cannot be broken, the rest of the record is printed as is.
pub fn pretty_print(out: &mut impl Write, record: &str) -> io::Result<()> {
    let mut rest = record;
    let mut prefix = "";
    while rest.len() > WRAP_WIDTH {
        let Some(split) = rest.as_bytes()[..WRAP_WIDTH]
            .iter()
            .rposition(|&c| c == FIELD_SEPARATOR)
        else {
            break;
        };
        let (line, tail) = rest.split_at(split + 1);
        writeln!(out, "{prefix}{line}\\")?;
        prefix = "\t:";
        rest = tail;
    }
    writeln!(out, "{prefix}{rest}")
}

fn print_record(out: &mut impl Write, record: &Record, pretty: bool) -> io::Result<()> {
    if pretty {
        pretty_print(out, record.as_str())
    } else {
        writeln!(out, "{record}")
    }
}

/// Print a record, then its ancestors if requested
///
/// Ancestors are found through the `tc` capability and looked up with `lookup`.
/// A missing or unreadable ancestor ends the chain quietly. At most
/// [`MAX_RECURSION`] ancestors are printed, so reference loops terminate. The
/// chain counts as truncated only if an ancestor beyond the limit exists.
///
/// Only errors writing to `out` are reported.
pub fn render(
    out: &mut impl Write,
    lookup: &dyn Lookup,
    record: Record,
    options: Options,
) -> io::Result<Status> {
    let mut record = record;
    let mut depth = 0;
    loop {
        if depth > 0 && options.pretty {
            writeln!(out)?;
        }
        print_record(out, &record, options.pretty)?;

        if !options.follow_parent {
            return Ok(Status::Complete);
        }
        let Some(parent) = record.parent() else {
            return Ok(Status::Complete);
        };

        let ancestor = match lookup.resolve(&parent) {
            Ok(Some(ancestor)) => ancestor,
            Ok(None) => {
                debug!(parent = %parent, "tc reference not found");
                return Ok(Status::Complete);
            }
            Err(err) => {
                warn!(parent = %parent, error = %err, "cannot look up tc reference");
                return Ok(Status::Complete);
            }
        };
        if depth >= MAX_RECURSION {
            warn!(name = record.name(), parent = %parent, "tc chain too deep, not printing further");
            return Ok(Status::Truncated);
        }
        record = ancestor;
        depth += 1;
    }
}
