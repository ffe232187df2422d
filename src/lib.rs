// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Lookup and iteration over getcap style capability databases
//!
//! A database is a text file of records such as `xterm|xterm-color:co#80:bold:`.
//! Records may span several lines joined by a trailing backslash and may inherit
//! the capabilities of another record through `tc=name`.

pub mod capability;
pub mod cli;
pub mod escape;
pub mod expand;
pub mod locate;
pub mod print;
pub mod record;
pub mod resolve;

pub use capability::{Capability, extract};
pub use expand::Session;
pub use locate::{locate, search_directories};
pub use print::{pretty_print, render};
pub use record::{Record, RecordReader, read_record};
pub use resolve::{Cursor, Lookup, Mode, lookup};
