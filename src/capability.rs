// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Extracting capability values from records

use std::fmt;

use crate::{
    escape::decode,
    record::{FIELD_SEPARATOR, Record, field_end},
};

/// Name of the capability that refers to the parent record
pub const PARENT_CAPABILITY: &str = "tc";

const CANCEL_MARKER: u8 = b'@';

/// Errors reported when converting a capability value
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A numeric capability is not a valid number
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
}

/// Suffix following the capability name, in the order they are tried
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum Kind {
    String = b'=',
    Number = b'#',
    Boolean = FIELD_SEPARATOR,
}

/// Capability found in a record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Capability<'a> {
    /// Raw text of a `name=value` capability, escapes not decoded
    String(&'a str),
    /// Raw text of a `name#value` capability
    Number(&'a str),
    /// A `name` capability, or a string or number with an empty value
    Boolean,
}

impl fmt::Display for Capability<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(value) | Self::Number(value) => f.write_str(value),
            Self::Boolean => f.write_str("true"),
        }
    }
}

/// Find the value of capability `name` of the given kind
///
/// The name field is never searched. The first field named `name` that is
/// followed by `@` cancels the capability.
///
/// Returns the value with escapes intact, empty for booleans.
fn find<'a>(text: &'a str, name: &str, kind: Kind) -> Option<&'a str> {
    if name.is_empty() {
        return None;
    }
    let bytes = text.as_bytes();
    let mut end = field_end(bytes, 0);
    while end < bytes.len() {
        let start = end + 1;
        end = field_end(bytes, start);
        let Some(rest) = bytes[start..end].strip_prefix(name.as_bytes()) else {
            continue;
        };
        match (kind, rest.first()) {
            (_, Some(&CANCEL_MARKER)) => return None,
            (Kind::Boolean, None) => return Some(""),
            (Kind::String | Kind::Number, Some(&c)) if c == kind as u8 => {
                return Some(&text[start + name.len() + 1..end]);
            }
            _ => {}
        }
    }
    None
}

/// Extract capability `name` from the record
///
/// String, number and boolean forms are tried in that order. A string or number
/// with an empty value is reported as a boolean, the way getcap has always done.
///
/// Returns `None` if the capability is absent or cancelled.
pub fn extract<'a>(record: &'a Record, name: &str) -> Option<Capability<'a>> {
    let text = record.as_str();
    if let Some(value) = find(text, name, Kind::String) {
        return Some(if value.is_empty() {
            Capability::Boolean
        } else {
            Capability::String(value)
        });
    }
    if let Some(value) = find(text, name, Kind::Number) {
        return Some(if value.is_empty() {
            Capability::Boolean
        } else {
            Capability::Number(value)
        });
    }
    find(text, name, Kind::Boolean).map(|_| Capability::Boolean)
}

fn parse_number(value: &str) -> Result<i64, Error> {
    let parsed = if let Some(hex) = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16)
    } else if value.len() > 1
        && let Some(octal) = value.strip_prefix('0')
    {
        i64::from_str_radix(octal, 8)
    } else {
        value.parse()
    };
    parsed.map_err(|_| Error::InvalidNumber(value.to_string()))
}

impl Record {
    /// Extract capability `name`, see [`extract`]
    pub fn capability(&self, name: &str) -> Option<Capability<'_>> {
        extract(self, name)
    }

    /// Return the decoded value of string capability `name`
    pub fn string(&self, name: &str) -> Option<Vec<u8>> {
        find(self.as_str(), name, Kind::String).map(decode)
    }

    /// Return the value of numeric capability `name`
    ///
    /// Values starting with `0x` are hexadecimal, other values starting with `0`
    /// are octal.
    pub fn number(&self, name: &str) -> Result<Option<i64>, Error> {
        find(self.as_str(), name, Kind::Number)
            .map(parse_number)
            .transpose()
    }

    /// Check whether boolean capability `name` is set
    pub fn boolean(&self, name: &str) -> bool {
        find(self.as_str(), name, Kind::Boolean).is_some()
    }

    /// Return the name of the parent record from the `tc` capability
    ///
    /// An empty or non UTF-8 reference is treated as absent.
    pub fn parent(&self) -> Option<String> {
        self.string(PARENT_CAPABILITY)
            .filter(|name| !name.is_empty())
            .and_then(|name| String::from_utf8(name).ok())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn shown(record: &Record, name: &str) -> String {
        record
            .capability(name)
            .map_or_else(|| "false".to_string(), |value| value.to_string())
    }

    #[test]
    fn string_value() {
        let record = Record::from("xterm:te=xterm:co#80:bold:");
        assert_eq!(record.capability("te"), Some(Capability::String("xterm")));
        assert_eq!(shown(&record, "te"), "xterm");
    }

    #[test]
    fn number_value() {
        let record = Record::from("xterm:te=xterm:co#80:bold:");
        assert_eq!(record.capability("co"), Some(Capability::Number("80")));
        assert_eq!(shown(&record, "co"), "80");
        assert_eq!(record.number("co"), Ok(Some(80)));
    }

    #[test]
    fn boolean_value() {
        let record = Record::from("xterm:te=xterm:co#80:bold:");
        assert_eq!(record.capability("bold"), Some(Capability::Boolean));
        assert_eq!(shown(&record, "bold"), "true");
        assert!(record.boolean("bold"));
    }

    #[test]
    fn boolean_at_record_end() {
        let record = Record::from("xterm:co#80:bold");
        assert_eq!(shown(&record, "bold"), "true");
    }

    #[test]
    fn absent_value() {
        let record = Record::from("xterm:te=xterm:co#80:bold:");
        assert_eq!(record.capability("missing"), None);
        assert_eq!(shown(&record, "missing"), "false");
        assert!(!record.boolean("missing"));
        assert_eq!(record.number("missing"), Ok(None));
        assert_eq!(record.string("missing"), None);
    }

    // Empty values read as booleans on purpose, getcap users rely on it.
    #[test]
    fn empty_value_is_boolean() {
        let record = Record::from("entry:str=:num#:");
        assert_eq!(shown(&record, "str"), "true");
        assert_eq!(shown(&record, "num"), "true");
    }

    #[test]
    fn name_field_not_searched() {
        let record = Record::from("bold|other:co#80:");
        assert_eq!(shown(&record, "bold"), "false");
        assert_eq!(shown(&record, "other"), "false");
    }

    #[test]
    fn prefix_is_not_a_match() {
        let record = Record::from("entry:column=5:co#80:");
        assert_eq!(shown(&record, "col"), "false");
        assert_eq!(shown(&record, "co"), "80");
    }

    #[test]
    fn string_preferred_over_number() {
        let record = Record::from("entry:x#1:x=one:");
        assert_eq!(record.capability("x"), Some(Capability::String("one")));
    }

    #[test]
    fn cancelled_capability() {
        let record = Record::from("child:co@:bold@:co#80:bold:");
        assert_eq!(shown(&record, "co"), "false");
        assert_eq!(shown(&record, "bold"), "false");
    }

    #[test]
    fn escaped_separator_in_value() {
        let record = Record::from(r"entry:ps=a\:b:next:");
        assert_eq!(shown(&record, "ps"), r"a\:b");
        assert_eq!(record.string("ps"), Some(b"a:b".to_vec()));
        assert!(record.boolean("next"));
    }

    #[test]
    fn decoded_string() {
        let record = Record::from(r"vt:cl=\E[H\E[2J:");
        assert_eq!(record.string("cl"), Some(b"\x1b[H\x1b[2J".to_vec()));
    }

    #[test]
    fn number_bases() {
        let record = Record::from("entry:dec#12:oct#012:hex#0x1f:zero#0:bad#1x:");
        assert_eq!(record.number("dec"), Ok(Some(12)));
        assert_eq!(record.number("oct"), Ok(Some(10)));
        assert_eq!(record.number("hex"), Ok(Some(31)));
        assert_eq!(record.number("zero"), Ok(Some(0)));
        assert_eq!(
            record.number("bad"),
            Err(Error::InvalidNumber("1x".to_string()))
        );
    }

    #[test]
    fn parent_reference() {
        assert_eq!(
            Record::from("xterm:tc=default:").parent(),
            Some("default".to_string())
        );
        assert_eq!(Record::from("xterm:tc=:").parent(), None);
        assert_eq!(Record::from("xterm:co#80:").parent(), None);
    }
}
