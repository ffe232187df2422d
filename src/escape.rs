// Copyright 2025 Pavel Roskin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Decoding of escape sequences in string capabilities

const ESCAPE: u8 = 0x1b;
const DELETE: u8 = 0x7f;

#[derive(Clone, Copy, PartialEq)]
enum States {
    Nothing,
    Backslash,
    Caret,
    Octal { value: u32, digits: u8 },
}

/// Decode a string capability value
///
/// Recognized sequences are `\E` (escape), `\n`, `\r`, `\t`, `\b`, `\f`, `\c`
/// (colon), three digit octal `\NNN`, and `^X` for control characters, with `^?`
/// meaning DEL. Any other character after a backslash stands for itself. An
/// escape cut short by the end of the value is dropped.
pub fn decode(value: &str) -> Vec<u8> {
    let input = value.as_bytes();
    let mut output = Vec::with_capacity(input.len());
    let mut state = States::Nothing;
    let mut index = 0;

    while let Some(&c) = input.get(index) {
        match state {
            States::Nothing => match c {
                b'\\' => state = States::Backslash,
                b'^' => state = States::Caret,
                _ => output.push(c),
            },
            States::Caret => {
                output.push(if c == b'?' { DELETE } else { c & 0x1f });
                state = States::Nothing;
            }
            States::Backslash => {
                state = States::Nothing;
                match c {
                    b'0'..=b'7' => {
                        state = States::Octal {
                            value: u32::from(c - b'0'),
                            digits: 1,
                        };
                    }
                    b'E' | b'e' => output.push(ESCAPE),
                    b'N' | b'n' => output.push(b'\n'),
                    b'R' | b'r' => output.push(b'\r'),
                    b'T' | b't' => output.push(b'\t'),
                    b'B' | b'b' => output.push(0x08),
                    b'F' | b'f' => output.push(0x0c),
                    b'C' | b'c' => output.push(b':'),
                    c => output.push(c),
                }
            }
            States::Octal { value, digits } => {
                if digits < 3 && (b'0'..=b'7').contains(&c) {
                    state = States::Octal {
                        value: value * 8 + u32::from(c - b'0'),
                        digits: digits + 1,
                    };
                } else {
                    // The octal number is complete, process `c` again as plain input.
                    output.push(value as u8);
                    state = States::Nothing;
                    continue;
                }
            }
        }
        index += 1;
    }

    if let States::Octal { value, .. } = state {
        output.push(value as u8);
    }

    output
}
