// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP/IFC Parser using nom
//!
//! Zero-copy tokenization of entity instances and a quote-aware entity scanner.

use std::borrow::Cow;

use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{char, digit1, one_of},
    combinator::{map, map_res, opt, recognize},
    multi::separated_list0,
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::error::{Error, Result};
use crate::schema::IfcType;

/// STEP/IFC Token
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Entity reference: #123
    EntityRef(u32),
    /// String literal, still STEP-encoded: 'text'
    String(&'a str),
    /// Integer: 42
    Integer(i64),
    /// Float: 3.14
    Float(f64),
    /// Enum: .TRUE., .ELEMENT.
    Enum(&'a str),
    /// List: (1, 2, 3)
    List(Vec<Token<'a>>),
    /// Typed value: IFCAREAMEASURE(12.5), IFCLABEL('Concrete')
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value: $
    Null,
    /// Asterisk (derived value): *
    Derived,
}

fn entity_ref(input: &str) -> IResult<&str, Token> {
    map(
        preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
        Token::EntityRef,
    )(input)
}

/// 'text' with '' as the escaped quote
fn string_literal(input: &str) -> IResult<&str, Token> {
    fn body(input: &str) -> IResult<&str, &str> {
        let bytes = input.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            if bytes[i] == b'\'' {
                if bytes.get(i + 1) == Some(&b'\'') {
                    i += 2;
                    continue;
                }
                return Ok((&input[i..], &input[..i]));
            }
            i += 1;
        }
        Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Char,
        )))
    }

    map(delimited(char('\''), body, char('\'')), Token::String)(input)
}

fn integer(input: &str) -> IResult<&str, Token> {
    map_res(recognize(pair(opt(one_of("+-")), digit1)), |s: &str| {
        s.parse::<i64>().map(Token::Integer)
    })(input)
}

/// STEP reals always carry a '.', digits after it are optional ("0.", "1.E-5")
fn float(input: &str) -> IResult<&str, Token> {
    map_res(
        recognize(tuple((
            opt(one_of("+-")),
            digit1,
            char('.'),
            opt(digit1),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
        |s: &str| s.parse::<f64>().map(Token::Float),
    )(input)
}

fn enum_value(input: &str) -> IResult<&str, Token> {
    map(
        delimited(
            char('.'),
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            char('.'),
        ),
        Token::Enum,
    )(input)
}

fn null(input: &str) -> IResult<&str, Token> {
    map(char('$'), |_| Token::Null)(input)
}

fn derived(input: &str) -> IResult<&str, Token> {
    map(char('*'), |_| Token::Derived)(input)
}

fn ws(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c.is_whitespace())(input)
}

fn arguments(input: &str) -> IResult<&str, Vec<Token>> {
    delimited(
        char('('),
        separated_list0(delimited(ws, char(','), ws), token),
        char(')'),
    )(input)
}

fn typed_value(input: &str) -> IResult<&str, Token> {
    map(
        pair(
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
            arguments,
        ),
        |(type_name, args)| Token::TypedValue(type_name, args),
    )(input)
}

fn list(input: &str) -> IResult<&str, Token> {
    map(arguments, Token::List)(input)
}

fn token(input: &str) -> IResult<&str, Token> {
    delimited(
        ws,
        alt((
            float,
            integer,
            entity_ref,
            string_literal,
            enum_value,
            list,
            typed_value,
            null,
            derived,
        )),
        ws,
    )(input)
}

/// Parse one entity instance: `#123=IFCWALL('guid',$,'name',...);`
pub fn parse_entity(input: &str) -> Result<(u32, IfcType, Vec<Token>)> {
    let result: IResult<&str, (u32, &str, Vec<Token>)> = tuple((
        delimited(
            ws,
            preceded(char('#'), map_res(digit1, |s: &str| s.parse::<u32>())),
            ws,
        ),
        preceded(
            char('='),
            delimited(
                ws,
                take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
                ws,
            ),
        ),
        delimited(
            char('('),
            separated_list0(delimited(ws, char(','), ws), token),
            tuple((char(')'), ws, char(';'))),
        ),
    ))(input);

    match result {
        Ok((_, (id, type_name, args))) => Ok((id, IfcType::from_name(type_name), args)),
        Err(e) => Err(Error::parse(0, format!("Failed to parse entity: {}", e))),
    }
}

/// Decode STEP string escapes into plain text.
///
/// Handles doubled quotes, `\X2\...\X0\` (UTF-16 hex), `\X\hh` (ISO 8859-1)
/// and `\S\c` (upper half of ISO 8859-1). Unknown sequences are kept verbatim.
pub fn decode_step_string(raw: &str) -> Cow<'_, str> {
    if !raw.contains('\\') && !raw.contains("''") {
        return Cow::Borrowed(raw);
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(c) = rest.chars().next() {
        if c == '\'' && rest.starts_with("''") {
            out.push('\'');
            rest = &rest[2..];
        } else if let Some(body) = rest.strip_prefix("\\X2\\") {
            let Some(end) = body.find("\\X0\\") else {
                out.push_str(rest);
                break;
            };
            let units: Vec<u16> = body[..end]
                .as_bytes()
                .chunks(4)
                .filter_map(|chunk| std::str::from_utf8(chunk).ok())
                .filter_map(|hex| u16::from_str_radix(hex, 16).ok())
                .collect();
            out.extend(char::decode_utf16(units).map(|r| r.unwrap_or('\u{FFFD}')));
            rest = &body[end + 4..];
        } else if let Some(body) = rest.strip_prefix("\\X\\") {
            match body.get(..2).and_then(|hex| u8::from_str_radix(hex, 16).ok()) {
                Some(byte) => {
                    out.push(char::from(byte));
                    rest = &body[2..];
                }
                None => {
                    out.push_str("\\X\\");
                    rest = body;
                }
            }
        } else if let Some(body) = rest.strip_prefix("\\S\\") {
            match body.chars().next() {
                Some(ch) if ch.is_ascii() => {
                    out.push(char::from(ch as u8 + 128));
                    rest = &body[1..];
                }
                _ => {
                    out.push_str("\\S\\");
                    rest = body;
                }
            }
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    Cow::Owned(out)
}

/// One entity instance found by [`EntityScanner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScannedEntity<'a> {
    pub id: u32,
    /// Upper-case STEP type name, e.g. `IFCWALL`
    pub type_name: &'a str,
    /// Byte offset of the leading `#`
    pub start: usize,
    /// Byte offset one past the terminating `;`
    pub end: usize,
}

/// Entity scanner - walks the DATA section without tokenizing attributes.
///
/// Semicolons and `#` characters inside quoted strings are skipped.
pub struct EntityScanner<'a> {
    content: &'a str,
    position: usize,
}

impl<'a> EntityScanner<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            position: 0,
        }
    }

    /// Scan for the next entity instance
    pub fn next_entity(&mut self) -> Option<ScannedEntity<'a>> {
        let bytes = self.content.as_bytes();
        let len = bytes.len();

        loop {
            let offset = memchr::memchr(b'#', &bytes[self.position..])?;
            let start = self.position + offset;
            let mut pos = start + 1;

            let id_start = pos;
            while pos < len && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
            let id_end = pos;
            while pos < len && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }

            if id_end == id_start || pos >= len || bytes[pos] != b'=' {
                // A reference such as `#12` inside an attribute list, not an instance
                self.position = start + 1;
                continue;
            }

            let Ok(id) = self.content[id_start..id_end].parse::<u32>() else {
                self.position = id_end;
                continue;
            };

            pos += 1;
            while pos < len && bytes[pos].is_ascii_whitespace() {
                pos += 1;
            }
            let type_start = pos;
            while pos < len && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
                pos += 1;
            }
            let type_end = pos;

            let end = find_entity_end(bytes, type_end)?;
            self.position = end;

            return Some(ScannedEntity {
                id,
                type_name: &self.content[type_start..type_end],
                start,
                end,
            });
        }
    }

    /// Find all entities of a specific type (case-insensitive)
    pub fn find_by_type(&mut self, target_type: &str) -> Vec<ScannedEntity<'a>> {
        let mut results = Vec::new();
        while let Some(entity) = self.next_entity() {
            if entity.type_name.eq_ignore_ascii_case(target_type) {
                results.push(entity);
            }
        }
        results
    }

    pub fn reset(&mut self) {
        self.position = 0;
    }
}

impl<'a> Iterator for EntityScanner<'a> {
    type Item = ScannedEntity<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entity()
    }
}

/// Offset one past the `;` that terminates the instance, skipping quoted text
fn find_entity_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut pos = from;
    loop {
        let offset = memchr::memchr2(b';', b'\'', &bytes[pos..])?;
        pos += offset;
        if bytes[pos] == b';' {
            return Some(pos + 1);
        }
        // Inside a string: '' is an escaped quote, a single ' closes it
        pos += 1;
        loop {
            let close = memchr::memchr(b'\'', &bytes[pos..])?;
            pos += close + 1;
            if bytes.get(pos) == Some(&b'\'') {
                pos += 1;
                continue;
            }
            break;
        }
    }
}
