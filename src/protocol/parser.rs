//! Incremental Protocol Parser
//!
//! The parser reads from the front of a byte buffer and returns either:
//! - `Ok(Some((value, consumed)))` - a complete value, `consumed` bytes used
//! - `Ok(None)` - the buffer holds only part of a value
//! - `Err(ProtocolError)` - the bytes can never form a valid value
//!
//! The caller appends network data to a buffer, calls the parser, and on
//! success advances the buffer by `consumed`. A bulk string is only returned
//! once its payload and the trailing CRLF are both in the buffer, so a
//! truncated payload is never handed out.
//!
//! Two entry points exist. [`RespParser::parse_request`] is the server side:
//! it accepts only an array of bulk strings. [`RespParser::parse`] is the
//! client side: it accepts any single value, including nested arrays.

use crate::protocol::types::{prefix, RespValue, CRLF};
use bytes::Bytes;
use std::ops::Range;
use thiserror::Error;

/// Framing errors. Once one is returned the stream cannot be resynchronized.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProtocolError {
    /// A request did not start with the array marker
    #[error("expected '*', got {0:?}")]
    ExpectedArray(char),

    /// A request element did not start with the bulk string marker
    #[error("expected '$', got {0:?}")]
    ExpectedBulkString(char),

    /// Unknown type prefix byte in a response
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// A length or integer field is not a decimal integer
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in a simple string, error, or length line
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Negative bulk length (other than -1 in a response)
    #[error("invalid bulk length: {0}")]
    InvalidBulkLength(i64),

    /// Negative array length (other than -1 in a response)
    #[error("invalid multibulk length: {0}")]
    InvalidArrayLength(i64),

    /// A bulk payload was not followed by CRLF
    #[error("bulk string missing trailing CRLF")]
    MissingCrlf,

    /// Responses nested deeper than [`MAX_NESTING_DEPTH`]
    #[error("maximum nesting depth exceeded: {0}")]
    TooDeep(usize),

    /// A declared bulk length above [`MAX_BULK_SIZE`]
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Maximum size for a single bulk string (512 MB)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth when decoding responses
pub const MAX_NESTING_DEPTH: usize = 32;

/// Upper bound on elements preallocated from an untrusted array header.
const MAX_PREALLOC: usize = 1024;

/// An incremental parser.
///
/// # Example
///
/// ```
/// use respkv::protocol::RespParser;
///
/// let mut parser = RespParser::new();
/// let buf = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
///
/// let (args, consumed) = parser.parse_request(buf).unwrap().unwrap();
/// assert_eq!(consumed, buf.len());
/// assert_eq!(args[0].as_ref(), b"GET");
/// ```
#[derive(Debug, Default)]
pub struct RespParser {
    /// Current nesting depth (for array parsing)
    depth: usize,
}

impl RespParser {
    pub fn new() -> Self {
        Self { depth: 0 }
    }

    /// Decodes one request: `*<N>\r\n` followed by N bulk strings.
    pub fn parse_request(&mut self, buf: &[u8]) -> ProtocolResult<Option<(Vec<Bytes>, usize)>> {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };
        if first != prefix::ARRAY {
            return Err(ProtocolError::ExpectedArray(char::from(first)));
        }

        let Some((count, mut consumed)) = parse_length_line(buf)? else {
            return Ok(None);
        };
        if count < 0 {
            return Err(ProtocolError::InvalidArrayLength(count));
        }
        let count = count as usize;

        // Locate every payload first; nothing is copied until the whole
        // frame is buffered.
        let mut spans = Vec::with_capacity(count.min(MAX_PREALLOC));
        for _ in 0..count {
            let rest = &buf[consumed..];
            let Some(&marker) = rest.first() else {
                return Ok(None);
            };
            if marker != prefix::BULK_STRING {
                return Err(ProtocolError::ExpectedBulkString(char::from(marker)));
            }

            match bulk_span(rest)? {
                Some((Some(span), used)) => {
                    spans.push(consumed + span.start..consumed + span.end);
                    consumed += used;
                }
                Some((None, _)) => return Err(ProtocolError::InvalidBulkLength(-1)),
                None => return Ok(None),
            }
        }

        let args = spans
            .into_iter()
            .map(|span| Bytes::copy_from_slice(&buf[span]))
            .collect();
        Ok(Some((args, consumed)))
    }

    /// Decodes any single value from the front of the buffer.
    pub fn parse(&mut self, buf: &[u8]) -> ProtocolResult<Option<(RespValue, usize)>> {
        self.depth = 0;
        self.parse_value(buf)
    }

    fn parse_value(&mut self, buf: &[u8]) -> ProtocolResult<Option<(RespValue, usize)>> {
        let Some(&first) = buf.first() else {
            return Ok(None);
        };

        if self.depth > MAX_NESTING_DEPTH {
            return Err(ProtocolError::TooDeep(MAX_NESTING_DEPTH));
        }

        match first {
            prefix::SIMPLE_STRING => {
                Ok(parse_line(buf)?.map(|(s, n)| (RespValue::SimpleString(s.to_string()), n)))
            }
            prefix::ERROR => {
                Ok(parse_line(buf)?.map(|(s, n)| (RespValue::Error(s.to_string()), n)))
            }
            prefix::INTEGER => Ok(parse_length_line(buf)?.map(|(n, used)| (RespValue::Integer(n), used))),
            prefix::BULK_STRING => Ok(parse_bulk(buf)?.map(|(data, used)| match data {
                Some(data) => (RespValue::BulkString(data), used),
                None => (RespValue::Null, used),
            })),
            prefix::ARRAY => self.parse_array(buf),
            other => Err(ProtocolError::UnknownPrefix(other)),
        }
    }

    /// Parses an array: `*<count>\r\n<elements...>`
    fn parse_array(&mut self, buf: &[u8]) -> ProtocolResult<Option<(RespValue, usize)>> {
        let Some((count, mut consumed)) = parse_length_line(buf)? else {
            return Ok(None);
        };

        // Null array
        if count == -1 {
            return Ok(Some((RespValue::Null, consumed)));
        }
        if count < 0 {
            return Err(ProtocolError::InvalidArrayLength(count));
        }
        let count = count as usize;

        let mut elements = Vec::with_capacity(count.min(MAX_PREALLOC));
        self.depth += 1;

        for _ in 0..count {
            match self.parse_value(&buf[consumed..])? {
                Some((value, element_consumed)) => {
                    elements.push(value);
                    consumed += element_consumed;
                }
                None => return Ok(None),
            }
        }

        self.depth -= 1;

        Ok(Some((RespValue::Array(elements), consumed)))
    }
}

/// Reads `<prefix><text>\r\n` and returns the text plus bytes consumed.
fn parse_line(buf: &[u8]) -> ProtocolResult<Option<(&str, usize)>> {
    match find_crlf(&buf[1..]) {
        Some(pos) => {
            let text = std::str::from_utf8(&buf[1..1 + pos])
                .map_err(|e| ProtocolError::InvalidUtf8(e.to_string()))?;
            // +1 for prefix, +2 for CRLF
            Ok(Some((text, 1 + pos + 2)))
        }
        None => Ok(None),
    }
}

/// Reads `<prefix><decimal>\r\n`.
fn parse_length_line(buf: &[u8]) -> ProtocolResult<Option<(i64, usize)>> {
    let Some((text, consumed)) = parse_line(buf)? else {
        return Ok(None);
    };
    let n = text
        .parse::<i64>()
        .map_err(|e| ProtocolError::InvalidInteger(format!("{:?}: {}", text, e)))?;
    Ok(Some((n, consumed)))
}

/// Parses `$<length>\r\n<data>\r\n`. `Some((None, _))` is the null bulk string.
fn parse_bulk(buf: &[u8]) -> ProtocolResult<Option<(Option<Bytes>, usize)>> {
    let copy = |span: Range<usize>| Bytes::copy_from_slice(&buf[span]);
    Ok(bulk_span(buf)?.map(|(span, used)| (span.map(copy), used)))
}

/// Locates the payload of a bulk string without copying it.
fn bulk_span(buf: &[u8]) -> ProtocolResult<Option<(Option<Range<usize>>, usize)>> {
    let Some((length, data_start)) = parse_length_line(buf)? else {
        return Ok(None);
    };

    if length == -1 {
        return Ok(Some((None, data_start)));
    }
    if length < 0 {
        return Err(ProtocolError::InvalidBulkLength(length));
    }

    let length = length as usize;
    if length > MAX_BULK_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let total_needed = data_start + length + 2;
    if buf.len() < total_needed {
        return Ok(None);
    }

    if &buf[data_start + length..total_needed] != CRLF {
        return Err(ProtocolError::MissingCrlf);
    }

    Ok(Some((Some(data_start..data_start + length), total_needed)))
}

/// Position of the `\r` of the first CRLF in the buffer.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == CRLF)
}

/// Decodes a single value with a fresh parser.
pub fn parse_message(buf: &[u8]) -> ProtocolResult<Option<(RespValue, usize)>> {
    RespParser::new().parse(buf)
}

/// Decodes a single request with a fresh parser.
pub fn parse_request(buf: &[u8]) -> ProtocolResult<Option<(Vec<Bytes>, usize)>> {
    RespParser::new().parse_request(buf)
}
