//! # Percent Escaping for Flattened Output
//!
//! The flattened cursor output format joins key and data tokens into a
//! single `name=value&name=value` string. So that the result can be embedded
//! verbatim as a URL-encoded query string, every token byte outside the
//! unreserved set `[A-Za-z0-9._~-]` is escaped as `%XX` (uppercase hex).
//! The delimiters `=`, `&`, and the escape character `%` itself therefore
//! never appear unescaped inside a token.
//!
//! ## Format
//!
//! ```text
//! key=5&data=x                  single-subscript key with data
//! key1=uk&key2=5&data=x         multi-part key, 1-based suffixes
//! ```
//!
//! Escaping then unescaping yields the original bytes for every input,
//! including inputs made entirely of delimiter characters.

use crate::buffer::OutputBuf;
use crate::error::{CursorError, Result};

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

fn is_unreserved(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_' | b'.' | b'~')
}

/// Appends the escaped form of `token` to `out`.
pub fn escape_into(token: &[u8], out: &mut OutputBuf) {
    for &byte in token {
        if is_unreserved(byte) {
            out.append_byte(byte);
        } else {
            out.append_byte(b'%');
            out.append_byte(HEX_UPPER[(byte >> 4) as usize]);
            out.append_byte(HEX_UPPER[(byte & 0x0F) as usize]);
        }
    }
}

/// Escapes `token` into a fresh string.
pub fn escape(token: &[u8]) -> String {
    let mut out = OutputBuf::with_capacity(token.len());
    escape_into(token, &mut out);
    out.take_string()
}

/// Exact inverse of [`escape`]. Fails on a dangling or non-hex escape.
pub fn unescape(escaped: &str) -> Result<Vec<u8>> {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            if i + 2 >= bytes.len() {
                return Err(CursorError::invalid(format!(
                    "dangling escape at byte {} of {:?}",
                    i, escaped
                )));
            }
            let hi = hex_value(bytes[i + 1])?;
            let lo = hex_value(bytes[i + 2])?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    Ok(out)
}

fn hex_value(byte: u8) -> Result<u8> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        other => Err(CursorError::invalid(format!(
            "invalid escape digit {:?}",
            other as char
        ))),
    }
}

/// Appends one `name=value` pair, `&`-separated from any preceding pair.
/// `suffix` carries the 1-based key number for multi-part keys.
pub fn append_pair(out: &mut OutputBuf, name: &str, suffix: Option<usize>, value: &[u8]) {
    if !out.is_empty() {
        out.append_byte(b'&');
    }
    out.append(name.as_bytes());
    if let Some(n) = suffix {
        out.append(n.to_string().as_bytes());
    }
    out.append_byte(b'=');
    escape_into(value, out);
}
