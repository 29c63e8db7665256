//! Transfer and header encodings.
//!
//! Supports Base64, Quoted-Printable bodies, RFC 2047 encoded words and the
//! line wrapping used to keep header and body lines within bounds.

use crate::error::{Error, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

/// Line width for Base64 bodies (RFC 2045).
pub const BASE64_LINE_WIDTH: usize = 76;

/// Maximum Quoted-Printable line length, soft break included (RFC 2045).
pub const QP_LINE_LIMIT: usize = 76;

/// Charset declared by generated encoded words.
pub const CHARSET: &str = "utf-8";

/// Prefix and suffix wrapped around every encoded word.
const WORD_PREFIX: &str = "=?utf-8?q?";
const WORD_SUFFIX: &str = "?=";

/// Room reserved on each folded header line for the tab continuation and
/// the space separating two encoded words.
const FOLD_RESERVE: usize = 2;

/// Smallest chunk that still fits a complete 4-byte UTF-8 character.
const MIN_WORD_TEXT: usize = 12;

/// Encodes data as Base64.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64 hard-wrapped at [`BASE64_LINE_WIDTH`] columns.
#[must_use]
pub fn encode_base64_wrapped(data: &[u8]) -> String {
    let encoded = encode_base64(data);
    // Base64 output is pure ASCII, so byte chunks are valid strings.
    encoded
        .as_bytes()
        .chunks(BASE64_LINE_WIDTH)
        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}

/// Decodes Base64 data, ignoring embedded whitespace.
///
/// # Errors
///
/// Returns an error if the input is not valid Base64.
pub fn decode_base64(data: &str) -> Result<Vec<u8>> {
    let cleaned: String = data.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(cleaned).map_err(Into::into)
}

/// Returns true if every byte of `text` is 7-bit ASCII.
#[must_use]
pub fn is_seven_bit(text: &str) -> bool {
    text.is_ascii()
}

/// Converts every line ending (`\r\n`, bare `\r`, bare `\n`) to `\r\n`.
#[must_use]
pub fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\n', "\r\n")
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Hard line breaks (`\r\n`) are kept as-is; every produced line is at most
/// `line_limit` characters long (capped at [`QP_LINE_LIMIT`]), soft breaks
/// included, and an `=XX` escape is never split by a soft break. Whitespace
/// at the end of a line is escaped so transports cannot strip it.
#[must_use]
pub fn encode_quoted_printable(text: &str, line_limit: usize) -> String {
    let limit = line_limit.clamp(4, QP_LINE_LIMIT);
    text.split("\r\n")
        .map(|line| encode_qp_line(line.as_bytes(), limit))
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn encode_qp_line(line: &[u8], limit: usize) -> String {
    let tokens: Vec<String> = line
        .iter()
        .enumerate()
        .map(|(i, &byte)| {
            let last = i + 1 == line.len();
            match byte {
                b'!'..=b'<' | b'>'..=b'~' => (byte as char).to_string(),
                b' ' | b'\t' if !last => (byte as char).to_string(),
                _ => format!("={byte:02X}"),
            }
        })
        .collect();

    let mut result = String::new();
    let mut line_length = 0;
    for (i, token) in tokens.iter().enumerate() {
        // The final token may use the column a soft break would take.
        let budget = if i + 1 == tokens.len() { limit } else { limit - 1 };
        if line_length + token.len() > budget {
            result.push_str("=\r\n");
            line_length = 0;
        }
        result.push_str(token);
        line_length += token.len();
    }
    result
}

/// Decodes Quoted-Printable text (RFC 2045).
///
/// # Errors
///
/// Returns an error if the input contains invalid escape sequences or the
/// decoded bytes are not UTF-8.
pub fn decode_quoted_printable(text: &str) -> Result<String> {
    let bytes = decode_qp_bytes(text.as_bytes(), false)?;
    String::from_utf8(bytes).map_err(Into::into)
}

fn decode_qp_bytes(input: &[u8], underscore_is_space: bool) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(input.len());
    let mut i = 0;

    while i < input.len() {
        match input[i] {
            b'=' => {
                // Soft line break
                if input[i + 1..].starts_with(b"\r\n") {
                    i += 3;
                    continue;
                }
                if input[i + 1..].starts_with(b"\n") {
                    i += 2;
                    continue;
                }

                let hex = input
                    .get(i + 1..i + 3)
                    .ok_or_else(|| Error::InvalidEncoding("Incomplete escape sequence".into()))?;
                let hex = std::str::from_utf8(hex)
                    .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                let byte = u8::from_str_radix(hex, 16)
                    .map_err(|e| Error::InvalidEncoding(format!("Invalid hex: {e}")))?;
                result.push(byte);
                i += 3;
            }
            b'_' if underscore_is_space => {
                result.push(b' ');
                i += 1;
            }
            byte => {
                result.push(byte);
                i += 1;
            }
        }
    }

    Ok(result)
}

/// Q-encodes `text` for use inside an encoded word (RFC 2047 section 4.2).
fn q_encode(text: &str) -> String {
    let mut result = String::with_capacity(text.len() * 3);
    for &byte in text.as_bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'!' | b'*' | b'+' | b'-' | b'/' => {
                result.push(byte as char);
            }
            b' ' => result.push('_'),
            _ => {
                let _ = write!(result, "={byte:02X}");
            }
        }
    }
    result
}

/// Returns true if the escape starting at `pos` encodes a UTF-8
/// continuation byte (`0x80..=0xBF`).
fn is_continuation_escape(encoded: &[u8], pos: usize) -> bool {
    encoded.get(pos) == Some(&b'=') && matches!(encoded.get(pos + 1), Some(b'8' | b'9' | b'A' | b'B'))
}

/// Encodes `text` as a space-separated sequence of RFC 2047 encoded words.
///
/// Each word is sized so that, once a header is folded with a tab
/// continuation, no line exceeds `max_width`. Cuts never land inside an
/// `=XX` escape nor inside a multi-byte character.
#[must_use]
pub fn encode_word(text: &str, max_width: usize) -> String {
    let encoded = q_encode(text);
    let bytes = encoded.as_bytes();
    let width = max_width
        .saturating_sub(WORD_PREFIX.len() + WORD_SUFFIX.len() + FOLD_RESERVE)
        .max(MIN_WORD_TEXT);

    let mut words = Vec::new();
    let mut start = 0;
    while start < bytes.len() {
        let mut end = (start + width).min(bytes.len());
        if end < bytes.len() {
            if bytes[end - 1] == b'=' {
                end -= 1;
            } else if bytes[end - 2] == b'=' {
                end -= 2;
            }
            while end - start > 3 && is_continuation_escape(bytes, end) {
                end -= 3;
            }
        }
        words.push(format!("{WORD_PREFIX}{}{WORD_SUFFIX}", &encoded[start..end]));
        start = end;
    }

    words.join(" ")
}

/// Encodes a header value using RFC 2047 if it is not 7-bit clean.
#[must_use]
pub fn encode_rfc2047(text: &str, max_width: usize) -> String {
    if is_seven_bit(text) {
        text.to_string()
    } else {
        encode_word(text, max_width)
    }
}

/// A single parsed `=?charset?encoding?text?=` token.
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: &'a str,
    text: &'a str,
    start: usize,
    end: usize,
}

fn find_encoded_word(text: &str, from: usize) -> Option<EncodedWord<'_>> {
    let mut search = from;
    while let Some(offset) = text[search..].find("=?") {
        let start = search + offset;
        if let Some(word) = parse_encoded_word(text, start) {
            return Some(word);
        }
        search = start + 2;
    }
    None
}

fn parse_encoded_word(text: &str, start: usize) -> Option<EncodedWord<'_>> {
    let inner_start = start + 2;
    let rest = &text[inner_start..];
    let charset_len = rest.find('?')?;
    let charset = &rest[..charset_len];
    let after_charset = &rest[charset_len + 1..];
    let encoding_len = after_charset.find('?')?;
    let encoding = &after_charset[..encoding_len];
    let payload = &after_charset[encoding_len + 1..];
    let text_len = payload.find("?=")?;
    let word_text = &payload[..text_len];

    if charset.is_empty() || encoding.len() != 1 || word_text.contains(char::is_whitespace) {
        return None;
    }

    let end = inner_start + charset_len + 1 + encoding_len + 1 + text_len + 2;
    Some(EncodedWord {
        charset,
        encoding,
        text: word_text,
        start,
        end,
    })
}

fn decode_charset(bytes: Vec<u8>, charset: &str) -> Result<String> {
    let charset = charset.to_ascii_lowercase();
    match charset.as_str() {
        "iso-8859-1" | "latin1" | "us-ascii" => Ok(bytes.into_iter().map(char::from).collect()),
        _ => String::from_utf8(bytes).map_err(Into::into),
    }
}

/// Decodes every RFC 2047 encoded word in a header value.
///
/// Whitespace between two adjacent encoded words is dropped, and their
/// bytes are joined before charset decoding so characters split across
/// words are reassembled.
///
/// # Errors
///
/// Returns an error if an encoded word carries an unknown encoding or
/// malformed payload.
pub fn decode_rfc2047(text: &str) -> Result<String> {
    let mut result = String::new();
    let mut pending: Vec<u8> = Vec::new();
    let mut pending_charset = String::new();
    let mut cursor = 0;

    while let Some(word) = find_encoded_word(text, cursor) {
        let between = &text[cursor..word.start];
        let adjacent = !pending.is_empty()
            && between.trim().is_empty()
            && pending_charset.eq_ignore_ascii_case(word.charset);
        if !adjacent {
            if !pending.is_empty() {
                result.push_str(&decode_charset(std::mem::take(&mut pending), &pending_charset)?);
            }
            result.push_str(between);
        }

        let decoded = match word.encoding {
            "B" | "b" => decode_base64(word.text)?,
            "Q" | "q" => decode_qp_bytes(word.text.as_bytes(), true)?,
            other => {
                return Err(Error::InvalidEncoding(format!("Unknown encoding: {other}")));
            }
        };
        pending.extend(decoded);
        pending_charset = word.charset.to_string();
        cursor = word.end;
    }

    if !pending.is_empty() {
        result.push_str(&decode_charset(pending, &pending_charset)?);
    }
    result.push_str(&text[cursor..]);
    Ok(result)
}

/// Largest char boundary of `text` not greater than `index`.
fn floor_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Wraps a single line at `width` columns, inserting `line_break` in place
/// of the space at each break.
///
/// Words longer than `width` are left intact and broken at the next space.
#[must_use]
pub fn wrap_line(line: &str, width: usize, line_break: &str) -> String {
    let width = width.max(1);
    let mut result = String::with_capacity(line.len());
    let mut rest = line;

    while rest.len() > width {
        let window = &rest[..floor_boundary(rest, width + 1)];
        if let Some(pos) = window.rfind(' ').filter(|&pos| pos > 0) {
            result.push_str(&rest[..pos]);
            result.push_str(line_break);
            rest = &rest[pos + 1..];
        } else if let Some(offset) = rest[floor_boundary(rest, width)..].find(' ') {
            let pos = floor_boundary(rest, width) + offset;
            result.push_str(&rest[..pos]);
            result.push_str(line_break);
            rest = &rest[pos + 1..];
        } else {
            break;
        }
    }

    result.push_str(rest);
    result
}
