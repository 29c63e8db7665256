//! MIME header handling.

use crate::address::Address;
use crate::encoding::{encode_word, is_seven_bit, wrap_line};
use crate::error::Result;
use crate::options::MessageOptions;

/// Sequence inserted when a header line is folded.
pub const FOLD: &str = "\r\n\t";

/// Characters that force a display name into a quoted string (RFC 5322).
const PHRASE_SPECIALS: &str = "()<>[]:;@\\,.\"";

/// Ordered collection of headers.
///
/// Names compare case-insensitively; [`Headers::set`] replaces an existing
/// header in place so the original insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    headers: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            headers: Vec::new(),
        }
    }

    /// Inserts a header or replaces the value of an existing one.
    ///
    /// A replaced header keeps its position; a new one is appended.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.headers.push((name, value)),
        }
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns every header as an unfolded `Name: value` line.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect()
    }
}

/// Prepares free text for use in a header value.
///
/// CR and LF are stripped and the result trimmed. Text that is not 7-bit
/// clean becomes a sequence of RFC 2047 encoded words; otherwise, when
/// `quoted` is set and the text contains whitespace or a phrase special
/// (`()<>[]:;@\,."`), it is returned as a quoted string with `"` and `\`
/// escaped.
#[must_use]
pub fn format_header(content: &str, quoted: bool, max_width: usize) -> String {
    let cleaned = content.replace(['\r', '\n'], "");
    let cleaned = cleaned.trim();

    if !is_seven_bit(cleaned) {
        return encode_word(cleaned, max_width);
    }

    if quoted && cleaned.contains(|c: char| c.is_whitespace() || PHRASE_SPECIALS.contains(c)) {
        let escaped = cleaned.replace('\\', "\\\\").replace('"', "\\\"");
        return format!("\"{escaped}\"");
    }

    cleaned.to_string()
}

/// Validates an address and formats it for a header.
///
/// # Errors
///
/// Returns [`Error::InvalidAddress`](crate::Error::InvalidAddress) if the
/// email is malformed or belongs to a blackhole domain.
pub fn format_header_address(
    email: &str,
    name: Option<&str>,
    options: &MessageOptions,
) -> Result<String> {
    let address = Address::new(email, name, options)?;
    Ok(address.to_header(options.max_line_width))
}

fn fold_line(line: &str, max_width: usize) -> String {
    if line.len() <= max_width {
        return line.to_string();
    }

    // One column is kept free for the tab that opens each continuation.
    let width = max_width.saturating_sub(1).max(1);
    let folded = wrap_line(line, width, FOLD);
    let first_fold = folded.find(FOLD).unwrap_or(folded.len());

    if first_fold > max_width {
        if let Some((name, value)) = line.split_once(": ") {
            return format!("{name}:{FOLD}{}", wrap_line(value, width, FOLD));
        }
    }

    folded
}

/// Removes every `name` field, continuation lines included, from a folded
/// header block.
#[must_use]
pub fn strip_header(block: &str, name: &str) -> String {
    let mut kept = Vec::new();
    let mut skipping = false;
    for line in block.split("\r\n") {
        if !line.starts_with([' ', '\t']) {
            skipping = line
                .split_once(':')
                .is_some_and(|(field, _)| field.trim().eq_ignore_ascii_case(name));
        }
        if !skipping {
            kept.push(line);
        }
    }
    kept.join("\r\n")
}

/// Folds every header line longer than `max_width` and joins the block
/// with CRLF.
#[must_use]
pub fn compose_header<S: AsRef<str>>(lines: &[S], max_width: usize) -> String {
    lines
        .iter()
        .map(|line| fold_line(line.as_ref(), max_width))
        .collect::<Vec<_>>()
        .join("\r\n")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::encoding::decode_rfc2047;
    use crate::error::Error;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_set_get() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some("text/plain"));
        assert_eq!(headers.get("content-type"), Some("text/plain")); // Case insensitive
    }

    #[test]
    fn test_headers_set_replaces_in_place() {
        let mut headers = Headers::new();
        headers.set("X-First", "1");
        headers.set("X-Second", "2");
        headers.set("x-first", "one");

        let names: Vec<&str> = headers.iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["x-first", "X-Second"]);
        assert_eq!(headers.get("X-First"), Some("one"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_headers_lines() {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/plain");
        headers.set("Content-Transfer-Encoding", "base64");
        assert_eq!(
            headers.lines(),
            vec!["Content-Type: text/plain", "Content-Transfer-Encoding: base64"]
        );
    }

    #[test]
    fn test_format_header_ascii_unchanged() {
        assert_eq!(format_header("Plain subject", false, 78), "Plain subject");
        assert_eq!(format_header("  line\r\nbreak ", false, 78), "linebreak");
    }

    #[test]
    fn test_format_header_quoted() {
        assert_eq!(format_header("John Doe", true, 78), "\"John Doe\"");
        assert_eq!(format_header("John", true, 78), "John");
        assert_eq!(
            format_header("Say \"hi\" \\o", true, 78),
            "\"Say \\\"hi\\\" \\\\o\""
        );
    }

    #[test]
    fn test_format_header_quotes_specials() {
        assert_eq!(format_header("Doe,John", true, 78), "\"Doe,John\"");
        assert_eq!(format_header("a<b>", true, 78), "\"a<b>\"");
        assert_eq!(format_header("J.R.", true, 78), "\"J.R.\"");
        assert_eq!(format_header("say\"hi", true, 78), "\"say\\\"hi\"");
        assert_eq!(format_header("Doe,John", false, 78), "Doe,John");
    }

    #[test]
    fn test_format_header_non_ascii() {
        let formatted = format_header("Zoë Müller", true, 78);
        assert!(formatted.starts_with("=?utf-8?q?"));
        assert_eq!(decode_rfc2047(&formatted).unwrap(), "Zoë Müller");
    }

    #[test]
    fn test_format_header_address() {
        let options = MessageOptions::default();
        assert_eq!(
            format_header_address("jane@example.com", Some("Jane Roe"), &options).unwrap(),
            "\"Jane Roe\" <jane@example.com>"
        );
        assert_eq!(
            format_header_address("jane@example.com", None, &options).unwrap(),
            "jane@example.com"
        );
        assert!(matches!(
            format_header_address("jane", None, &options),
            Err(Error::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_strip_header_removes_folded_field() {
        let block = "To: a@example.com\r\nBcc: x@example.com,\r\n\ty@example.com\r\nbcc: z@example.com\r\nFrom: b@example.com";
        assert_eq!(
            strip_header(block, "Bcc"),
            "To: a@example.com\r\nFrom: b@example.com"
        );
        assert_eq!(strip_header(block, "Cc"), block);
    }

    #[test]
    fn test_compose_header_short_lines() {
        let lines = vec!["To: a@example.com".to_string(), "MIME-Version: 1.0".to_string()];
        assert_eq!(
            compose_header(&lines, 78),
            "To: a@example.com\r\nMIME-Version: 1.0"
        );
    }

    #[test]
    fn test_compose_header_folds_long_lines() {
        let recipients: Vec<String> = (0..10).map(|i| format!("user{i}@example.com")).collect();
        let line = format!("To: {}", recipients.join(", "));
        let composed = compose_header(&[line.clone()], 78);

        for physical in composed.split("\r\n") {
            assert!(physical.len() <= 78, "too long: {physical}");
        }
        assert!(composed.contains("\r\n\t"));
        assert_eq!(composed.replace("\r\n\t", " "), line);
    }

    #[test]
    fn test_compose_header_breaks_after_long_name() {
        let name = format!("X-{}", "N".repeat(90));
        let line = format!("{name}: value here");
        let composed = compose_header(&[line], 78);
        assert!(composed.starts_with(&format!("{name}:\r\n\tvalue")));
    }

    #[test]
    fn test_compose_header_encoded_subject() {
        let subject = format_header(&"Ça va très bien, merci ".repeat(5), false, 78);
        let composed = compose_header(&[format!("Subject: {subject}")], 78);
        for physical in composed.split("\r\n") {
            assert!(physical.len() <= 78, "too long: {physical}");
        }
    }
}
