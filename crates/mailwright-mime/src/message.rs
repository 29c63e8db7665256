//! MIME message structure and composition.

use crate::address::{Address, sanitize_email};
use crate::content_type::{AttachmentType, BodyType, ContentType, Disposition, parameter_value};
use crate::encoding::{encode_base64_wrapped, encode_quoted_printable, normalize_line_endings};
use crate::error::{Error, Result};
use crate::header::{Headers, compose_header, format_header};
use crate::options::MessageOptions;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use tracing::debug;

/// Length of the hex hashes used in boundaries and content-IDs.
const HASH_LEN: usize = 32;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
}

impl std::fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
        }
    }
}

/// Encoded body alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    /// Alternative kind.
    pub body_type: BodyType,
    /// Part headers (`Content-Type`, `Content-Transfer-Encoding`).
    pub headers: Headers,
    /// Quoted-Printable encoded body.
    pub body: String,
}

/// Encoded attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentPart {
    /// Original filename.
    pub filename: String,
    /// Allowed MIME type.
    pub mime_type: AttachmentType,
    /// Raw content.
    pub content: Vec<u8>,
    /// Disposition.
    pub disposition: Disposition,
    /// Content-ID, without angle brackets.
    pub content_id: String,
    /// Part headers.
    pub headers: Headers,
    /// Base64 encoded content.
    pub body: String,
}

/// Wire-format rendering of a [`Message`].
///
/// Boundaries are regenerated for every composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    /// Folded header block, without the trailing blank line.
    pub headers: String,
    /// Multipart body.
    pub body: String,
    /// Header-formatted subject.
    pub subject: String,
    /// Outer `multipart/related` boundary.
    pub related_boundary: String,
    /// Nested `multipart/alternative` boundary.
    pub alternative_boundary: String,
}

impl Composed {
    /// Full RFC 822 message with a `Subject` line, for transports that
    /// accept raw content.
    #[must_use]
    pub fn raw(&self, max_width: usize) -> String {
        let subject = compose_header(&[format!("Subject: {}", self.subject)], max_width);
        format!("{subject}\r\n{}\r\n\r\n{}", self.headers, self.body)
    }
}

/// Email message under construction.
#[derive(Debug, Clone, Default)]
pub struct Message {
    options: MessageOptions,
    to: Vec<Address>,
    bare_to: Vec<String>,
    cc: Vec<Address>,
    bcc: Vec<Address>,
    from: Option<Address>,
    reply_to: Option<Address>,
    subject: String,
    headers: Headers,
    bodies: Vec<BodyPart>,
    attachments: Vec<AttachmentPart>,
    sent_at: Option<DateTime<Utc>>,
}

/// Hex SHA-256 of a random seed and `salt`, truncated to [`HASH_LEN`].
fn random_hash(salt: &str) -> String {
    let seed: [u8; 16] = rand::random();
    let mut hasher = Sha256::new();
    hasher.update(seed);
    hasher.update(salt.as_bytes());
    let mut hash = hex::encode(hasher.finalize());
    hash.truncate(HASH_LEN);
    hash
}

/// Replaces every run of tabs with a single space.
fn collapse_tabs(content: &str) -> String {
    let mut result = String::with_capacity(content.len());
    let mut previous_tab = false;
    for c in content.chars() {
        if c == '\t' {
            if !previous_tab {
                result.push(' ');
            }
            previous_tab = true;
        } else {
            result.push(c);
            previous_tab = false;
        }
    }
    result
}

/// Doubles the leading dot of every line.
fn dot_stuff(body: &str) -> String {
    body.split("\r\n")
        .map(|line| {
            if line.starts_with('.') {
                format!(".{line}")
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\r\n")
}

fn is_valid_header_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_graphic() && c != ':')
}

impl Message {
    /// Creates an empty message with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty message with the given options.
    #[must_use]
    pub fn with_options(options: MessageOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Returns the composition options.
    #[must_use]
    pub const fn options(&self) -> &MessageOptions {
        &self.options
    }

    /// Adds a `To` recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is rejected.
    pub fn add_to(&mut self, email: &str, name: Option<&str>) -> Result<()> {
        let address = Address::new(email, name, &self.options)?;
        self.bare_to.push(address.email().to_string());
        self.to.push(address);
        Ok(())
    }

    /// Adds a `Cc` recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is rejected.
    pub fn add_cc(&mut self, email: &str, name: Option<&str>) -> Result<()> {
        self.cc.push(Address::new(email, name, &self.options)?);
        Ok(())
    }

    /// Adds a `Bcc` recipient.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is rejected.
    pub fn add_bcc(&mut self, email: &str, name: Option<&str>) -> Result<()> {
        self.bcc.push(Address::new(email, name, &self.options)?);
        Ok(())
    }

    /// Sets the sender.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is rejected.
    pub fn set_from(&mut self, email: &str, name: Option<&str>) -> Result<()> {
        self.from = Some(Address::new(email, name, &self.options)?);
        Ok(())
    }

    /// Sets the `Reply-To` address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the address is rejected.
    pub fn set_reply_to(&mut self, email: &str, name: Option<&str>) -> Result<()> {
        self.reply_to = Some(Address::new(email, name, &self.options)?);
        Ok(())
    }

    /// Sets the subject.
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    /// Returns the raw subject.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Sets a custom header, prefixing `X-` when missing.
    ///
    /// Setting the same name twice keeps the header's position and the
    /// latest value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if the name is empty or contains
    /// characters not allowed in a header field name.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<()> {
        let name = name.trim();
        if !is_valid_header_name(name) {
            return Err(Error::InvalidHeader(name.to_string()));
        }

        let name = if name.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("x-")) {
            name.to_string()
        } else {
            format!("X-{name}")
        };

        self.headers
            .set(name, format_header(value, false, self.options.max_line_width));
        Ok(())
    }

    /// Returns the custom headers in insertion order.
    #[must_use]
    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Adds (or replaces) the body alternative of the given type.
    ///
    /// `body_type` is `"plain"` or `"html"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownBodyType`] for any other type.
    pub fn add_message(&mut self, content: &str, body_type: &str) -> Result<()> {
        let body_type: BodyType = body_type.parse()?;

        let content = match body_type {
            BodyType::Html => collapse_tabs(content),
            BodyType::Plain => content.to_string(),
        };
        let normalized = normalize_line_endings(&content);
        let encoded = encode_quoted_printable(&normalized, self.options.max_line_width);
        let mut body = encoded.trim_end().to_string();
        if self.options.dot_stuffing {
            body = dot_stuff(&body);
        }

        let mut headers = Headers::new();
        headers.set("Content-Type", body_type.content_type().to_string());
        headers.set(
            "Content-Transfer-Encoding",
            TransferEncoding::QuotedPrintable.to_string(),
        );

        let part = BodyPart {
            body_type,
            headers,
            body,
        };
        match self.bodies.iter_mut().find(|b| b.body_type == body_type) {
            Some(existing) => *existing = part,
            None => self.bodies.push(part),
        }
        Ok(())
    }

    /// Adds an attachment and returns its content-ID.
    ///
    /// When `content_id` is `None` one is generated from a random seed and
    /// the filename, suffixed with the configured host. An attachment with
    /// an existing content-ID replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDisposition`] unless `disposition` is
    /// `"attachment"` or `"inline"`, and [`Error::UnsupportedMimeType`] if
    /// `mime_type` is not in the allow-list.
    pub fn add_attachment(
        &mut self,
        filename: &str,
        mime_type: &str,
        content: &[u8],
        disposition: &str,
        content_id: Option<&str>,
    ) -> Result<String> {
        let disposition: Disposition = disposition.parse()?;
        let mime_type: AttachmentType = mime_type.parse()?;

        let content_id = content_id
            .map(sanitize_email)
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("{}@{}", random_hash(filename), self.options.host));

        let name = format_header(filename, false, self.options.max_line_width);
        let mut headers = Headers::new();
        headers.set(
            "Content-Type",
            mime_type.content_type().with_parameter("name", name.as_str()).to_string(),
        );
        headers.set("Content-Transfer-Encoding", TransferEncoding::Base64.to_string());
        headers.set("Content-ID", format!("<{content_id}>"));
        headers.set(
            "Content-Disposition",
            format!("{disposition}; filename={}", parameter_value(&name)),
        );

        let part = AttachmentPart {
            filename: filename.to_string(),
            mime_type,
            content: content.to_vec(),
            disposition,
            content_id: content_id.clone(),
            headers,
            body: encode_base64_wrapped(content),
        };
        match self
            .attachments
            .iter_mut()
            .find(|a| a.content_id == content_id)
        {
            Some(existing) => *existing = part,
            None => self.attachments.push(part),
        }

        Ok(content_id)
    }

    /// Returns the `To` recipients.
    #[must_use]
    pub fn to(&self) -> &[Address] {
        &self.to
    }

    /// Returns the bare `To` addresses.
    #[must_use]
    pub fn bare_to(&self) -> &[String] {
        &self.bare_to
    }

    /// Returns every envelope recipient: `To`, then `Cc`, then `Bcc`, each
    /// address once.
    #[must_use]
    pub fn envelope_recipients(&self) -> Vec<String> {
        let mut recipients: Vec<String> = Vec::new();
        let emails = self
            .bare_to
            .iter()
            .map(String::as_str)
            .chain(self.cc.iter().map(Address::email))
            .chain(self.bcc.iter().map(Address::email));
        for email in emails {
            if !recipients.iter().any(|r| r.eq_ignore_ascii_case(email)) {
                recipients.push(email.to_string());
            }
        }
        recipients
    }

    /// Returns the `Cc` recipients.
    #[must_use]
    pub fn cc(&self) -> &[Address] {
        &self.cc
    }

    /// Returns the `Bcc` recipients.
    #[must_use]
    pub fn bcc(&self) -> &[Address] {
        &self.bcc
    }

    /// Returns the sender.
    #[must_use]
    pub const fn from(&self) -> Option<&Address> {
        self.from.as_ref()
    }

    /// Returns the `Reply-To` address.
    #[must_use]
    pub const fn reply_to(&self) -> Option<&Address> {
        self.reply_to.as_ref()
    }

    /// Returns the body alternatives in insertion order.
    #[must_use]
    pub fn bodies(&self) -> &[BodyPart] {
        &self.bodies
    }

    /// Returns the attachments in insertion order.
    #[must_use]
    pub fn attachments(&self) -> &[AttachmentPart] {
        &self.attachments
    }

    /// Returns when the message was last sent.
    #[must_use]
    pub const fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    /// Records the send time.
    pub fn mark_sent(&mut self, at: DateTime<Utc>) {
        self.sent_at = Some(at);
    }

    /// Rewrites every `To`, bare `To`, `Cc` and `Bcc` address for which
    /// `rewrite` returns a replacement.
    pub fn rewrite_recipients<F>(&mut self, mut rewrite: F)
    where
        F: FnMut(&str) -> Option<String>,
    {
        for address in self.to.iter_mut().chain(&mut self.cc).chain(&mut self.bcc) {
            if let Some(replacement) = rewrite(address.email()) {
                address.set_email(replacement);
            }
        }
        for email in &mut self.bare_to {
            if let Some(replacement) = rewrite(email.as_str()) {
                *email = replacement;
            }
        }
    }

    fn address_list(&self, addresses: &[Address]) -> String {
        addresses
            .iter()
            .map(|a| a.to_header(self.options.max_line_width))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn compose_headers(&self, from: &Address, related_boundary: &str) -> String {
        let mut lines = vec![format!("To: {}", self.address_list(&self.to))];
        if !self.cc.is_empty() {
            lines.push(format!("Cc: {}", self.address_list(&self.cc)));
        }
        if !self.bcc.is_empty() {
            lines.push(format!("Bcc: {}", self.address_list(&self.bcc)));
        }
        lines.push(format!("From: {}", from.to_header(self.options.max_line_width)));
        if let Some(reply_to) = &self.reply_to {
            lines.push(format!(
                "Reply-To: {}",
                reply_to.to_header(self.options.max_line_width)
            ));
        }
        lines.push(format!("Return-Path: <{}>", from.email()));
        lines.push("MIME-Version: 1.0".to_string());
        lines.push(format!(
            "Content-Type: {}",
            ContentType::multipart_related(related_boundary)
        ));
        lines.extend(self.headers.lines());

        compose_header(&lines, self.options.max_line_width)
    }

    fn part_headers(&self, headers: &Headers) -> String {
        compose_header(&headers.lines(), self.options.max_line_width)
    }

    fn compose_body(&self, related_boundary: &str, alternative_boundary: &str) -> String {
        let alternative = compose_header(
            &[format!(
                "Content-Type: {}",
                ContentType::multipart_alternative(alternative_boundary)
            )],
            self.options.max_line_width,
        );
        let mut body = format!("--{related_boundary}\r\n{alternative}\r\n\r\n");

        // Clients favour the last alternative they understand.
        for body_type in [BodyType::Plain, BodyType::Html] {
            if let Some(part) = self.bodies.iter().find(|b| b.body_type == body_type) {
                let _ = write!(
                    body,
                    "--{alternative_boundary}\r\n{}\r\n\r\n{}\r\n",
                    self.part_headers(&part.headers),
                    part.body
                );
            }
        }
        let _ = write!(body, "--{alternative_boundary}--\r\n");

        for attachment in &self.attachments {
            let _ = write!(
                body,
                "\r\n--{related_boundary}\r\n{}\r\n\r\n{}\r\n",
                self.part_headers(&attachment.headers),
                attachment.body
            );
        }
        let _ = write!(body, "\r\n--{related_boundary}--\r\n");

        body
    }

    /// Renders the message into a header block and a multipart body.
    ///
    /// Fresh boundaries are generated on every call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRecipient`] if there is no `To` recipient and
    /// [`Error::NoSender`] if no sender is set.
    pub fn compose(&self) -> Result<Composed> {
        if self.to.is_empty() {
            return Err(Error::NoRecipient);
        }
        let from = self.from.as_ref().ok_or(Error::NoSender)?;

        let related_boundary = format!("Rel__{}", random_hash("related"));
        let alternative_boundary = format!("Alt__{}", random_hash("alternative"));
        debug!(
            related = %related_boundary,
            alternative = %alternative_boundary,
            bodies = self.bodies.len(),
            attachments = self.attachments.len(),
            "Composing message"
        );

        Ok(Composed {
            headers: self.compose_headers(from, &related_boundary),
            body: self.compose_body(&related_boundary, &alternative_boundary),
            subject: format_header(&self.subject, false, self.options.max_line_width),
            related_boundary,
            alternative_boundary,
        })
    }

    /// Renders the message for preview, with the `Subject` and `Date`
    /// lines a transport would add.
    ///
    /// The date is `time`, else the recorded send time, else now.
    ///
    /// # Errors
    ///
    /// Returns the composition error if the message cannot be composed.
    pub fn try_render(&self, time: Option<DateTime<Utc>>) -> Result<String> {
        let composed = self.compose()?;
        let date = time.or(self.sent_at).unwrap_or_else(Utc::now);
        let synthetic = compose_header(
            &[
                format!("Subject: {}", composed.subject),
                format!("Date: {}", date.to_rfc2822()),
            ],
            self.options.max_line_width,
        );
        Ok(format!(
            "{synthetic}\r\n{}\r\n\r\n{}",
            composed.headers, composed.body
        ))
    }

    /// Like [`Message::try_render`], returning an empty string when the
    /// message cannot be composed.
    #[must_use]
    pub fn render(&self, time: Option<DateTime<Utc>>) -> String {
        self.try_render(time).unwrap_or_else(|e| {
            debug!(error = %e, "Render failed");
            String::new()
        })
    }
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
    use crate::encoding::{decode_base64, decode_quoted_printable};
    use chrono::TimeZone;

    fn minimal() -> Message {
        let mut message = Message::new();
        message.add_to("alice@example.com", Some("Alice Liddell")).unwrap();
        message.set_from("noreply@example.com", None).unwrap();
        message.set_subject("Hello");
        message
    }

    #[test]
    fn test_compose_requires_recipient() {
        let mut message = Message::new();
        message.set_from("noreply@example.com", None).unwrap();
        assert!(matches!(message.compose(), Err(Error::NoRecipient)));
    }

    #[test]
    fn test_compose_requires_sender() {
        let mut message = Message::new();
        message.add_to("alice@example.com", None).unwrap();
        assert!(matches!(message.compose(), Err(Error::NoSender)));
    }

    #[test]
    fn test_add_to_rejects_invalid() {
        let mut message = Message::new();
        assert!(matches!(
            message.add_to("broken", None),
            Err(Error::InvalidAddress(_))
        ));
        assert!(message.to().is_empty());
        assert!(message.bare_to().is_empty());
    }

    #[test]
    fn test_bare_to_tracks_to() {
        let message = minimal();
        assert_eq!(message.bare_to(), ["alice@example.com".to_string()]);
        assert_eq!(message.to()[0].name(), Some("Alice Liddell"));
    }

    #[test]
    fn test_header_block_order() {
        let mut message = minimal();
        message.add_cc("carol@example.com", None).unwrap();
        message.add_bcc("bob@example.com", None).unwrap();
        message.set_reply_to("support@example.com", Some("Support")).unwrap();
        message.add_header("Campaign", "spring").unwrap();

        let composed = message.compose().unwrap();
        let names: Vec<&str> = composed
            .headers
            .split("\r\n")
            .filter_map(|line| line.split_once(':').map(|(name, _)| name))
            .collect();
        assert_eq!(
            names,
            vec![
                "To",
                "Cc",
                "Bcc",
                "From",
                "Reply-To",
                "Return-Path",
                "MIME-Version",
                "Content-Type",
                "X-Campaign"
            ]
        );
        assert!(composed.headers.starts_with("To: \"Alice Liddell\" <alice@example.com>\r\n"));
        assert!(composed.headers.contains("Return-Path: <noreply@example.com>"));
        assert!(composed.headers.replace("\r\n\t", " ").contains(&format!(
            "Content-Type: multipart/related; boundary={}",
            composed.related_boundary
        )));
    }

    #[test]
    fn test_optional_headers_omitted() {
        let composed = minimal().compose().unwrap();
        assert!(!composed.headers.contains("Cc:"));
        assert!(!composed.headers.contains("Bcc:"));
        assert!(!composed.headers.contains("Reply-To:"));
    }

    #[test]
    fn test_custom_headers_last_write_wins() {
        let mut message = minimal();
        message.add_header("X-Tag", "one").unwrap();
        message.add_header("Other", "two").unwrap();
        message.add_header("x-tag", "three").unwrap();

        let headers: Vec<(&str, &str)> = message.headers().iter().collect();
        assert_eq!(headers, vec![("x-tag", "three"), ("X-Other", "two")]);
    }

    #[test]
    fn test_custom_header_invalid_name() {
        let mut message = minimal();
        assert!(matches!(
            message.add_header("Bad Name", "x"),
            Err(Error::InvalidHeader(_))
        ));
        assert!(message.add_header("", "x").is_err());
        assert!(message.add_header("A:B", "x").is_err());
    }

    #[test]
    fn test_boundaries_fresh_per_compose() {
        let message = minimal();
        let first = message.compose().unwrap();
        let second = message.compose().unwrap();
        assert_ne!(first.related_boundary, second.related_boundary);
        assert_ne!(first.alternative_boundary, second.alternative_boundary);
        assert!(first.related_boundary.starts_with("Rel__"));
        assert!(first.alternative_boundary.starts_with("Alt__"));
        assert_eq!(first.related_boundary.len(), "Rel__".len() + HASH_LEN);
    }

    #[test]
    fn test_plain_precedes_html() {
        let mut message = minimal();
        message.add_message("<p>Hi</p>", "html").unwrap();
        message.add_message("Hi", "plain").unwrap();

        let body = message.compose().unwrap().body;
        let plain = body.find("Content-Type: text/plain").unwrap();
        let html = body.find("Content-Type: text/html").unwrap();
        assert!(plain < html);
    }

    #[test]
    fn test_add_message_overwrites_same_type() {
        let mut message = minimal();
        message.add_message("first", "plain").unwrap();
        message.add_message("second", "plain").unwrap();
        assert_eq!(message.bodies().len(), 1);
        assert_eq!(message.bodies()[0].body, "second");
    }

    #[test]
    fn test_add_message_unknown_type() {
        let mut message = minimal();
        assert!(matches!(
            message.add_message("x", "markdown"),
            Err(Error::UnknownBodyType(_))
        ));
    }

    #[test]
    fn test_add_message_encodes_body() {
        let mut message = minimal();
        message.add_message("Grüße\nline two   \n", "plain").unwrap();
        let part = &message.bodies()[0];
        assert_eq!(
            part.headers.get("Content-Type"),
            Some("text/plain; charset=utf-8")
        );
        assert_eq!(
            part.headers.get("Content-Transfer-Encoding"),
            Some("quoted-printable")
        );
        assert!(!part.body.ends_with(char::is_whitespace));
        assert_eq!(
            decode_quoted_printable(&part.body).unwrap(),
            "Grüße\r\nline two  \u{20}"
        );
    }

    #[test]
    fn test_add_message_html_collapses_tabs() {
        let mut message = minimal();
        message.add_message("<p>\t\t\tIndented</p>", "html").unwrap();
        assert_eq!(message.bodies()[0].body, "<p> Indented</p>");
    }

    #[test]
    fn test_body_lines_within_width() {
        let mut message = minimal();
        message
            .add_message(&"Lorem ipsum dolor sit amet, ünïcode ".repeat(20), "plain")
            .unwrap();
        for line in message.bodies()[0].body.split("\r\n") {
            assert!(line.len() <= 78, "too long: {line}");
        }
    }

    #[test]
    fn test_dot_stuffing() {
        let options = MessageOptions::default().with_dot_stuffing(true);
        let mut message = Message::with_options(options);
        message.add_message("first\n.second\n..third", "plain").unwrap();
        assert_eq!(message.bodies()[0].body, "first\r\n..second\r\n...third");

        let mut message = minimal();
        message.add_message("first\n.second", "plain").unwrap();
        assert_eq!(message.bodies()[0].body, "first\r\n.second");
    }

    #[test]
    fn test_add_attachment_generates_content_id() {
        let options = MessageOptions::default().with_host("mail.example.com");
        let mut message = Message::with_options(options);
        let first = message
            .add_attachment("logo.png", "image/png", b"png", "inline", None)
            .unwrap();
        let second = message
            .add_attachment("logo.png", "image/png", b"png", "inline", None)
            .unwrap();

        assert!(first.ends_with("@mail.example.com"));
        assert_ne!(first, second);
        assert_eq!(message.attachments().len(), 2);
    }

    #[test]
    fn test_add_attachment_explicit_content_id_replaces() {
        let mut message = minimal();
        let cid = message
            .add_attachment("a.pdf", "application/pdf", b"one", "attachment", Some("<doc@x>"))
            .unwrap();
        assert_eq!(cid, "doc@x");
        message
            .add_attachment("b.pdf", "application/pdf", b"two", "attachment", Some("doc@x"))
            .unwrap();

        assert_eq!(message.attachments().len(), 1);
        assert_eq!(message.attachments()[0].filename, "b.pdf");
        assert_eq!(decode_base64(&message.attachments()[0].body).unwrap(), b"two");
    }

    #[test]
    fn test_add_attachment_validation() {
        let mut message = minimal();
        assert!(matches!(
            message.add_attachment("a.exe", "application/x-msdownload", b"", "attachment", None),
            Err(Error::UnsupportedMimeType(_))
        ));
        assert!(matches!(
            message.add_attachment("a.pdf", "application/pdf", b"", "hidden", None),
            Err(Error::InvalidDisposition(_))
        ));
        assert!(message.attachments().is_empty());
    }

    #[test]
    fn test_attachment_headers() {
        let mut message = minimal();
        let cid = message
            .add_attachment("annual report.pdf", "application/pdf", &[0u8; 100], "inline", None)
            .unwrap();
        let part = &message.attachments()[0];

        assert_eq!(
            part.headers.get("Content-Type"),
            Some("application/pdf; name=\"annual report.pdf\"")
        );
        assert_eq!(part.headers.get("Content-Transfer-Encoding"), Some("base64"));
        assert_eq!(part.headers.get("Content-ID"), Some(format!("<{cid}>").as_str()));
        assert_eq!(
            part.headers.get("Content-Disposition"),
            Some("inline; filename=\"annual report.pdf\"")
        );
        assert!(part.body.split("\r\n").all(|line| line.len() <= 76));
    }

    #[test]
    fn test_attachment_filename_specials_quoted() {
        let mut message = minimal();
        message
            .add_attachment("re;port\"x.pdf", "application/pdf", b"x", "attachment", None)
            .unwrap();
        let part = &message.attachments()[0];
        assert_eq!(
            part.headers.get("Content-Type"),
            Some("application/pdf; name=\"re;port\\\"x.pdf\"")
        );
        assert_eq!(
            part.headers.get("Content-Disposition"),
            Some("attachment; filename=\"re;port\\\"x.pdf\"")
        );
    }

    #[test]
    fn test_attachment_encoded_filename_quoted() {
        let mut message = minimal();
        message
            .add_attachment("résumé.pdf", "application/pdf", b"x", "attachment", None)
            .unwrap();
        assert_eq!(
            message.attachments()[0].headers.get("Content-Type"),
            Some("application/pdf; name=\"=?utf-8?q?r=C3=A9sum=C3=A9=2Epdf?=\"")
        );
    }

    #[test]
    fn test_envelope_recipients() {
        let mut message = minimal();
        message.add_cc("carol@example.com", None).unwrap();
        message.add_bcc("secret@example.com", None).unwrap();
        message.add_bcc("Alice@example.com", None).unwrap();
        assert_eq!(
            message.envelope_recipients(),
            vec!["alice@example.com", "carol@example.com", "secret@example.com"]
        );
    }

    #[test]
    fn test_composed_body_structure() {
        let mut message = minimal();
        message.add_message("Plain", "plain").unwrap();
        message.add_message("<b>Html</b>", "html").unwrap();
        let first = message
            .add_attachment("a.png", "image/png", b"a", "inline", Some("a@x"))
            .unwrap();
        let second = message
            .add_attachment("b.zip", "application/zip", b"b", "attachment", Some("b@x"))
            .unwrap();

        let composed = message.compose().unwrap();
        let rel = &composed.related_boundary;
        let alt = &composed.alternative_boundary;
        let body = &composed.body;

        assert!(body.starts_with(&format!(
            "--{rel}\r\nContent-Type: multipart/alternative;\r\n\tboundary={alt}\r\n\r\n--{alt}\r\n"
        )));
        assert_eq!(body.matches(&format!("--{alt}\r\n")).count(), 2);
        assert_eq!(body.matches(&format!("--{rel}\r\n")).count(), 3);
        assert!(body.ends_with(&format!("\r\n--{rel}--\r\n")));

        let alt_end = body.find(&format!("--{alt}--")).unwrap();
        let first_pos = body.find(&format!("<{first}>")).unwrap();
        let second_pos = body.find(&format!("<{second}>")).unwrap();
        assert!(alt_end < first_pos);
        assert!(first_pos < second_pos);
        assert!(body.contains("Content-Disposition: inline; filename=a.png"));
        assert!(body.contains("Content-Disposition: attachment; filename=b.zip"));
    }

    #[test]
    fn test_render_injects_subject_and_date() {
        let mut message = minimal();
        message.set_subject("Grüße aus Köln");
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();

        let rendered = message.render(Some(at));
        assert!(rendered.starts_with("Subject: =?utf-8?q?Gr=C3=BC=C3=9Fe_aus_K=C3=B6ln?=\r\n"));
        assert!(rendered.contains("Date: Fri, 1 Mar 2024 12:30:00 +0000\r\nTo: "));
        assert!(rendered.contains("\r\n\r\n--Rel__"));
    }

    #[test]
    fn test_render_uses_sent_time() {
        let mut message = minimal();
        let at = Utc.with_ymd_and_hms(2023, 12, 24, 18, 0, 0).unwrap();
        message.mark_sent(at);
        assert!(message.render(None).contains("Date: Sun, 24 Dec 2023 18:00:00 +0000"));
        assert_eq!(message.sent_at(), Some(at));
    }

    #[test]
    fn test_render_failure_is_empty() {
        let message = Message::new();
        assert_eq!(message.render(None), "");
        assert!(matches!(message.try_render(None), Err(Error::NoRecipient)));
    }

    #[test]
    fn test_raw_includes_subject() {
        let composed = minimal().compose().unwrap();
        let raw = composed.raw(78);
        assert!(raw.starts_with("Subject: Hello\r\nTo: "));
        assert!(raw.contains(&format!("\r\n\r\n--{}", composed.related_boundary)));
    }

    #[test]
    fn test_rewrite_recipients() {
        let mut message = minimal();
        message.add_cc("alice@example.com", None).unwrap();
        message.rewrite_recipients(|email| {
            (email == "alice@example.com").then(|| "archive@example.com".to_string())
        });
        assert_eq!(message.to()[0].email(), "archive@example.com");
        assert_eq!(message.cc()[0].email(), "archive@example.com");
        assert_eq!(message.bare_to(), ["archive@example.com".to_string()]);
        assert_eq!(message.to()[0].name(), Some("Alice Liddell"));
    }
}
