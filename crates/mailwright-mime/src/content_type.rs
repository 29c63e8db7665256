//! MIME content types, body types and attachment dispositions.

use crate::encoding::CHARSET;
use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Characters that force a parameter value into a quoted string (RFC 2045
/// `tspecials`).
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// Renders a header parameter value, quoting and escaping it when it is
/// empty or contains whitespace or `tspecials`.
#[must_use]
pub fn parameter_value(value: &str) -> String {
    if !value.is_empty() && !value.contains(|c: char| c.is_whitespace() || TSPECIALS.contains(c)) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters in rendering order (e.g., charset=utf-8, boundary=xxx).
    pub parameters: Vec<(String, String)>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: Vec::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", CHARSET)
    }

    /// Creates a text/html content type.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", CHARSET)
    }

    /// Creates a multipart/alternative content type with boundary.
    #[must_use]
    pub fn multipart_alternative(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "alternative").with_parameter("boundary", boundary)
    }

    /// Creates a multipart/related content type with boundary.
    #[must_use]
    pub fn multipart_related(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "related").with_parameter("boundary", boundary)
    }

    /// Adds a parameter, replacing any existing value with the same key.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self
            .parameters
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&key))
        {
            Some(entry) => entry.1 = value,
            None => self.parameters.push((key, value)),
        }
        self
    }

    /// Returns a parameter value by key.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let main = &self.main_type;
        let sub = &self.sub_type;
        write!(f, "{main}/{sub}")?;

        for (key, value) in &self.parameters {
            write!(f, "; {key}={}", parameter_value(value))?;
        }

        Ok(())
    }
}

/// Kind of body alternative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BodyType {
    /// `text/plain` rendering.
    Plain,
    /// `text/html` rendering.
    Html,
}

impl BodyType {
    /// Content type of the alternative.
    #[must_use]
    pub fn content_type(self) -> ContentType {
        match self {
            Self::Plain => ContentType::text_plain(),
            Self::Html => ContentType::text_html(),
        }
    }
}

impl FromStr for BodyType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "plain" => Ok(Self::Plain),
            "html" => Ok(Self::Html),
            other => Err(Error::UnknownBodyType(other.to_string())),
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Html => write!(f, "html"),
        }
    }
}

/// Attachment disposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Offered as a downloadable file.
    Attachment,
    /// Rendered inline, usually referenced through `cid:`.
    Inline,
}

impl FromStr for Disposition {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "attachment" => Ok(Self::Attachment),
            "inline" => Ok(Self::Inline),
            other => Err(Error::InvalidDisposition(other.to_string())),
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Attachment => write!(f, "attachment"),
            Self::Inline => write!(f, "inline"),
        }
    }
}

/// MIME types accepted for attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentType {
    /// `message/rfc822`
    Rfc822,
    /// `text/html`
    Html,
    /// `text/plain`
    Plain,
    /// `image/jpeg`
    Jpeg,
    /// `image/png`
    Png,
    /// `image/gif`
    Gif,
    /// `image/bmp`
    Bmp,
    /// `application/pdf`
    Pdf,
    /// `application/msword`
    MsWord,
    /// `application/zip`
    Zip,
}

impl AttachmentType {
    /// Every allowed attachment type.
    pub const ALL: [Self; 10] = [
        Self::Rfc822,
        Self::Html,
        Self::Plain,
        Self::Jpeg,
        Self::Png,
        Self::Gif,
        Self::Bmp,
        Self::Pdf,
        Self::MsWord,
        Self::Zip,
    ];

    /// Returns the MIME type string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rfc822 => "message/rfc822",
            Self::Html => "text/html",
            Self::Plain => "text/plain",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::Bmp => "image/bmp",
            Self::Pdf => "application/pdf",
            Self::MsWord => "application/msword",
            Self::Zip => "application/zip",
        }
    }

    /// Content type of the attachment, without parameters.
    #[must_use]
    pub fn content_type(self) -> ContentType {
        let (main_type, sub_type) = self.as_str().split_once('/').unwrap_or((self.as_str(), ""));
        ContentType::new(main_type, sub_type)
    }
}

impl FromStr for AttachmentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| Error::UnsupportedMimeType(s.to_string()))
    }
}

impl fmt::Display for AttachmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_body_content_types() {
        assert_eq!(BodyType::Plain.content_type().to_string(), "text/plain; charset=utf-8");
        assert_eq!(BodyType::Html.content_type().to_string(), "text/html; charset=utf-8");
    }

    #[test]
    fn test_multipart_related() {
        let ct = ContentType::multipart_related("Rel__abc");
        assert_eq!(ct.parameter("boundary"), Some("Rel__abc"));
        assert_eq!(ct.to_string(), "multipart/related; boundary=Rel__abc");
    }

    #[test]
    fn test_attachment_content_type() {
        let ct = AttachmentType::Pdf
            .content_type()
            .with_parameter("name", "annual report.pdf");
        assert_eq!((ct.main_type.as_str(), ct.sub_type.as_str()), ("application", "pdf"));
        assert_eq!(ct.to_string(), "application/pdf; name=\"annual report.pdf\"");
    }

    #[test]
    fn test_parameter_value_quoting() {
        assert_eq!(parameter_value("report.pdf"), "report.pdf");
        assert_eq!(parameter_value("re;port\"x.pdf"), "\"re;port\\\"x.pdf\"");
        assert_eq!(parameter_value("a=b"), "\"a=b\"");
        assert_eq!(parameter_value("back\\slash"), "\"back\\\\slash\"");
        assert_eq!(parameter_value(""), "\"\"");
    }

    #[test]
    fn test_with_parameter_replaces() {
        let ct = ContentType::new("image", "png")
            .with_parameter("name", "a.png")
            .with_parameter("Name", "b.png");
        assert_eq!(ct.parameters.len(), 1);
        assert_eq!(ct.parameter("name"), Some("b.png"));
    }

    #[test]
    fn test_body_type_parse() {
        assert_eq!("plain".parse::<BodyType>().unwrap(), BodyType::Plain);
        assert_eq!("html".parse::<BodyType>().unwrap(), BodyType::Html);
        assert!(matches!(
            "rtf".parse::<BodyType>(),
            Err(Error::UnknownBodyType(t)) if t == "rtf"
        ));
    }

    #[test]
    fn test_disposition_parse() {
        assert_eq!("inline".parse::<Disposition>().unwrap(), Disposition::Inline);
        assert!(matches!(
            "embedded".parse::<Disposition>(),
            Err(Error::InvalidDisposition(_))
        ));
    }

    #[test]
    fn test_attachment_type_allow_list() {
        for kind in AttachmentType::ALL {
            assert_eq!(kind.as_str().parse::<AttachmentType>().unwrap(), kind);
        }
        assert_eq!("IMAGE/PNG".parse::<AttachmentType>().unwrap(), AttachmentType::Png);
        assert!(matches!(
            "application/x-msdownload".parse::<AttachmentType>(),
            Err(Error::UnsupportedMimeType(_))
        ));
    }
}
