//! Email address types.

use crate::error::{Error, Result};
use crate::header::format_header;
use crate::options::MessageOptions;

/// Email address with an optional display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    email: String,
    name: Option<String>,
}

impl Address {
    /// Creates a validated address.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAddress`] if the email fails the validity
    /// predicate or belongs to a blackhole domain.
    pub fn new(email: &str, name: Option<&str>, options: &MessageOptions) -> Result<Self> {
        let email = validate(email, options)?;
        let name = name
            .map(|n| n.replace(['\r', '\n'], "").trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(Self { email, name })
    }

    /// Returns the bare email address.
    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    /// Returns the display name, if any.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub(crate) fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
    }

    /// Formats the address for use in a header.
    ///
    /// Returns `"Name" <email>` (or an encoded-word name) when a display
    /// name is set, the bare email otherwise.
    #[must_use]
    pub fn to_header(&self, max_width: usize) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", format_header(name, true, max_width), self.email),
            None => self.email.clone(),
        }
    }
}

/// Strips whitespace, control characters and angle brackets from an email.
#[must_use]
pub fn sanitize_email(email: &str) -> String {
    email
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control() && !matches!(c, '<' | '>'))
        .collect()
}

/// Returns true if the email's domain is, or is a subdomain of, one of the
/// blackhole domains.
#[must_use]
pub fn is_blackholed(email: &str, domains: &[String]) -> bool {
    let Some((_, domain)) = email.rsplit_once('@') else {
        return false;
    };
    let domain = domain.to_ascii_lowercase();
    domains.iter().any(|blackhole| {
        let blackhole = blackhole.to_ascii_lowercase();
        domain == blackhole || domain.ends_with(&format!(".{blackhole}"))
    })
}

/// Validates and sanitizes an email.
pub(crate) fn validate(email: &str, options: &MessageOptions) -> Result<String> {
    let sanitized = sanitize_email(email);

    if !(options.validator)(&sanitized) {
        return Err(Error::InvalidAddress(email.to_string()));
    }

    if is_blackholed(&sanitized, &options.blackhole_domains) {
        return Err(Error::InvalidAddress(format!(
            "{sanitized} belongs to a blackhole domain"
        )));
    }

    Ok(sanitized)
}

/// Basic email validation.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();

    // Must contain exactly one @
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if domain.contains('@') {
        return false;
    }

    if local.is_empty() || local.starts_with('.') || local.ends_with('.') {
        return false;
    }

    if local
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || "()<>,;:\\\"[]".contains(c))
    {
        return false;
    }

    // Domain must contain at least one dot and not be empty
    if domain.is_empty() || !domain.contains('.') {
        return false;
    }

    // Domain labels must not be empty
    domain.split('.').all(|label| {
        !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}
