//! Composition options.

use crate::address::is_valid_email;

/// Default maximum header and body line width.
pub const DEFAULT_MAX_LINE_WIDTH: usize = 78;

/// Knobs that shape how a [`Message`](crate::Message) is validated and
/// rendered.
///
/// Platform-dependent behaviour is expressed as plain flags here; nothing in
/// this crate inspects the running system.
#[derive(Debug, Clone)]
pub struct MessageOptions {
    /// Maximum header and body line width.
    pub max_line_width: usize,
    /// Host identifier appended to generated content-IDs.
    pub host: String,
    /// Double leading dots on body lines, for transports that do not
    /// dot-stuff themselves.
    pub dot_stuffing: bool,
    /// Address validity predicate.
    pub validator: fn(&str) -> bool,
    /// Domains (and their subdomains) that never receive mail.
    pub blackhole_domains: Vec<String>,
}

impl Default for MessageOptions {
    fn default() -> Self {
        Self {
            max_line_width: DEFAULT_MAX_LINE_WIDTH,
            host: "localhost".to_string(),
            dot_stuffing: false,
            validator: is_valid_email,
            blackhole_domains: vec!["invalid".to_string(), "test".to_string()],
        }
    }
}

impl MessageOptions {
    /// Creates options with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum line width.
    #[must_use]
    pub const fn with_max_line_width(mut self, width: usize) -> Self {
        self.max_line_width = width;
        self
    }

    /// Sets the host identifier used in content-IDs.
    #[must_use]
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Enables or disables dot-stuffing of body lines.
    #[must_use]
    pub const fn with_dot_stuffing(mut self, enabled: bool) -> Self {
        self.dot_stuffing = enabled;
        self
    }

    /// Replaces the address validity predicate.
    #[must_use]
    pub fn with_validator(mut self, validator: fn(&str) -> bool) -> Self {
        self.validator = validator;
        self
    }

    /// Replaces the list of blackhole domains.
    #[must_use]
    pub fn with_blackhole_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.blackhole_domains = domains.into_iter().map(Into::into).collect();
        self
    }
}
