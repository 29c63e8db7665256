//! Testing-address rewrite.
//!
//! Test traffic addressed to `testing+<tag>@<domain>` is redirected to the
//! canonical `testing@<domain>` mailbox, keeping the tag in the subject so
//! it can still be triaged.

use crate::config::TestingConfig;
use mailwright_mime::Message;
use tracing::debug;

/// Redirects tagged testing addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestingRewrite {
    prefix: String,
    domain: String,
    canonical: String,
}

impl TestingRewrite {
    /// Creates a rewrite from its configuration.
    #[must_use]
    pub fn new(config: &TestingConfig) -> Self {
        Self {
            prefix: format!("{}+", config.local_part),
            domain: config.domain.clone(),
            canonical: format!("{}@{}", config.local_part, config.domain),
        }
    }

    /// Returns the canonical testing address.
    #[must_use]
    pub fn canonical(&self) -> &str {
        &self.canonical
    }

    /// Returns the tag of a tagged testing address.
    #[must_use]
    pub fn tag<'a>(&self, email: &'a str) -> Option<&'a str> {
        let (local, domain) = email.rsplit_once('@')?;
        if !domain.eq_ignore_ascii_case(&self.domain) {
            return None;
        }
        let head = local.get(..self.prefix.len())?;
        if !head.eq_ignore_ascii_case(&self.prefix) {
            return None;
        }
        let tag = &local[self.prefix.len()..];
        (!tag.is_empty()).then_some(tag)
    }

    /// Rewrites `message` in place and returns the tags found in `To`.
    ///
    /// Each tag is prepended to the subject as `<tag>, `, and every tagged
    /// address in `To`, `Cc` and `Bcc` becomes the canonical address.
    /// Applying the rewrite again is a no-op.
    pub fn apply(&self, message: &mut Message) -> Vec<String> {
        let tags: Vec<String> = message
            .to()
            .iter()
            .filter_map(|address| self.tag(address.email()))
            .map(str::to_string)
            .collect();

        for tag in &tags {
            let subject = format!("{tag}, {}", message.subject());
            message.set_subject(subject);
        }

        message.rewrite_recipients(|email| self.tag(email).map(|_| self.canonical.clone()));

        if !tags.is_empty() {
            debug!(tags = ?tags, canonical = %self.canonical, "Rewrote testing addresses");
        }
        tags
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn rewrite() -> TestingRewrite {
        TestingRewrite::new(&TestingConfig::new("studyportals.com"))
    }

    #[test]
    fn test_tag() {
        let rewrite = rewrite();
        assert_eq!(rewrite.tag("testing+payments@studyportals.com"), Some("payments"));
        assert_eq!(rewrite.tag("Testing+Ops@StudyPortals.com"), Some("Ops"));
        assert_eq!(rewrite.tag("testing@studyportals.com"), None);
        assert_eq!(rewrite.tag("testing+@studyportals.com"), None);
        assert_eq!(rewrite.tag("testing+payments@example.com"), None);
        assert_eq!(rewrite.tag("other+payments@studyportals.com"), None);
    }

    #[test]
    fn test_apply_single() {
        let mut message = Message::new();
        message.add_to("testing+payments@studyportals.com", None).unwrap();
        message.set_subject("Invoice");

        let tags = rewrite().apply(&mut message);

        assert_eq!(tags, vec!["payments"]);
        assert_eq!(message.subject(), "payments, Invoice");
        assert_eq!(message.to()[0].email(), "testing@studyportals.com");
        assert_eq!(message.bare_to(), ["testing@studyportals.com".to_string()]);
    }

    #[test]
    fn test_apply_multiple_and_other_lists() {
        let mut message = Message::new();
        message.add_to("testing+a@studyportals.com", None).unwrap();
        message.add_to("jane@example.com", None).unwrap();
        message.add_to("testing+b@studyportals.com", None).unwrap();
        message.add_cc("testing+c@studyportals.com", None).unwrap();
        message.add_bcc("testing+d@studyportals.com", None).unwrap();
        message.set_subject("Report");

        let tags = rewrite().apply(&mut message);

        assert_eq!(tags, vec!["a", "b"]);
        assert_eq!(message.subject(), "b, a, Report");
        let to: Vec<&str> = message.to().iter().map(|a| a.email()).collect();
        assert_eq!(
            to,
            vec!["testing@studyportals.com", "jane@example.com", "testing@studyportals.com"]
        );
        assert_eq!(message.cc()[0].email(), "testing@studyportals.com");
        assert_eq!(message.bcc()[0].email(), "testing@studyportals.com");
    }

    #[test]
    fn test_apply_is_idempotent() {
        let mut message = Message::new();
        message.add_to("testing+payments@studyportals.com", None).unwrap();
        message.set_subject("Invoice");

        let rewrite = rewrite();
        rewrite.apply(&mut message);
        let tags = rewrite.apply(&mut message);

        assert!(tags.is_empty());
        assert_eq!(message.subject(), "payments, Invoice");
        assert_eq!(message.to()[0].email(), rewrite.canonical());
    }
}
