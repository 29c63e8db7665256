//! Delivery configuration.

use crate::error::{Error, Result};
use mailwright_mime::{DEFAULT_MAX_LINE_WIDTH, MessageOptions};

/// Narrowest line width that still fits an encoded word with its envelope.
const MIN_LINE_WIDTH: usize = 30;

/// Platform capabilities supplied by the environment layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Capabilities {
    /// Double leading dots in bodies; the local MTA does not.
    pub dot_stuffing: bool,
    /// The envelope sender must be configured on the direct transport
    /// before sending instead of being passed with the message.
    pub configure_envelope_sender: bool,
}

/// Testing-address rewrite settings.
///
/// Recipients shaped `<local_part>+<tag>@<domain>` are redirected to
/// `<local_part>@<domain>` and the tag is prepended to the subject.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TestingConfig {
    /// Local part shared by testing addresses.
    #[serde(default = "default_testing_local_part")]
    pub local_part: String,
    /// Internal domain of testing addresses.
    pub domain: String,
}

fn default_testing_local_part() -> String {
    "testing".to_string()
}

impl TestingConfig {
    /// Creates testing settings for `domain` with the `testing` local part.
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            local_part: default_testing_local_part(),
            domain: domain.into(),
        }
    }
}

/// Configuration handed to a [`Mailer`](crate::Mailer) at construction.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Maximum header and body line width.
    pub max_line_width: usize,
    /// Host identifier used in generated content-IDs.
    pub host: String,
    /// Domains that never receive mail.
    pub blackhole_domains: Vec<String>,
    /// Platform capabilities.
    pub capabilities: Capabilities,
    /// Testing-address rewrite; disabled when absent.
    pub testing: Option<TestingConfig>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        let options = MessageOptions::default();
        Self {
            max_line_width: DEFAULT_MAX_LINE_WIDTH,
            host: options.host,
            blackhole_domains: options.blackhole_domains,
            capabilities: Capabilities::default(),
            testing: None,
        }
    }
}

impl DeliveryConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the JSON is malformed or a value is out
    /// of range.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self.max_line_width < MIN_LINE_WIDTH {
            return Err(Error::Config(format!(
                "max_line_width must be at least {MIN_LINE_WIDTH}, got {}",
                self.max_line_width
            )));
        }
        if self.host.trim().is_empty() {
            return Err(Error::Config("host must not be empty".into()));
        }
        if let Some(testing) = &self.testing {
            if testing.local_part.is_empty() || testing.domain.is_empty() {
                return Err(Error::Config(
                    "testing local_part and domain must not be empty".into(),
                ));
            }
        }
        Ok(())
    }

    /// Message options matching this configuration.
    #[must_use]
    pub fn message_options(&self) -> MessageOptions {
        MessageOptions::default()
            .with_max_line_width(self.max_line_width)
            .with_host(self.host.clone())
            .with_dot_stuffing(self.capabilities.dot_stuffing)
            .with_blackhole_domains(self.blackhole_domains.iter().cloned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DeliveryConfig::default();
        assert_eq!(config.max_line_width, 78);
        assert!(config.testing.is_none());
        assert!(!config.capabilities.dot_stuffing);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_json_partial() {
        let config = DeliveryConfig::from_json_str(
            r#"{
                "host": "mx1.example.com",
                "capabilities": { "dot_stuffing": true },
                "testing": { "domain": "example.com" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.max_line_width, 78);
        assert_eq!(config.host, "mx1.example.com");
        assert!(config.capabilities.dot_stuffing);
        assert!(!config.capabilities.configure_envelope_sender);
        assert_eq!(config.testing, Some(TestingConfig::new("example.com")));
    }

    #[test]
    fn test_from_json_invalid() {
        assert!(matches!(
            DeliveryConfig::from_json_str("{ not json"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DeliveryConfig::from_json_str(r#"{ "max_line_width": 10 }"#),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            DeliveryConfig::from_json_str(r#"{ "testing": { "domain": "" } }"#),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_message_options() {
        let config = DeliveryConfig {
            max_line_width: 100,
            host: "mx.example.com".into(),
            capabilities: Capabilities {
                dot_stuffing: true,
                configure_envelope_sender: false,
            },
            ..DeliveryConfig::default()
        };
        let options = config.message_options();
        assert_eq!(options.max_line_width, 100);
        assert_eq!(options.host, "mx.example.com");
        assert!(options.dot_stuffing);
        assert_eq!(options.blackhole_domains, vec!["invalid", "test"]);
    }
}
