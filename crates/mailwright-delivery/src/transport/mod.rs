//! Transport seams.
//!
//! Two kinds of transport are consumed:
//!
//! - [`ManagedTransport`]: a managed email-sending API that accepts the raw
//!   RFC 822 message.
//! - [`DirectTransport`]: local delivery that takes recipients, subject,
//!   body and header block separately.
//!
//! ## Modules
//!
//! - [`sendmail`]: direct delivery through a local `sendmail` binary

pub mod sendmail;

pub use sendmail::SendmailTransport;

use std::io;

/// Errors reported by transports.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The transport refused the message.
    #[error("Rejected: {0}")]
    Rejected(String),

    /// The transport does not support the operation.
    #[error("Not supported: {0}")]
    NotSupported(String),
}

/// Message handed to a [`DirectTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectMessage<'a> {
    /// Bare `To` addresses.
    pub recipients: &'a [String],
    /// Every address to deliver to: `To`, `Cc` and `Bcc`.
    pub envelope_recipients: &'a [String],
    /// Header-formatted subject.
    pub subject: &'a str,
    /// Multipart body.
    pub body: &'a str,
    /// Folded header block, without `Bcc`.
    pub headers: &'a str,
    /// Envelope sender, when passed along with the message.
    pub envelope_sender: Option<&'a str>,
}

/// Managed email-sending API.
pub trait ManagedTransport {
    /// Submits a complete RFC 822 message.
    ///
    /// The message still carries its `Bcc` header; the API derives the
    /// destinations from the header block and removes it.
    ///
    /// # Errors
    ///
    /// Returns an error if the API rejects or fails the submission.
    fn send_raw(&mut self, raw: &[u8]) -> Result<(), TransportError>;
}

/// Local delivery.
pub trait DirectTransport {
    /// Delivers a message.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails.
    fn send(&mut self, message: &DirectMessage<'_>) -> Result<(), TransportError>;

    /// Configures the envelope sender ahead of delivery.
    ///
    /// # Errors
    ///
    /// Returns an error if the sender cannot be configured; the default
    /// implementation always does.
    fn set_envelope_sender(&mut self, sender: &str) -> Result<(), TransportError> {
        Err(TransportError::NotSupported(format!(
            "configuring envelope sender {sender}"
        )))
    }
}
