//! Delivery with managed-API first, local delivery as fallback.

use crate::config::DeliveryConfig;
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{Error, Result};
use crate::rewrite::TestingRewrite;
use crate::transport::{DirectMessage, DirectTransport, ManagedTransport};
use chrono::{DateTime, Utc};
use mailwright_mime::{Composed, Message, strip_header};
use tracing::{debug, info};

/// Transport that delivered a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Delivered through the managed API.
    Managed,
    /// Delivered through the direct transport.
    Direct,
}

/// Sends and previews messages.
///
/// Not synchronized: share it across threads only behind external locking.
pub struct Mailer {
    config: DeliveryConfig,
    managed: Option<Box<dyn ManagedTransport>>,
    direct: Box<dyn DirectTransport>,
    diagnostics: Box<dyn DiagnosticSink>,
    rewrite: Option<TestingRewrite>,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("config", &self.config)
            .field("managed", &self.managed.is_some())
            .field("rewrite", &self.rewrite)
            .finish_non_exhaustive()
    }
}

impl Mailer {
    /// Creates a mailer delivering through `direct` only.
    #[must_use]
    pub fn new(config: DeliveryConfig, direct: impl DirectTransport + 'static) -> Self {
        let rewrite = config.testing.as_ref().map(TestingRewrite::new);
        Self {
            config,
            managed: None,
            direct: Box::new(direct),
            diagnostics: Box::new(TracingSink),
            rewrite,
        }
    }

    /// Tries `managed` before the direct transport.
    #[must_use]
    pub fn with_managed(mut self, managed: impl ManagedTransport + 'static) -> Self {
        self.managed = Some(Box::new(managed));
        self
    }

    /// Replaces the diagnostic sink.
    #[must_use]
    pub fn with_diagnostics(mut self, sink: impl DiagnosticSink + 'static) -> Self {
        self.diagnostics = Box::new(sink);
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    /// Creates an empty message using this mailer's options.
    #[must_use]
    pub fn new_message(&self) -> Message {
        Message::with_options(self.config.message_options())
    }

    /// Applies the testing rewrite, if configured.
    fn apply_rewrite(&self, message: &mut Message) {
        if let Some(rewrite) = &self.rewrite {
            rewrite.apply(message);
        }
    }

    fn send_direct(&mut self, message: &Message, composed: &Composed) -> Result<()> {
        let sender = message.from().map(|from| from.email().to_string());

        let envelope_sender = if self.config.capabilities.configure_envelope_sender {
            if let Some(sender) = &sender {
                self.direct
                    .set_envelope_sender(sender)
                    .map_err(Error::EnvelopeSenderFailure)?;
            }
            None
        } else {
            sender.as_deref()
        };

        // Bcc recipients travel in the envelope only.
        let envelope_recipients = message.envelope_recipients();
        let headers = strip_header(&composed.headers, "Bcc");
        let direct_message = DirectMessage {
            recipients: message.bare_to(),
            envelope_recipients: &envelope_recipients,
            subject: &composed.subject,
            body: &composed.body,
            headers: &headers,
            envelope_sender,
        };
        self.direct
            .send(&direct_message)
            .map_err(Error::DirectTransport)
    }

    /// Sends `message`, recording the send time on success.
    ///
    /// The testing rewrite runs first and mutates `message` in place, then
    /// the message is composed once for both transports. The managed
    /// transport is tried when configured; any failure there is reported to
    /// the diagnostic sink and delivery falls back to the direct transport.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Compose`] if the message cannot be composed,
    /// [`Error::EnvelopeSenderFailure`] if the envelope sender cannot be
    /// configured, and [`Error::DirectTransport`] if the fallback fails.
    pub fn send(&mut self, message: &mut Message) -> Result<Route> {
        self.apply_rewrite(message);
        let composed = message.compose()?;

        if let Some(managed) = self.managed.as_deref_mut() {
            match managed.send_raw(composed.raw(self.config.max_line_width).as_bytes()) {
                Ok(()) => {
                    message.mark_sent(Utc::now());
                    info!(route = ?Route::Managed, recipients = message.bare_to().len(), "Message sent");
                    return Ok(Route::Managed);
                }
                Err(e) => {
                    let e = Error::ManagedTransport(e);
                    self.diagnostics
                        .notice(&format!("API transport failed: {e}"));
                }
            }
        } else {
            debug!("No managed transport configured");
        }

        self.send_direct(message, &composed)?;
        message.mark_sent(Utc::now());
        info!(route = ?Route::Direct, recipients = message.bare_to().len(), "Message sent");
        Ok(Route::Direct)
    }

    /// Renders `message` for preview without sending it.
    ///
    /// Returns an empty string if the message cannot be composed.
    #[must_use]
    pub fn render(&self, message: &Message, time: Option<DateTime<Utc>>) -> String {
        message.render(time)
    }
}
