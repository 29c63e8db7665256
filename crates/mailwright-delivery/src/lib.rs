//! # mailwright-delivery
//!
//! Delivery of [`mailwright_mime::Message`]s.
//!
//! ## Features
//!
//! - **Fallback**: a managed email-sending API is tried first; on any
//!   failure the message goes through the direct transport
//! - **Testing rewrite**: tagged testing addresses are redirected to a
//!   canonical mailbox with the tag kept in the subject
//! - **Local MTA**: [`SendmailTransport`] pipes messages into `sendmail`
//! - **Explicit configuration**: [`DeliveryConfig`] is passed in; nothing
//!   is read from the process environment
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwright_delivery::{DeliveryConfig, Mailer, SendmailTransport};
//!
//! let config = DeliveryConfig::from_json_str(r#"{ "host": "mx.example.com" }"#)?;
//! let mut mailer = Mailer::new(config, SendmailTransport::default())
//!     .with_managed(api_transport);
//!
//! let mut message = mailer.new_message();
//! message.add_to("recipient@example.com", None)?;
//! message.set_from("sender@example.com", Some("Example"))?;
//! message.set_subject("Welcome");
//! message.add_message("Hello!", "plain")?;
//!
//! let route = mailer.send(&mut message)?;
//! ```
//!
//! ## Modules
//!
//! - [`transport`]: transport traits and the `sendmail` transport

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod config;
mod diagnostics;
mod error;
mod mailer;
mod rewrite;
pub mod transport;

pub use config::{Capabilities, DeliveryConfig, TestingConfig};
pub use diagnostics::{DiagnosticSink, TracingSink};
pub use error::{Error, Result};
pub use mailer::{Mailer, Route};
pub use rewrite::TestingRewrite;
pub use transport::{
    DirectMessage, DirectTransport, ManagedTransport, SendmailTransport, TransportError,
};
