//! # mailwright-mime
//!
//! MIME message composition for outgoing email.
//!
//! ## Features
//!
//! - **Message building**: recipients, sender, subject, custom `X-` headers
//! - **Bodies**: `multipart/alternative` plain-text and HTML renderings
//! - **Attachments**: `multipart/related` parts referenced through `cid:`
//! - **Encoding**: Base64, Quoted-Printable, RFC 2047 encoded words
//! - **Folding**: header lines kept within a configurable width
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwright_mime::Message;
//!
//! let mut message = Message::new();
//! message.add_to("recipient@example.com", Some("Jane Roe"))?;
//! message.set_from("sender@example.com", None)?;
//! message.set_subject("Monthly report");
//! message.add_message("Plain text version", "plain")?;
//!
//! let cid = message.add_attachment("logo.png", "image/png", &logo, "inline", None)?;
//! message.add_message(&format!("<img src=\"cid:{cid}\">"), "html")?;
//!
//! let composed = message.compose()?;
//! println!("{}\r\n\r\n{}", composed.headers, composed.body);
//! ```
//!
//! ### Preview
//!
//! ```ignore
//! // Includes synthetic Subject and Date lines; empty on failure.
//! let preview = message.render(None);
//! ```
//!
//! ### Encoding/Decoding
//!
//! ```ignore
//! use mailwright_mime::encoding::{encode_word, decode_rfc2047};
//!
//! let encoded = encode_word("Grüße", 78);
//! assert_eq!(decode_rfc2047(&encoded)?, "Grüße");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod error;
mod header;
mod message;
mod options;

pub mod encoding;

pub use address::{Address, is_blackholed, is_valid_email, sanitize_email};
pub use content_type::{AttachmentType, BodyType, ContentType, Disposition, parameter_value};
pub use error::{Error, Result};
pub use header::{
    FOLD, Headers, compose_header, format_header, format_header_address, strip_header,
};
pub use message::{AttachmentPart, BodyPart, Composed, Message, TransferEncoding};
pub use options::{DEFAULT_MAX_LINE_WIDTH, MessageOptions};
