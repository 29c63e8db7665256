//! Error types for message composition.

use std::string::FromUtf8Error;

/// Result type alias for message composition.
pub type Result<T> = std::result::Result<T, Error>;

/// Message composition errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Address failed validation or belongs to a blackhole domain.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Message has no `To` recipient.
    #[error("Message has no recipient")]
    NoRecipient,

    /// Message has no `From` address.
    #[error("Message has no sender")]
    NoSender,

    /// Body type is neither `plain` nor `html`.
    #[error("Unknown body type: {0}")]
    UnknownBodyType(String),

    /// Attachment disposition is neither `attachment` nor `inline`.
    #[error("Invalid disposition: {0}")]
    InvalidDisposition(String),

    /// Attachment MIME type is not in the allow-list.
    #[error("Unsupported MIME type: {0}")]
    UnsupportedMimeType(String),

    /// Invalid custom header name.
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// Invalid encoding.
    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    /// Base64 decode error.
    #[error("Base64 decode error: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// UTF-8 decode error.
    #[error("UTF-8 decode error: {0}")]
    Utf8Decode(#[from] FromUtf8Error),
}
