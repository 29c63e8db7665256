//! Error types for delivery.

use crate::transport::TransportError;

/// Result type alias for delivery.
pub type Result<T> = std::result::Result<T, Error>;

/// Delivery errors.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The message could not be composed.
    #[error("Composition failed: {0}")]
    Compose(#[from] mailwright_mime::Error),

    /// The managed transport rejected or failed the message.
    #[error("Managed transport failed: {0}")]
    ManagedTransport(TransportError),

    /// The direct transport rejected or failed the message.
    #[error("Direct transport failed: {0}")]
    DirectTransport(TransportError),

    /// The envelope sender could not be configured on the direct transport.
    #[error("Envelope sender failure: {0}")]
    EnvelopeSenderFailure(TransportError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}
