//! Non-fatal diagnostic notices.

use tracing::warn;

/// Receives notices about recoverable failures, such as a managed
/// transport failure that triggered the fallback.
pub trait DiagnosticSink {
    /// Records a notice.
    fn notice(&self, message: &str);
}

/// Forwards notices to `tracing` at warn level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn notice(&self, message: &str) {
        warn!(notice = %message, "Delivery diagnostic");
    }
}
