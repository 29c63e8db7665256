//! Delivery through a local `sendmail`-compatible binary.

use super::{DirectMessage, DirectTransport, TransportError};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Default `sendmail` location.
pub const DEFAULT_SENDMAIL: &str = "/usr/sbin/sendmail";

/// Pipes messages into a local MTA.
///
/// Recipients are passed on the command line from the envelope list, so
/// `Cc` and `Bcc` addresses are delivered without `-t`. The message is
/// written to the program's standard input with `\n` line endings; the MTA
/// converts them for the wire.
#[derive(Debug, Clone)]
pub struct SendmailTransport {
    program: PathBuf,
    envelope_sender: Option<String>,
}

impl Default for SendmailTransport {
    fn default() -> Self {
        Self::new(DEFAULT_SENDMAIL)
    }
}

impl SendmailTransport {
    /// Creates a transport invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            envelope_sender: None,
        }
    }

    /// Builds the command for `message`.
    ///
    /// A sender passed with the message wins over one configured through
    /// [`DirectTransport::set_envelope_sender`].
    #[must_use]
    pub fn command(&self, message: &DirectMessage<'_>) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-i");
        if let Some(sender) = message.envelope_sender.or(self.envelope_sender.as_deref()) {
            command.arg("-f").arg(sender);
        }
        command.arg("--").args(message.envelope_recipients);
        command
    }

    fn payload(message: &DirectMessage<'_>) -> String {
        format!(
            "Subject: {}\r\n{}\r\n\r\n{}",
            message.subject, message.headers, message.body
        )
        .replace("\r\n", "\n")
    }
}

impl DirectTransport for SendmailTransport {
    fn send(&mut self, message: &DirectMessage<'_>) -> Result<(), TransportError> {
        debug!(
            program = %self.program.display(),
            recipients = message.envelope_recipients.len(),
            "Invoking sendmail"
        );

        let mut child = self
            .command(message)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Stdin is closed at the end of this block so the MTA sees EOF.
        let written = child
            .stdin
            .take()
            .map_or(Ok(()), |mut stdin| stdin.write_all(Self::payload(message).as_bytes()));

        // Always reap the child, even when the write failed.
        let output = child.wait_with_output()?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();

        match written {
            Err(e) => {
                warn!(error = %e, status = %output.status, "Writing to sendmail failed");
                Err(TransportError::Io(io::Error::new(
                    e.kind(),
                    format!(
                        "writing to {} failed: {e} ({}){}",
                        self.program.display(),
                        output.status,
                        detail(stderr)
                    ),
                )))
            }
            Ok(()) if output.status.success() => Ok(()),
            Ok(()) => Err(TransportError::Rejected(format!(
                "{} exited with {}{}",
                self.program.display(),
                output.status,
                detail(stderr)
            ))),
        }
    }

    fn set_envelope_sender(&mut self, sender: &str) -> Result<(), TransportError> {
        self.envelope_sender = Some(sender.to_string());
        Ok(())
    }
}

fn detail(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {stderr}")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::ffi::OsStr;

    fn message<'a>(
        recipients: &'a [String],
        envelope: &'a [String],
        sender: Option<&'a str>,
    ) -> DirectMessage<'a> {
        DirectMessage {
            recipients,
            envelope_recipients: envelope,
            subject: "Hello",
            body: "line one\r\nline two",
            headers: "To: a@example.com\r\nFrom: b@example.com",
            envelope_sender: sender,
        }
    }

    #[cfg(unix)]
    fn script(name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let dir = std::env::temp_dir().join(format!("mailwright-sendmail-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn test_command_arguments() {
        let to = vec!["a@example.com".to_string()];
        let envelope = vec![
            "a@example.com".to_string(),
            "c@example.com".to_string(),
            "hidden@example.com".to_string(),
        ];
        let transport = SendmailTransport::new("/opt/bin/sendmail");
        let command = transport.command(&message(&to, &envelope, Some("b@example.com")));

        assert_eq!(command.get_program(), OsStr::new("/opt/bin/sendmail"));
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(
            args,
            [
                "-i",
                "-f",
                "b@example.com",
                "--",
                "a@example.com",
                "c@example.com",
                "hidden@example.com"
            ]
            .map(OsStr::new)
            .to_vec()
        );
    }

    #[test]
    fn test_configured_envelope_sender() {
        let recipients = vec!["a@example.com".to_string()];
        let mut transport = SendmailTransport::default();
        transport.set_envelope_sender("bounce@example.com").unwrap();

        let command = transport.command(&message(&recipients, &recipients, None));
        let args: Vec<&OsStr> = command.get_args().collect();
        assert_eq!(args[1..3], [OsStr::new("-f"), OsStr::new("bounce@example.com")]);
    }

    #[test]
    fn test_payload_uses_newlines() {
        let recipients = vec!["a@example.com".to_string()];
        let payload = SendmailTransport::payload(&message(&recipients, &recipients, None));
        assert_eq!(
            payload,
            "Subject: Hello\nTo: a@example.com\nFrom: b@example.com\n\nline one\nline two"
        );
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let recipients = vec!["a@example.com".to_string()];
        let mut transport = SendmailTransport::new("/nonexistent/mailwright-sendmail");
        assert!(matches!(
            transport.send(&message(&recipients, &recipients, None)),
            Err(TransportError::Io(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_mta_reports_status_and_stderr() {
        // Exits without reading stdin; the write may or may not fail first.
        let program = script("reject.sh", "echo 'queue locked' >&2\nexit 75");
        let recipients = vec!["a@example.com".to_string()];
        let mut transport = SendmailTransport::new(program);

        let err = transport
            .send(&message(&recipients, &recipients, None))
            .unwrap_err()
            .to_string();
        assert!(err.contains("75"), "missing status: {err}");
        assert!(err.contains("queue locked"), "missing stderr: {err}");
    }

    #[cfg(unix)]
    #[test]
    fn test_successful_delivery() {
        let program = script("accept.sh", "cat > /dev/null\nexit 0");
        let recipients = vec!["a@example.com".to_string()];
        let mut transport = SendmailTransport::new(program);
        assert!(transport.send(&message(&recipients, &recipients, None)).is_ok());
    }
}
