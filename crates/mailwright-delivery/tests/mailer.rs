//! Integration tests for the mailer.
//!
//! These tests use in-memory transports to observe what each delivery path
//! receives without touching the network or a local MTA. The `sendmail`
//! path is exercised against a shell script standing in for the MTA.

#![allow(clippy::unwrap_used)]

use std::sync::{Arc, Mutex};

use chrono::{TimeZone, Utc};
use mailwright_delivery::{
    Capabilities, DeliveryConfig, DiagnosticSink, DirectMessage, DirectTransport, Error, Mailer,
    ManagedTransport, Route, SendmailTransport, TestingConfig, TransportError,
};
use mailwright_mime::Message;

/// What a direct transport was handed.
#[derive(Debug, Clone, Default)]
struct Delivered {
    recipients: Vec<String>,
    envelope_recipients: Vec<String>,
    subject: String,
    headers: String,
    body: String,
    envelope_sender: Option<String>,
}

/// Managed transport that succeeds or fails on demand.
#[derive(Clone, Default)]
struct MockManaged {
    fail: bool,
    sent: Arc<Mutex<Vec<String>>>,
}

impl ManagedTransport for MockManaged {
    fn send_raw(&mut self, raw: &[u8]) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Rejected("throttled".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push(String::from_utf8(raw.to_vec()).unwrap());
        Ok(())
    }
}

/// Direct transport recording every delivery.
#[derive(Clone, Default)]
struct MockDirect {
    fail: bool,
    refuse_sender: bool,
    configured_sender: Arc<Mutex<Option<String>>>,
    sent: Arc<Mutex<Vec<Delivered>>>,
}

impl DirectTransport for MockDirect {
    fn send(&mut self, message: &DirectMessage<'_>) -> Result<(), TransportError> {
        if self.fail {
            return Err(TransportError::Rejected("queue full".into()));
        }
        self.sent.lock().unwrap().push(Delivered {
            recipients: message.recipients.to_vec(),
            envelope_recipients: message.envelope_recipients.to_vec(),
            subject: message.subject.to_string(),
            headers: message.headers.to_string(),
            body: message.body.to_string(),
            envelope_sender: message.envelope_sender.map(str::to_string),
        });
        Ok(())
    }

    fn set_envelope_sender(&mut self, sender: &str) -> Result<(), TransportError> {
        if self.refuse_sender {
            return Err(TransportError::NotSupported("sendmail_from".into()));
        }
        *self.configured_sender.lock().unwrap() = Some(sender.to_string());
        Ok(())
    }
}

/// Sink collecting notices.
#[derive(Clone, Default)]
struct Notices(Arc<Mutex<Vec<String>>>);

impl DiagnosticSink for Notices {
    fn notice(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

/// Routes mailer logs to the test harness; honours `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn message(mailer: &Mailer) -> Message {
    init_tracing();
    let mut message = mailer.new_message();
    message.add_to("alice@example.com", Some("Alice")).unwrap();
    message.set_from("noreply@example.com", Some("Example")).unwrap();
    message.set_subject("Invoice");
    message.add_message("Your invoice is attached.", "plain").unwrap();
    message
}

#[test]
fn test_managed_success_skips_direct() {
    let managed = MockManaged::default();
    let direct = MockDirect::default();
    let mut mailer =
        Mailer::new(DeliveryConfig::default(), direct.clone()).with_managed(managed.clone());

    let mut message = message(&mailer);
    assert_eq!(mailer.send(&mut message).unwrap(), Route::Managed);

    let sent = managed.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].starts_with("Subject: Invoice\r\nTo: Alice <alice@example.com>\r\n"));
    assert!(direct.sent.lock().unwrap().is_empty());
    assert!(message.sent_at().is_some());
}

#[test]
fn test_managed_failure_falls_back_to_direct() {
    let direct = MockDirect::default();
    let notices = Notices::default();
    let mut mailer = Mailer::new(DeliveryConfig::default(), direct.clone())
        .with_managed(MockManaged {
            fail: true,
            ..MockManaged::default()
        })
        .with_diagnostics(notices.clone());

    let mut message = message(&mailer);
    assert_eq!(mailer.send(&mut message).unwrap(), Route::Direct);

    let notices = notices.0.lock().unwrap();
    assert_eq!(notices.len(), 1);
    assert!(notices[0].starts_with("API transport failed:"));
    assert!(notices[0].contains("throttled"));

    let sent = direct.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipients, vec!["alice@example.com"]);
    assert_eq!(sent[0].subject, "Invoice");
    assert_eq!(sent[0].envelope_sender.as_deref(), Some("noreply@example.com"));
    assert!(sent[0].headers.contains("From: Example <noreply@example.com>"));
    assert!(sent[0].body.contains("Your invoice is attached."));
    assert!(message.sent_at().is_some());
}

#[test]
fn test_direct_only() {
    let direct = MockDirect::default();
    let mut mailer = Mailer::new(DeliveryConfig::default(), direct.clone());

    let mut message = message(&mailer);
    assert_eq!(mailer.send(&mut message).unwrap(), Route::Direct);
    assert_eq!(direct.sent.lock().unwrap().len(), 1);
}

#[test]
fn test_composition_failure_skips_transports() {
    let direct = MockDirect::default();
    let notices = Notices::default();
    let mut mailer = Mailer::new(DeliveryConfig::default(), direct.clone())
        .with_managed(MockManaged::default())
        .with_diagnostics(notices.clone());

    let mut message = mailer.new_message();
    message.set_from("noreply@example.com", None).unwrap();

    assert!(matches!(
        mailer.send(&mut message),
        Err(Error::Compose(mailwright_mime::Error::NoRecipient))
    ));
    assert!(notices.0.lock().unwrap().is_empty());
    assert!(direct.sent.lock().unwrap().is_empty());
    assert!(message.sent_at().is_none());
}

#[test]
fn test_cc_and_bcc_delivered_without_bcc_header() {
    let direct = MockDirect::default();
    let mut mailer = Mailer::new(DeliveryConfig::default(), direct.clone());

    let mut message = message(&mailer);
    message.add_cc("carol@example.com", None).unwrap();
    message.add_bcc("secret@example.com", None).unwrap();
    mailer.send(&mut message).unwrap();

    let sent = direct.sent.lock().unwrap();
    assert_eq!(sent[0].recipients, vec!["alice@example.com"]);
    assert_eq!(
        sent[0].envelope_recipients,
        vec!["alice@example.com", "carol@example.com", "secret@example.com"]
    );
    assert!(sent[0].headers.contains("Cc: carol@example.com"));
    assert!(!sent[0].headers.contains("Bcc:"));
    assert!(!sent[0].headers.contains("secret@example.com"));
}

#[test]
fn test_managed_raw_keeps_bcc_for_the_api() {
    let managed = MockManaged::default();
    let mut mailer =
        Mailer::new(DeliveryConfig::default(), MockDirect::default()).with_managed(managed.clone());

    let mut message = message(&mailer);
    message.add_bcc("secret@example.com", None).unwrap();
    mailer.send(&mut message).unwrap();

    assert!(managed.sent.lock().unwrap()[0].contains("\r\nBcc: secret@example.com\r\n"));
}

#[cfg(unix)]
#[test]
fn test_sendmail_receives_envelope_and_hides_bcc() {
    use std::os::unix::fs::PermissionsExt;

    let dir = std::env::temp_dir().join(format!("mailwright-mailer-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let args_file = dir.join("args");
    let stdin_file = dir.join("stdin");
    let program = dir.join("sendmail.sh");
    std::fs::write(
        &program,
        format!(
            "#!/bin/sh\necho \"$@\" > '{}'\ncat > '{}'\n",
            args_file.display(),
            stdin_file.display()
        ),
    )
    .unwrap();
    std::fs::set_permissions(&program, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut mailer = Mailer::new(DeliveryConfig::default(), SendmailTransport::new(&program));
    let mut message = message(&mailer);
    message.add_cc("carol@example.com", None).unwrap();
    message.add_bcc("secret@example.com", None).unwrap();
    assert_eq!(mailer.send(&mut message).unwrap(), Route::Direct);

    let args = std::fs::read_to_string(&args_file).unwrap();
    assert_eq!(
        args.trim(),
        "-i -f noreply@example.com -- alice@example.com carol@example.com secret@example.com"
    );
    let payload = std::fs::read_to_string(&stdin_file).unwrap();
    assert!(payload.contains("Cc: carol@example.com\n"));
    assert!(!payload.contains("Bcc:"));
    assert!(!payload.contains("secret@example.com"));
}

#[test]
fn test_direct_failure_is_returned() {
    let mut mailer = Mailer::new(
        DeliveryConfig::default(),
        MockDirect {
            fail: true,
            ..MockDirect::default()
        },
    )
    .with_managed(MockManaged {
        fail: true,
        ..MockManaged::default()
    });

    let mut message = message(&mailer);
    assert!(matches!(
        mailer.send(&mut message),
        Err(Error::DirectTransport(TransportError::Rejected(_)))
    ));
    assert!(message.sent_at().is_none());
}

#[test]
fn test_configured_envelope_sender() {
    let config = DeliveryConfig {
        capabilities: Capabilities {
            configure_envelope_sender: true,
            ..Capabilities::default()
        },
        ..DeliveryConfig::default()
    };
    let direct = MockDirect::default();
    let mut mailer = Mailer::new(config, direct.clone());

    let mut message = message(&mailer);
    mailer.send(&mut message).unwrap();

    assert_eq!(
        direct.configured_sender.lock().unwrap().as_deref(),
        Some("noreply@example.com")
    );
    assert!(direct.sent.lock().unwrap()[0].envelope_sender.is_none());
}

#[test]
fn test_envelope_sender_failure() {
    let config = DeliveryConfig {
        capabilities: Capabilities {
            configure_envelope_sender: true,
            ..Capabilities::default()
        },
        ..DeliveryConfig::default()
    };
    let mut mailer = Mailer::new(
        config,
        MockDirect {
            refuse_sender: true,
            ..MockDirect::default()
        },
    );

    let mut message = message(&mailer);
    assert!(matches!(
        mailer.send(&mut message),
        Err(Error::EnvelopeSenderFailure(_))
    ));
}

#[test]
fn test_testing_rewrite_before_send() {
    let config = DeliveryConfig {
        testing: Some(TestingConfig::new("studyportals.com")),
        ..DeliveryConfig::default()
    };
    let direct = MockDirect::default();
    let mut mailer = Mailer::new(config, direct.clone());

    let mut message = mailer.new_message();
    message.add_to("testing+payments@studyportals.com", None).unwrap();
    message.set_from("noreply@example.com", None).unwrap();
    message.set_subject("Invoice");

    mailer.send(&mut message).unwrap();
    assert_eq!(message.subject(), "payments, Invoice");
    assert_eq!(message.bare_to(), ["testing@studyportals.com".to_string()]);

    let sent = direct.sent.lock().unwrap();
    assert_eq!(sent[0].recipients, vec!["testing@studyportals.com"]);
    assert_eq!(sent[0].subject, "payments, Invoice");
    assert!(sent[0].headers.starts_with("To: testing@studyportals.com\r\n"));
    drop(sent);

    // A second send leaves the already rewritten message untouched.
    mailer.send(&mut message).unwrap();
    assert_eq!(message.subject(), "payments, Invoice");
}

#[test]
fn test_render_does_not_send() {
    let direct = MockDirect::default();
    let mailer = Mailer::new(DeliveryConfig::default(), direct.clone());
    let message = message(&mailer);

    let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
    let rendered = mailer.render(&message, Some(at));
    assert!(rendered.starts_with("Subject: Invoice\r\nDate: Mon, 6 May 2024 07:08:09 +0000\r\n"));
    assert!(direct.sent.lock().unwrap().is_empty());
    assert!(message.sent_at().is_none());

    assert_eq!(mailer.render(&mailer.new_message(), None), "");
}

#[test]
fn test_config_flows_into_messages() {
    let config = DeliveryConfig::from_json_str(
        r#"{ "host": "mx.example.com", "capabilities": { "dot_stuffing": true } }"#,
    )
    .unwrap();
    let mailer = Mailer::new(config, MockDirect::default());

    let mut message = mailer.new_message();
    message.add_message("one\n.two", "plain").unwrap();
    assert_eq!(message.bodies()[0].body, "one\r\n..two");

    let cid = message
        .add_attachment("a.gif", "image/gif", b"GIF89a", "inline", None)
        .unwrap();
    assert!(cid.ends_with("@mx.example.com"));
}
