//! Transactional email port. Provider integrations live outside this crate; the adapters here
//! either keep an outbox in memory or write the message to the log.

pub mod templates;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{info, warn};

/// Fully rendered email ready for a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub text_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_body: Option<String>,
    pub tag: &'static str,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail transport unavailable: {0}")]
    Transport(String),
    #[error("recipient address '{0}' rejected")]
    InvalidRecipient(String),
}

/// Outbound email hook (SMTP, provider API, ...).
pub trait Mailer: Send + Sync {
    fn send(&self, message: &EmailMessage) -> Result<String, MailError>;
}

fn validate_recipient(address: &str) -> Result<(), MailError> {
    let trimmed = address.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
        _ => Err(MailError::InvalidRecipient(address.to_string())),
    }
}

static MESSAGE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_message_id() -> String {
    let id = MESSAGE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("msg-{id:06}")
}

/// Keeps every accepted message so callers can inspect what would have been sent.
#[derive(Default, Clone)]
pub struct InMemoryMailer {
    outbox: Arc<Mutex<Vec<EmailMessage>>>,
    failing: Arc<AtomicBool>,
}

impl InMemoryMailer {
    pub fn outbox(&self) -> Vec<EmailMessage> {
        self.outbox
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn sent_to(&self, address: &str) -> Vec<EmailMessage> {
        self.outbox()
            .into_iter()
            .filter(|message| message.to.eq_ignore_ascii_case(address))
            .collect()
    }

    /// Make every subsequent send fail with a transport error.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }
}

impl Mailer for InMemoryMailer {
    fn send(&self, message: &EmailMessage) -> Result<String, MailError> {
        if self.failing.load(Ordering::Relaxed) {
            return Err(MailError::Transport("outbox disabled".to_string()));
        }
        validate_recipient(&message.to)?;
        let mut guard = self
            .outbox
            .lock()
            .map_err(|_| MailError::Transport("outbox lock poisoned".to_string()))?;
        guard.push(message.clone());
        Ok(next_message_id())
    }
}

/// Development mailer that only logs.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

impl Mailer for LogMailer {
    fn send(&self, message: &EmailMessage) -> Result<String, MailError> {
        validate_recipient(&message.to)?;
        let id = next_message_id();
        info!(
            message_id = %id,
            from = %self.from,
            to = %message.to,
            tag = message.tag,
            subject = %message.subject,
            "email dispatched"
        );
        Ok(id)
    }
}

/// Best-effort delivery for workflow notifications: a failed send is logged and counted but
/// never fails the workflow step that triggered it.
pub struct Notifier {
    mailer: Arc<dyn Mailer>,
    failures: AtomicU64,
}

impl Notifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self {
            mailer,
            failures: AtomicU64::new(0),
        }
    }

    pub fn deliver(&self, message: &EmailMessage) -> bool {
        match self.mailer.send(message) {
            Ok(_) => true,
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(to = %message.to, tag = message.tag, error = %err, "notification not delivered");
                false
            }
        }
    }

    /// Send and hand the outcome back to callers that track delivery themselves.
    pub fn try_deliver(&self, message: &EmailMessage) -> Result<String, MailError> {
        self.mailer.send(message).map_err(|err| {
            self.failures.fetch_add(1, Ordering::Relaxed);
            err
        })
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(to: &str) -> EmailMessage {
        EmailMessage {
            to: to.to_string(),
            subject: "Hello".to_string(),
            text_body: "Body".to_string(),
            html_body: None,
            tag: "test",
        }
    }

    #[test]
    fn in_memory_mailer_records_messages() {
        let mailer = InMemoryMailer::default();
        let id = mailer.send(&message("tenant@example.com")).expect("sent");
        assert!(id.starts_with("msg-"));
        assert_eq!(mailer.sent_to("TENANT@example.com").len(), 1);
    }

    #[test]
    fn rejects_malformed_recipients() {
        let mailer = InMemoryMailer::default();
        assert!(matches!(
            mailer.send(&message("nobody")),
            Err(MailError::InvalidRecipient(_))
        ));
        assert!(mailer.outbox().is_empty());
    }

    #[test]
    fn failing_mode_returns_transport_error() {
        let mailer = InMemoryMailer::default();
        mailer.set_failing(true);
        assert!(matches!(
            mailer.send(&message("tenant@example.com")),
            Err(MailError::Transport(_))
        ));
    }

    #[test]
    fn notifier_counts_failures_without_propagating() {
        let mailer = InMemoryMailer::default();
        let notifier = Notifier::new(Arc::new(mailer.clone()));
        assert!(notifier.deliver(&message("tenant@example.com")));

        mailer.set_failing(true);
        assert!(!notifier.deliver(&message("tenant@example.com")));
        assert!(notifier.try_deliver(&message("tenant@example.com")).is_err());
        assert_eq!(notifier.failures(), 2);
        assert_eq!(mailer.outbox().len(), 1);
    }
}
