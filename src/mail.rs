//! Outbound mail. A trait seam so handlers stay testable: production uses
//! SMTP via lettre, development logs the mail, tests capture it in memory.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

#[async_trait]
pub trait EmailBackend: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String>;
}

/// Real delivery over SMTP. Plaintext transport, meant for a local relay.
pub struct SmtpBackend {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpBackend {
    pub fn new(host: &str, port: u16, from: &str) -> Result<Self, String> {
        let from = from
            .parse()
            .map_err(|e| format!("invalid sender address {from:?}: {e}"))?;
        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
            .port(port)
            .build();
        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailBackend for SmtpBackend {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        let to = to
            .parse()
            .map_err(|e| format!("invalid recipient address {to:?}: {e}"))?;
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| format!("failed to build message: {e}"))?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| format!("smtp delivery failed: {e}"))
    }
}

/// Logs instead of sending. Default when no SMTP host is configured.
pub struct ConsoleBackend;

#[async_trait]
impl EmailBackend for ConsoleBackend {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        tracing::info!(%to, %subject, %body, "outgoing email (console backend)");
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Keeps sent mail in memory so tests can read confirmation codes back.
#[derive(Default, Clone)]
pub struct MemoryBackend {
    sent: Arc<Mutex<Vec<SentEmail>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("mail store poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().expect("mail store poisoned").len()
    }

    pub fn clear(&self) {
        self.sent.lock().expect("mail store poisoned").clear();
    }
}

#[async_trait]
impl EmailBackend for MemoryBackend {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), String> {
        self.sent.lock().expect("mail store poisoned").push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_records_messages() {
        let backend = MemoryBackend::new();
        backend
            .send("leo@example.com", "Hello", "First message")
            .await
            .unwrap();
        backend
            .send("mia@example.com", "Hi", "Second message")
            .await
            .unwrap();

        assert_eq!(backend.count(), 2);
        let sent = backend.sent();
        assert_eq!(sent[0].to, "leo@example.com");
        assert_eq!(sent[1].body, "Second message");

        backend.clear();
        assert_eq!(backend.count(), 0);
    }

    #[tokio::test]
    async fn memory_backend_clones_share_store() {
        let backend = MemoryBackend::new();
        let clone = backend.clone();
        clone.send("a@b.c", "s", "b").await.unwrap();
        assert_eq!(backend.count(), 1);
    }
}
