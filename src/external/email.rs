//! Email delivery
//!
//! SMTP sending for urgent notifications. Delivery is a write, so it gets
//! retries: exponential backoff with jitter, at most 2 retries, 10 s
//! timeout per attempt. A delivery that exhausts its retries is logged and
//! dropped — it never propagates into the notification store or the
//! emitter.

use std::thread;
use std::time::Duration;

use rand::Rng;

use crate::observability::Logger;

use super::{ProviderError, ProviderResult};

const EMAIL_TIMEOUT_SECS: u64 = 10;
const MAX_RETRIES: u32 = 2;

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server host
    pub smtp_host: String,
    /// SMTP server port
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_user: String,
    /// SMTP password / API key
    pub smtp_password: String,
    /// From address
    pub from_email: String,
    /// From display name
    pub from_name: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: "smtp-relay.brevo.com".to_string(),
            smtp_port: 587,
            smtp_user: String::new(),
            smtp_password: String::new(),
            from_email: "alerts@controltower.local".to_string(),
            from_name: "Logistics Control Tower".to_string(),
        }
    }
}

/// One outbound email
#[derive(Debug, Clone, PartialEq)]
pub struct EmailDelivery {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// Plain-text body
    pub body: String,
}

/// Sends email
pub trait EmailSender: Send + Sync {
    /// Deliver one message.
    ///
    /// # Errors
    ///
    /// Returns an availability error after retries are exhausted.
    fn send(&self, delivery: &EmailDelivery) -> ProviderResult<()>;
}

/// Records deliveries instead of sending them (tests, keyless deployments)
#[derive(Debug, Default)]
pub struct MockEmailSender {
    /// Captured deliveries
    pub sent: std::sync::RwLock<Vec<EmailDelivery>>,
}

impl MockEmailSender {
    /// New empty mock
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of captured deliveries
    pub fn sent_count(&self) -> usize {
        self.sent.read().map(|s| s.len()).unwrap_or(0)
    }
}

impl EmailSender for MockEmailSender {
    fn send(&self, delivery: &EmailDelivery) -> ProviderResult<()> {
        if let Ok(mut sent) = self.sent.write() {
            sent.push(delivery.clone());
        }
        Ok(())
    }
}

/// SMTP-backed sender with backoff retries
pub struct SmtpEmailSender {
    config: EmailConfig,
}

impl SmtpEmailSender {
    /// Build a sender from config
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn send_once(&self, delivery: &EmailDelivery) -> ProviderResult<()> {
        use lettre::{
            message::header::ContentType,
            transport::smtp::authentication::Credentials,
            Message, SmtpTransport, Transport,
        };

        let email = Message::builder()
            .from(
                format!("{} <{}>", self.config.from_name, self.config.from_email)
                    .parse()
                    .map_err(|e| ProviderError::Api {
                        provider: "email",
                        detail: format!("Invalid from address: {}", e),
                    })?,
            )
            .to(delivery.to.parse().map_err(|e| ProviderError::Api {
                provider: "email",
                detail: format!("Invalid to address: {}", e),
            })?)
            .subject(delivery.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(delivery.body.clone())
            .map_err(|e| ProviderError::Api {
                provider: "email",
                detail: format!("Failed to build email: {}", e),
            })?;

        let credentials = Credentials::new(
            self.config.smtp_user.clone(),
            self.config.smtp_password.clone(),
        );
        let mailer = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| ProviderError::Api {
                provider: "email",
                detail: format!("SMTP relay error: {}", e),
            })?
            .credentials(credentials)
            .port(self.config.smtp_port)
            .timeout(Some(Duration::from_secs(EMAIL_TIMEOUT_SECS)))
            .build();

        mailer.send(&email).map_err(|e| ProviderError::Api {
            provider: "email",
            detail: format!("SMTP send failed: {}", e),
        })?;
        Ok(())
    }
}

impl EmailSender for SmtpEmailSender {
    fn send(&self, delivery: &EmailDelivery) -> ProviderResult<()> {
        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                // 1s, 2s base with up to 250ms jitter
                let base = Duration::from_secs(1u64 << (attempt - 1));
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..250u64));
                thread::sleep(base + jitter);
            }
            match self.send_once(delivery) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    Logger::warn(
                        "EMAIL_ATTEMPT_FAILED",
                        &[
                            ("attempt", &attempt.to_string()),
                            ("error", &e.to_string()),
                        ],
                    );
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(ProviderError::Api {
            provider: "email",
            detail: "No attempts made".to_string(),
        }))
    }
}
