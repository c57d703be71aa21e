//! Outgoing mail: welcome messages, verification codes, reset codes.
//!
//! Delivery sits behind [`Mailer`] so the server can log messages instead
//! of sending them, and tests can capture or fail them.

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Error sending email: {0}")]
    Delivery(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl MailMessage {
    pub fn welcome(from: &str, to: &str, name: &str, code: &str) -> Self {
        MailMessage {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Welcome to Sweet Store!".to_string(),
            text: format!(
                "Hello {name},\n\nWelcome to Sweet Store! Your verification code is {code}.\n\nBest regards,\nThe Sweet Store Team"
            ),
        }
    }

    pub fn verification(from: &str, to: &str, code: &str) -> Self {
        MailMessage {
            from: from.to_string(),
            to: to.to_string(),
            subject: "Your Sweet Store verification code".to_string(),
            text: format!("Your verification code is {code}."),
        }
    }

    pub fn password_reset(from: &str, to: &str, code: &str, ttl_minutes: i64) -> Self {
        MailMessage {
            from: from.to_string(),
            to: to.to_string(),
            subject: format!("Your password reset token (valid for {ttl_minutes} minutes)"),
            text: format!(
                "Forgot your password? Submit your new password to /api/v1/users/reset-password/{code}.\nIf you didn't request this, please ignore this email."
            ),
        }
    }
}

pub trait Mailer: Send + Sync {
    fn send(&self, message: &MailMessage) -> Result<(), MailError>;
}

/// Writes each message to the log instead of delivering it.
#[derive(Debug, Default)]
pub struct LogMailer;

impl Mailer for LogMailer {
    fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        info!(to = %message.to, subject = %message.subject, "Mail queued");
        Ok(())
    }
}

/// Keeps messages in memory; can be told to fail.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: std::sync::Mutex<Vec<MailMessage>>,
    failing: std::sync::atomic::AtomicBool,
}

#[cfg(test)]
impl MemoryMailer {
    pub fn fail_from_now(&self) {
        self.failing.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    pub fn last_to(&self, to: &str) -> Option<MailMessage> {
        self.sent().into_iter().rev().find(|m| m.to == to)
    }
}

#[cfg(test)]
impl Mailer for MemoryMailer {
    fn send(&self, message: &MailMessage) -> Result<(), MailError> {
        if self.failing.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(MailError::Delivery("connection refused".to_string()));
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(message.clone());
        }
        Ok(())
    }
}
