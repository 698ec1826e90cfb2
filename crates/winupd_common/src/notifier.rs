//! Email notifications over an SMTP relay
//!
//! Sending is synchronous and attempted once. [`notify`] records the outcome
//! in the run log and never returns an error, so a broken relay cannot abort
//! an update run.

use std::time::Duration;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};

use crate::config::NotifyConfig;
use crate::error::NotifyError;
use crate::run_log::RunLog;

/// SMTP connect/command timeout
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

pub trait Notifier {
    fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Send and log the outcome. Failures stop here.
pub fn notify(notifier: &dyn Notifier, log: &RunLog, subject: &str, body: &str) {
    match notifier.send(subject, body) {
        Ok(()) => log.info(&format!("Notification sent: {}", subject)),
        Err(e) => log.error(&format!("Notification '{}' failed: {}", subject, e)),
    }
}

/// Relay settings resolved from configuration
#[derive(Debug, Clone)]
pub struct SmtpNotifier {
    host: String,
    port: u16,
    starttls: bool,
    credentials: Option<(String, String)>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpNotifier {
    /// Build from `[notify]`. The password comes from the environment
    /// variable named by `password_env`, never from the file.
    pub fn from_config(config: &NotifyConfig) -> Result<Self, NotifyError> {
        let host = config
            .smtp_host
            .clone()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| NotifyError::NotConfigured("smtp_host is not set".to_string()))?;

        let from = parse_mailbox(config.from.as_deref().unwrap_or_default())?;
        if config.to.is_empty() {
            return Err(NotifyError::NotConfigured("no recipients in 'to'".to_string()));
        }
        let to = config
            .to
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<Result<Vec<_>, _>>()?;

        let credentials = match &config.username {
            Some(user) => {
                let password = std::env::var(&config.password_env).map_err(|_| {
                    NotifyError::NotConfigured(format!(
                        "password variable {} is not set",
                        config.password_env
                    ))
                })?;
                Some((user.clone(), password))
            }
            None => None,
        };

        Ok(Self {
            host,
            port: config.smtp_port,
            starttls: config.starttls,
            credentials,
            from,
            to,
        })
    }

    fn message(&self, subject: &str, body: &str) -> Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for rcpt in &self.to {
            builder = builder.to(rcpt.clone());
        }
        builder
            .body(body.to_string())
            .map_err(|e| NotifyError::Message(e.to_string()))
    }

    fn transport(&self) -> Result<SmtpTransport, NotifyError> {
        let mut builder = if self.starttls {
            SmtpTransport::starttls_relay(&self.host)
                .map_err(|e| NotifyError::Transport(e.to_string()))?
        } else {
            SmtpTransport::builder_dangerous(&self.host)
        };
        builder = builder.port(self.port).timeout(Some(SMTP_TIMEOUT));
        if let Some((user, password)) = &self.credentials {
            builder = builder.credentials(Credentials::new(user.clone(), password.clone()));
        }
        Ok(builder.build())
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = self.message(subject, body)?;
        self.transport()?
            .send(&message)
            .map_err(|e| NotifyError::Transport(e.to_string()))?;
        Ok(())
    }
}

/// Used when notifications are disabled
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn send(&self, _subject: &str, _body: &str) -> Result<(), NotifyError> {
        Ok(())
    }
}

fn parse_mailbox(addr: &str) -> Result<Mailbox, NotifyError> {
    addr.parse::<Mailbox>()
        .map_err(|e| NotifyError::Address(format!("'{}': {}", addr, e)))
}
