use std::env;

use lettre::message::header::{self, ContentType};
use lettre::message::Mailboxes;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::NotifyConfig;
use crate::models::GuestEntry;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("SMTP_PASSWORD is not set")]
    MissingPassword,

    #[error("Invalid address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("Could not build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP failure: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Mails the couple whenever a guest leaves a message.
#[derive(Debug, Clone)]
pub struct Notifier {
    config: NotifyConfig,
}

impl Notifier {
    pub fn new(config: NotifyConfig) -> Self {
        Notifier { config }
    }

    /// Sends on a blocking thread; failures are only logged.
    pub fn entry_submitted(&self, entry: &GuestEntry) {
        let notifier = self.clone();
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || match notifier.send(&entry) {
            Ok(()) => info!(id = %entry.id, "guestbook notification sent"),
            Err(e) => warn!(id = %entry.id, error = %e, "could not send guestbook notification"),
        });
    }

    fn send(&self, entry: &GuestEntry) -> Result<(), NotifyError> {
        let password = env::var("SMTP_PASSWORD").map_err(|_| NotifyError::MissingPassword)?;
        let email = compose(&self.config, entry)?;

        let mailer = SmtpTransport::starttls_relay(&self.config.relay)?
            .credentials(Credentials::new(self.config.username.clone(), password))
            .build();
        mailer.send(&email)?;
        Ok(())
    }
}

fn compose(config: &NotifyConfig, entry: &GuestEntry) -> Result<Message, NotifyError> {
    let mailboxes: Mailboxes = config.to.parse()?;
    let to_header: header::To = mailboxes.into();

    let subject = format!("{} left a message ({})", entry.name, entry.attendance.label());
    let body = format!(
        "{} wrote in the guestbook:\n\n{}\n\nAttendance: {}\nSubmitted: {}\n",
        entry.name,
        entry.message,
        entry.attendance.label(),
        entry.submitted_at.to_rfc3339(),
    );

    let message = Message::builder()
        .mailbox(to_header)
        .from(config.from.parse()?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body)?;
    Ok(message)
}
