use async_trait::async_trait;

use crate::domain::auth::{AuthError, MailMessage, Mailer};

/// Mailer that writes outgoing messages to the log instead of sending them
///
/// Stands in for an SMTP transport in development; the body is logged at
/// debug level so verification links can be picked up from the output.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
  async fn send(&self, message: MailMessage) -> Result<(), AuthError> {
    tracing::info!(
      target: "starterkit::mail",
      to = %message.to,
      subject = %message.subject,
      "Mail queued"
    );
    tracing::debug!(target: "starterkit::mail", body = %message.body);
    Ok(())
  }
}
