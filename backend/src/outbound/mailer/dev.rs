//! Development mailer that only records a dispatch in the logs.

use async_trait::async_trait;
use tracing::info;

use crate::domain::KeyHash;
use crate::domain::ports::{Mailer, MailerError};

/// Mailer that logs instead of sending. The code and link are never logged.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_guest_access(
        &self,
        email: &str,
        _code: &str,
        _link: &str,
    ) -> Result<(), MailerError> {
        info!(
            recipient_hash = %KeyHash::of(email),
            subject = super::SUBJECT,
            "guest access mail dispatched to log mailer"
        );
        Ok(())
    }
}
