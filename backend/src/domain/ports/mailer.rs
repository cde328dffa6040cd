//! Port abstraction for outbound guest access mail.

use async_trait::async_trait;

use super::define_port_error;

define_port_error! {
    /// Errors raised by mailer adapters.
    pub enum MailerError {
        /// The mail provider could not be reached.
        Connection { message: String } => "mail provider connection failed: {message}",
        /// The provider refused the message.
        Delivery { status: u16, message: String } => "mail delivery refused ({status}): {message}",
        /// The provider did not answer in time.
        Timeout => "mail provider timed out",
    }
}

/// Sends guest access codes and magic links.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `code` and `link` to `email`.
    async fn send_guest_access(&self, email: &str, code: &str, link: &str)
    -> Result<(), MailerError>;
}

/// Fixture mailer that drops every message.
#[derive(Debug, Default)]
pub struct FixtureMailer;

#[async_trait]
impl Mailer for FixtureMailer {
    async fn send_guest_access(
        &self,
        _email: &str,
        _code: &str,
        _link: &str,
    ) -> Result<(), MailerError> {
        Ok(())
    }
}
