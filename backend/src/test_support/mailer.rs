//! Mailer double that keeps what it was asked to send.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::domain::ports::{Mailer, MailerError};

/// One delivered guest access message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub email: String,
    pub code: String,
    pub link: String,
}

impl SentMail {
    /// Token carried by the magic link.
    pub fn token(&self) -> &str {
        self.link
            .split_once("token=")
            .map_or("", |(_, token)| token)
    }
}

#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    /// Refuse every subsequent message.
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<SentMail> {
        match self.sent.lock() {
            Ok(sent) => sent.clone(),
            Err(_) => panic!("mailer mutex"),
        }
    }

    /// Most recent message delivered to `email`.
    pub fn last_for(&self, email: &str) -> Option<SentMail> {
        self.sent()
            .into_iter()
            .rev()
            .find(|mail| mail.email == email)
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_guest_access(
        &self,
        email: &str,
        code: &str,
        link: &str,
    ) -> Result<(), MailerError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailerError::delivery(503_u16, "provider unavailable"));
        }
        match self.sent.lock() {
            Ok(mut sent) => sent.push(SentMail {
                email: email.to_owned(),
                code: code.to_owned(),
                link: link.to_owned(),
            }),
            Err(_) => panic!("mailer mutex"),
        }
        Ok(())
    }
}
