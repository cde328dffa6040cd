//! Reqwest-backed transactional mail adapter.
//!
//! Posts one JSON message per mail to the provider's `email` endpoint with a
//! bearer API key. Transport failures and non-2xx answers map onto
//! [`MailerError`]; nothing is retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use zeroize::Zeroizing;

use crate::domain::ports::{Mailer, MailerError};

/// Default request timeout for the mail provider.
pub const DEFAULT_MAIL_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`HttpMailer`].
pub struct HttpMailerConfig {
    /// Provider endpoint accepting the JSON message.
    pub endpoint: Url,
    /// Bearer API key.
    pub api_key: String,
    /// Sender address.
    pub from: String,
    /// Request timeout.
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct MailMessage<'a> {
    from: Address<'a>,
    to: [Address<'a>; 1],
    subject: &'a str,
    text: String,
    html: String,
}

/// Mail adapter for a JSON-over-HTTP transactional mail API.
pub struct HttpMailer {
    client: Client,
    endpoint: Url,
    api_key: Zeroizing<String>,
    from: String,
}

impl HttpMailer {
    /// Build the adapter.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(config: HttpMailerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint,
            api_key: Zeroizing::new(config.api_key),
            from: config.from,
        })
    }
}

fn build_message<'a>(from: &'a str, to: &'a str, code: &str, link: &str) -> MailMessage<'a> {
    MailMessage {
        from: Address { email: from },
        to: [Address { email: to }],
        subject: super::SUBJECT,
        text: super::text_body(code, link),
        html: super::html_body(code, link),
    }
}

fn map_transport_error(error: reqwest::Error) -> MailerError {
    if error.is_timeout() {
        MailerError::timeout()
    } else {
        MailerError::connection(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> MailerError {
    let preview: String = String::from_utf8_lossy(body).chars().take(200).collect();
    MailerError::delivery(status.as_u16(), preview.trim().to_owned())
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_guest_access(
        &self,
        email: &str,
        code: &str,
        link: &str,
    ) -> Result<(), MailerError> {
        let message = build_message(&self.from, email, code, link);
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.api_key.as_str())
            .json(&message)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.bytes().await.map_err(map_transport_error)?;
        Err(map_status_error(status, body.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn message_carries_code_and_link() {
        let message = build_message(
            "no-reply@ridebook.local",
            "ada@example.com",
            "123456",
            "http://localhost/magic?token=t",
        );
        let value = serde_json::to_value(&message).expect("serializable");
        assert_eq!(value["from"]["email"], "no-reply@ridebook.local");
        assert_eq!(value["to"][0]["email"], "ada@example.com");
        assert!(value["text"].as_str().expect("text").contains("123456"));
        assert!(
            value["html"]
                .as_str()
                .expect("html")
                .contains("http://localhost/magic?token=t")
        );
    }

    #[rstest]
    fn status_errors_keep_code_and_preview() {
        let err = map_status_error(StatusCode::UNPROCESSABLE_ENTITY, b" bad sender ");
        assert_eq!(err, MailerError::delivery(422_u16, "bad sender"));
    }
}
