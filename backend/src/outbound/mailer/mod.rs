//! Mailer adapters for guest access messages.

mod http;
mod dev;

pub use http::{DEFAULT_MAIL_TIMEOUT, HttpMailer, HttpMailerConfig};
pub use dev::LogMailer;

const SUBJECT: &str = "Your booking access code";

fn text_body(code: &str, link: &str) -> String {
    format!("Your access code is: {code}\n\nOr click this link to access directly: {link}")
}

fn html_body(code: &str, link: &str) -> String {
    format!(
        "<h2>Your booking access code</h2>\
         <p>Your verification code is: <strong>{code}</strong></p>\
         <p>Or use the link below to access your bookings directly:</p>\
         <p><a href=\"{link}\">Access bookings</a></p>\
         <p>This code will expire in 15 minutes.</p>"
    )
}
