//! Builders wiring PostgreSQL adapters, the session signer and the mailer
//! into [`HttpState`].

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::info;

use crate::domain::ports::Mailer;
use crate::inbound::http::state::{HttpState, HttpStatePorts};
use crate::outbound::mailer::{DEFAULT_MAIL_TIMEOUT, HttpMailer, HttpMailerConfig, LogMailer};
use crate::outbound::persistence::{
    DbPool, DieselBookingRepository, DieselGuestAccessRepository, DieselIdempotencyStore,
    DieselRateLimitStore, DieselUserDirectory,
};
use crate::outbound::session::JwtSessionTokens;

use super::{ServerSettings, SettingsError};

/// Failures while assembling the HTTP state.
#[derive(Debug, thiserror::Error)]
pub enum StateBuildError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error("mail client could not be built: {0}")]
    Mailer(#[from] reqwest::Error),
}

/// Pick the HTTP mailer when an endpoint is configured, else the log mailer.
///
/// # Errors
///
/// Fails when the endpoint does not parse or the HTTP client cannot be built.
pub fn build_mailer(settings: &ServerSettings) -> Result<Arc<dyn Mailer>, StateBuildError> {
    match settings.mail_api_url()? {
        Some(endpoint) => {
            info!(host = endpoint.host_str().unwrap_or_default(), "using HTTP mailer");
            let mailer = HttpMailer::new(HttpMailerConfig {
                endpoint,
                api_key: settings.mail_api_key().to_owned(),
                from: settings.mail_from().to_owned(),
                timeout: DEFAULT_MAIL_TIMEOUT,
            })?;
            Ok(Arc::new(mailer))
        }
        None => {
            info!("no mail endpoint configured; guest access mail goes to the log");
            Ok(Arc::new(LogMailer))
        }
    }
}

/// Build the handler state over PostgreSQL adapters sharing `pool`.
///
/// # Errors
///
/// Fails when the settings are invalid or the mailer cannot be built.
pub fn build_http_state(
    settings: &ServerSettings,
    pool: &DbPool,
) -> Result<HttpState, StateBuildError> {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let sessions = JwtSessionTokens::new(
        settings.jwt_secret().as_bytes(),
        settings.jwt_audience(),
        clock.clone(),
    );
    let ports = HttpStatePorts {
        bookings: Arc::new(DieselBookingRepository::new(pool.clone())),
        idempotency: Arc::new(DieselIdempotencyStore::new(pool.clone())),
        access_codes: Arc::new(DieselGuestAccessRepository::new(pool.clone())),
        users: Arc::new(DieselUserDirectory::new(pool.clone())),
        sessions: Arc::new(sessions),
        mailer: build_mailer(settings)?,
        rate_limits: Arc::new(DieselRateLimitStore::new(pool.clone())),
        clock,
    };
    Ok(HttpState::new(ports, settings.http_state_settings()?))
}
