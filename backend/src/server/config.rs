//! Server settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `RIDEBOOK_*` environment variables and an
//! optional configuration file. Unset fields fall back to the defaults below.

use std::net::SocketAddr;
use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::domain::{AccessCodeHasher, GuestAccessSettings, RateLimitPolicy};
use crate::inbound::http::state::HttpStateSettings;
use crate::outbound::persistence::PoolConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_POOL_MAX_SIZE: u32 = 10;
/// Signing secret used when none is configured. Never suitable for production.
pub const DEV_JWT_SECRET: &str = "dev-only-secret-change-in-prod";
const DEFAULT_JWT_AUDIENCE: &str = "ridebook-api";
const DEFAULT_GUEST_SESSION_TTL_SECS: u64 = 1800;
const DEFAULT_ACCESS_RATE_LIMIT: u32 = 5;
const DEFAULT_BOOKING_RATE_LIMIT: u32 = 30;
const DEFAULT_RATE_WINDOW_SECS: u64 = 60;
const DEFAULT_MAGIC_LINK_BASE: &str = "http://localhost:5173/guest/access/magic";
const DEFAULT_MAIL_FROM: &str = "no-reply@ridebook.local";
const DEFAULT_CLEANUP_INTERVAL_SECS: u64 = 600;

/// Invalid or missing settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("RIDEBOOK_DATABASE_URL must be set")]
    MissingDatabaseUrl,
    #[error("invalid bind address {value:?}: {message}")]
    BindAddr { value: String, message: String },
    #[error("invalid URL for {field}: {message}")]
    Url { field: &'static str, message: String },
    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },
}

/// Configuration for the booking API server.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "RIDEBOOK")]
pub struct ServerSettings {
    /// Socket address to listen on.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string.
    pub database_url: Option<String>,
    /// Maximum pooled database connections.
    pub db_pool_max_size: Option<u32>,
    /// HS256 secret for session tokens.
    pub jwt_secret: Option<String>,
    /// Audience claim for session tokens.
    pub jwt_audience: Option<String>,
    /// Lifetime of guest sessions in seconds.
    pub guest_session_ttl_secs: Option<u64>,
    /// Guest access requests allowed per window, per IP and per email.
    pub access_rate_limit: Option<u32>,
    pub access_rate_window_secs: Option<u64>,
    /// Guest booking creations allowed per window, per IP.
    pub booking_rate_limit: Option<u32>,
    pub booking_rate_window_secs: Option<u64>,
    /// Admit requests while the counter store is unavailable.
    pub rate_limit_fail_open: Option<bool>,
    /// Page that receives magic link tokens.
    pub magic_link_base: Option<String>,
    /// Transactional mail endpoint. The logging mailer is used when unset.
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: Option<String>,
    /// Period of the expired-row sweep in seconds.
    pub cleanup_interval_secs: Option<u64>,
    /// Apply embedded migrations before serving.
    pub run_migrations: Option<bool>,
}

fn positive(value: u64, field: &'static str) -> Result<u64, SettingsError> {
    if value == 0 {
        return Err(SettingsError::Zero { field });
    }
    Ok(value)
}

fn limit(value: Option<u32>, default: u32, field: &'static str) -> Result<u32, SettingsError> {
    let limit = value.unwrap_or(default);
    positive(u64::from(limit), field)?;
    Ok(limit)
}

fn window(value: Option<u64>, field: &'static str) -> Result<Duration, SettingsError> {
    positive(value.unwrap_or(DEFAULT_RATE_WINDOW_SECS), field).map(Duration::from_secs)
}

fn parse_url(value: &str, field: &'static str) -> Result<Url, SettingsError> {
    Url::parse(value).map_err(|err| SettingsError::Url {
        field,
        message: err.to_string(),
    })
}

impl ServerSettings {
    /// Return the listen address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value is not `host:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: value.to_owned(),
            message: err.to_string(),
        })
    }

    /// Build the connection pool configuration.
    ///
    /// # Errors
    ///
    /// Fails when no database URL is configured or the pool size is zero.
    pub fn pool_config(&self) -> Result<PoolConfig, SettingsError> {
        let url = self
            .database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)?;
        let max_size = self.db_pool_max_size.unwrap_or(DEFAULT_POOL_MAX_SIZE);
        positive(u64::from(max_size), "db_pool_max_size")?;
        Ok(PoolConfig::new(url).with_max_size(max_size))
    }

    /// Return the session signing secret, falling back to [`DEV_JWT_SECRET`].
    pub fn jwt_secret(&self) -> &str {
        self.jwt_secret
            .as_deref()
            .filter(|secret| !secret.is_empty())
            .unwrap_or(DEV_JWT_SECRET)
    }

    /// Whether the development signing secret is in use.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret() == DEV_JWT_SECRET
    }

    /// Whether rate-limited requests are admitted when the counter store fails.
    pub fn rate_limit_fail_open(&self) -> bool {
        self.rate_limit_fail_open.unwrap_or(true)
    }

    /// Whether embedded migrations run at startup.
    pub fn run_migrations(&self) -> bool {
        self.run_migrations.unwrap_or(false)
    }

    pub fn jwt_audience(&self) -> &str {
        self.jwt_audience.as_deref().unwrap_or(DEFAULT_JWT_AUDIENCE)
    }

    /// Return the mail provider endpoint, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::Url`] when the value does not parse.
    pub fn mail_api_url(&self) -> Result<Option<Url>, SettingsError> {
        self.mail_api_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .map(|url| parse_url(url, "mail_api_url"))
            .transpose()
    }

    pub fn mail_api_key(&self) -> &str {
        self.mail_api_key.as_deref().unwrap_or_default()
    }

    pub fn mail_from(&self) -> &str {
        self.mail_from.as_deref().unwrap_or(DEFAULT_MAIL_FROM)
    }

    /// Return the period of the expired-row sweep.
    pub fn cleanup_interval(&self) -> Duration {
        let secs = self
            .cleanup_interval_secs
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_CLEANUP_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    /// Derive the tunables handed to the HTTP layer.
    ///
    /// # Errors
    ///
    /// Fails when a limit, window or TTL is zero, or the magic link base is
    /// not an absolute URL.
    pub fn http_state_settings(&self) -> Result<HttpStateSettings, SettingsError> {
        let access_limit = RateLimitPolicy::new(
            limit(self.access_rate_limit, DEFAULT_ACCESS_RATE_LIMIT, "access_rate_limit")?,
            window(self.access_rate_window_secs, "access_rate_window_secs")?,
        );
        let booking_limit = RateLimitPolicy::new(
            limit(self.booking_rate_limit, DEFAULT_BOOKING_RATE_LIMIT, "booking_rate_limit")?,
            window(self.booking_rate_window_secs, "booking_rate_window_secs")?,
        );
        let ttl_secs = positive(
            self.guest_session_ttl_secs
                .unwrap_or(DEFAULT_GUEST_SESSION_TTL_SECS),
            "guest_session_ttl_secs",
        )?;
        let session_ttl = TimeDelta::try_seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX))
            .unwrap_or(TimeDelta::MAX);
        let magic_link_base = parse_url(
            self.magic_link_base
                .as_deref()
                .unwrap_or(DEFAULT_MAGIC_LINK_BASE),
            "magic_link_base",
        )?;

        Ok(HttpStateSettings {
            access_limit,
            booking_limit,
            rate_limit_fail_open: self.rate_limit_fail_open(),
            guest_access: GuestAccessSettings {
                session_ttl,
                magic_link_base: magic_link_base.into(),
            },
            code_hasher: AccessCodeHasher::standard(),
        })
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for server settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 17] = [
        "RIDEBOOK_BIND_ADDR",
        "RIDEBOOK_DATABASE_URL",
        "RIDEBOOK_DB_POOL_MAX_SIZE",
        "RIDEBOOK_JWT_SECRET",
        "RIDEBOOK_JWT_AUDIENCE",
        "RIDEBOOK_GUEST_SESSION_TTL_SECS",
        "RIDEBOOK_ACCESS_RATE_LIMIT",
        "RIDEBOOK_ACCESS_RATE_WINDOW_SECS",
        "RIDEBOOK_BOOKING_RATE_LIMIT",
        "RIDEBOOK_BOOKING_RATE_WINDOW_SECS",
        "RIDEBOOK_RATE_LIMIT_FAIL_OPEN",
        "RIDEBOOK_MAGIC_LINK_BASE",
        "RIDEBOOK_MAIL_API_URL",
        "RIDEBOOK_MAIL_API_KEY",
        "RIDEBOOK_MAIL_FROM",
        "RIDEBOOK_CLEANUP_INTERVAL_SECS",
        "RIDEBOOK_RUN_MIGRATIONS",
    ];

    fn env_with(overrides: &[(&str, &str)]) -> [(&'static str, Option<String>); 17] {
        VARS.map(|name| {
            let value = overrides
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| (*value).to_owned());
            (name, value)
        })
    }

    fn load_from_empty_args() -> ServerSettings {
        ServerSettings::load_from_iter([OsString::from("backend")]).expect("config should load")
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(env_with(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("bind addr"),
            "0.0.0.0:8080".parse::<SocketAddr>().expect("addr")
        );
        assert_eq!(
            settings.pool_config().expect_err("url required"),
            SettingsError::MissingDatabaseUrl
        );
        assert!(settings.uses_dev_secret());
        assert_eq!(settings.jwt_audience(), "ridebook-api");
        assert!(settings.rate_limit_fail_open());
        assert!(!settings.run_migrations());
        assert_eq!(settings.mail_api_url().expect("no url"), None);
        assert_eq!(settings.mail_from(), "no-reply@ridebook.local");
        assert_eq!(settings.cleanup_interval(), Duration::from_secs(600));

        let http = settings.http_state_settings().expect("defaults are valid");
        assert_eq!(http.access_limit, RateLimitPolicy::new(5, Duration::from_secs(60)));
        assert_eq!(http.booking_limit, RateLimitPolicy::new(30, Duration::from_secs(60)));
        assert_eq!(http.guest_access.session_ttl, TimeDelta::minutes(30));
        assert_eq!(
            http.guest_access.magic_link_base,
            "http://localhost:5173/guest/access/magic"
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("RIDEBOOK_BIND_ADDR", "127.0.0.1:9000"),
            ("RIDEBOOK_DATABASE_URL", "postgres://localhost/ridebook"),
            ("RIDEBOOK_JWT_SECRET", "s3cret"),
            ("RIDEBOOK_ACCESS_RATE_LIMIT", "3"),
            ("RIDEBOOK_GUEST_SESSION_TTL_SECS", "600"),
            ("RIDEBOOK_MAIL_API_URL", "https://mail.example.com/v1/email"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(settings.bind_addr().expect("bind addr").port(), 9000);
        assert_eq!(
            settings.pool_config().expect("pool").database_url(),
            "postgres://localhost/ridebook"
        );
        assert!(!settings.uses_dev_secret());
        assert_eq!(settings.jwt_secret(), "s3cret");
        assert_eq!(
            settings
                .mail_api_url()
                .expect("valid url")
                .map(String::from),
            Some("https://mail.example.com/v1/email".to_owned())
        );

        let http = settings.http_state_settings().expect("valid");
        assert_eq!(http.access_limit, RateLimitPolicy::new(3, Duration::from_secs(60)));
        assert_eq!(http.guest_access.session_ttl, TimeDelta::minutes(10));
    }

    #[rstest]
    #[case::zero_limit("RIDEBOOK_BOOKING_RATE_LIMIT", "0")]
    #[case::zero_window("RIDEBOOK_ACCESS_RATE_WINDOW_SECS", "0")]
    #[case::zero_ttl("RIDEBOOK_GUEST_SESSION_TTL_SECS", "0")]
    #[case::relative_link("RIDEBOOK_MAGIC_LINK_BASE", "/guest/access/magic")]
    fn invalid_tunables_are_rejected(#[case] name: &'static str, #[case] value: &str) {
        let _guard = lock_env(env_with(&[(name, value)]));

        let settings = load_from_empty_args();
        assert!(settings.http_state_settings().is_err());
    }

    #[rstest]
    fn boolean_switches_follow_the_environment() {
        let _guard = lock_env(env_with(&[
            ("RIDEBOOK_RATE_LIMIT_FAIL_OPEN", "false"),
            ("RIDEBOOK_RUN_MIGRATIONS", "true"),
        ]));

        let settings = load_from_empty_args();
        assert!(!settings.rate_limit_fail_open());
        assert!(settings.run_migrations());
        let http = settings.http_state_settings().expect("valid");
        assert!(!http.rate_limit_fail_open);
    }

    #[rstest]
    fn malformed_bind_address_is_reported() {
        let _guard = lock_env(env_with(&[("RIDEBOOK_BIND_ADDR", "localhost")]));

        let settings = load_from_empty_args();
        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::BindAddr { .. })
        ));
    }
}
