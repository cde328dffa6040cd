//! Backend entry-point: loads settings, wires PostgreSQL adapters, and serves
//! the booking API.

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use ridebook::inbound::http::health::HealthState;
use ridebook::outbound::persistence::{DbPool, run_pending_migrations};
use ridebook::server::{
    ServerConfig, ServerSettings, build_http_state, create_server, spawn_cleanup,
};

fn io_error(context: &str, err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(format!("{context}: {err}"))
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = ServerSettings::load().map_err(|e| io_error("invalid configuration", e))?;
    if settings.uses_dev_secret() {
        warn!("RIDEBOOK_JWT_SECRET is unset; signing sessions with the development secret");
    }

    let pool_config = settings
        .pool_config()
        .map_err(|e| io_error("invalid configuration", e))?;
    if settings.run_migrations() {
        run_pending_migrations(pool_config.database_url())
            .await
            .map_err(|e| io_error("migrations failed", e))?;
    }
    let pool = DbPool::new(pool_config)
        .await
        .map_err(|e| io_error("database pool", e.into_message()))?;

    let http_state =
        build_http_state(&settings, &pool).map_err(|e| io_error("server wiring", e))?;
    let bind_addr = settings
        .bind_addr()
        .map_err(|e| io_error("invalid configuration", e))?;
    let cleanup = spawn_cleanup(http_state.clone(), settings.cleanup_interval());

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state.clone(), ServerConfig::new(bind_addr, http_state))?;
    info!(%bind_addr, "booking API listening");

    let result = server.await;
    health_state.mark_unhealthy();
    cleanup.abort();
    result
}
