//! # cardvault
//!
//! Small web application for account signup, login and per-user credit-card
//! records.
//!
//! ## Architecture
//!
//! - **Store**: SQLite file with `users` and `credit_cards`, parameterized queries only
//! - **Auth**: Argon2id password hashes, minimal signup rules
//! - **Sessions**: opaque server-side tokens in an `HttpOnly` cookie
//! - **Audit**: security events appended to a text log alongside console tracing
//! - **HTTP**: Axum router with request IDs, tracing, and graceful shutdown

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

mod audit;
mod auth;
mod config;
mod http;
mod store;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use axum::serve;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::audit::audit_layer;
use crate::config::{AppConfig, Cli};
use crate::http::{router, AppState};
use crate::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::from_cli(cli).context("failed to load configuration")?;
    init_logging(&config.audit_log).context("failed to initialize logging")?;

    info!(
        bind = %config.bind,
        database = %config.database.display(),
        audit_log = %config.audit_log.display(),
        session_ttl = %humantime::format_duration(config.session_ttl),
        secure_cookies = config.secure_cookies,
        "configuration loaded"
    );

    let store = Store::open(&config.database).await.with_context(|| {
        format!("failed to open database {}", config.database.display())
    })?;

    let bind = config.bind;
    let state = AppState::new(store, Arc::new(config));
    let app = router(state);
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;

    let shutdown = tokio::signal::ctrl_c();
    info!(bind = %bind, "cardvault listening");

    serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown.await;
            info!("shutting down gracefully");
        })
        .await
        .context("server exited with error")
}

/// Console tracing with `RUST_LOG` env filter (default: `info`), plus the
/// audit file layer.
fn init_logging(audit_log: &Path) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(filter);
    let audit = audit_layer(audit_log)
        .with_context(|| format!("failed to open audit log {}", audit_log.display()))?;

    tracing_subscriber::registry()
        .with(console)
        .with(audit)
        .try_init()?;

    Ok(())
}
