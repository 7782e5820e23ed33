//! Kranes Market API - marketplace backend.
//!
//! Serves the JSON API under `/api` on port 4000 by default.
//!
//! # Architecture
//!
//! - Axum router with per-request ids and HTTP tracing
//! - Flat JSON files in `DATA_DIR` for products, users, orders, returns and analytics
//! - Remote product feed (Fake Store API) merged with the local inventory overlay
//! - HS256 bearer tokens for customers and admins

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::borrow::Cow;

use kranes_api::{ApiConfig, AppState, build_router, initialize};
use sentry::integrations::tracing::{self as sentry_tracing, EventFilter};
use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "kranes_api=info,tower_http=debug";

/// Start Sentry when a DSN is configured. The guard flushes on drop.
fn start_sentry(config: &ApiConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_deref()?;
    let options = sentry::ClientOptions {
        release: sentry::release_name!(),
        environment: config.sentry_environment.clone().map(Cow::Owned),
        attach_stacktrace: true,
        ..Default::default()
    };

    let guard = sentry::init((dsn, options));
    tracing::info!("Sentry error reporting enabled");
    Some(guard)
}

/// Warnings and errors become Sentry events; info and debug become breadcrumbs.
fn sentry_filter(metadata: &tracing::Metadata<'_>) -> EventFilter {
    let level = *metadata.level();
    if level <= Level::WARN {
        EventFilter::Event
    } else if level <= Level::DEBUG {
        EventFilter::Breadcrumb
    } else {
        EventFilter::Ignore
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let config = ApiConfig::from_env().expect("Invalid API configuration");

    // Sentry has to exist before the subscriber so its layer can forward events.
    let _sentry = start_sentry(&config);
    init_tracing();

    let addr = config.socket_addr();
    let data_dir = config.data_dir.clone();

    let state = AppState::new(config).expect("Failed to build catalog client");
    initialize(&state)
        .await
        .expect("Failed to prepare data directory");
    tracing::info!(data_dir = %data_dir.display(), "Data directory ready");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .unwrap_or_else(|e| panic!("Cannot bind {addr}: {e}"));
    tracing::info!("kranes-api listening on http://{addr}");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .expect("HTTP server failed");
}

/// Resolve on Ctrl+C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Cannot listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }

    tracing::info!("Shutting down, draining open connections");
}
