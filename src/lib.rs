//! FamEduConnect backend and messaging core.
//!
//! Two disjoint halves live in this crate:
//!
//! - the **HTTP surface** ([`routes`], [`security`], [`rate_limit`],
//!   [`validation`]) served by [`start_server`];
//! - the **messaging state model** ([`store`], [`presentation`]) plus the
//!   dashboard, grades and mock data that sit next to it in a viewer session.
//!
//! The message store is owned by one session and is never shared with the
//! HTTP state.
//!
//! # Configuration
//!
//! | Variable | Default |
//! |---|---|
//! | `PORT` | `3000` |
//! | `NODE_ENV` | `development` |
//! | `FIREBASE_PROJECT_ID` / `FIREBASE_API_KEY` | unset |
//! | `CORS_ORIGINS` | local dev server + production origins |
//! | `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_SECS` | `100` / `900` |
//! | `BODY_LIMIT_BYTES` | 10 MiB |
//!
//! Run the server with `RUST_LOG=fameduconnect=debug cargo run`, then probe it
//! with `cargo run --bin probe`.

use std::any::Any;
use std::net::SocketAddr;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use tokio::{net::TcpListener, signal};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod config;
pub mod dashboard;
pub mod error;
pub mod grades;
pub mod mock;
pub mod models;
pub mod presentation;
pub mod rate_limit;
pub mod routes;
pub mod security;
pub mod state;
pub mod store;
pub mod validation;

use config::Config;
use state::AppState;

/// Wrap `routes` with the fallback and the full middleware stack.
///
/// Outermost first: tracing, security headers, CORS, rate limit, body limit,
/// panic catcher.
pub fn build_router(state: AppState, routes: Router<AppState>) -> Router {
    let expose_details = state.config.environment.exposes_error_details();

    let router = routes
        .fallback(routes::not_found_handler)
        .layer(CatchPanicLayer::custom(move |err: Box<dyn Any + Send + 'static>| {
            security::panic_response(err, expose_details)
        }))
        .layer(DefaultBodyLimit::max(state.config.body_limit_bytes))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::enforce,
        ))
        .layer(security::cors_layer(&state.config.cors_origins))
        .with_state(state);

    security::with_security_headers(router).layer(TraceLayer::new_for_http())
}

pub fn app(state: AppState) -> Router {
    build_router(state, routes::routes())
}

pub async fn start_server() -> anyhow::Result<()> {
    info!("Loading configuration...");
    let config = Config::load();
    let address = SocketAddr::from(([0, 0, 0, 0], config.port));
    let environment = config.environment.clone();

    let state = AppState::new(config);
    let app = app(state);

    let listener = TcpListener::bind(address).await?;
    info!("FamEduConnect backend listening on http://{address}");
    info!("Environment: {environment}");
    info!("Security: headers, CORS, rate limiting enabled");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install terminate handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
