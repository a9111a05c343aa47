//! HTTP front door of the broker.
//!
//! This module is organized into submodules:
//! - `microsoft` - login and callback redirect endpoints
//! - `health` - Health check endpoint (/healthz)
//! - `openapi` - OpenAPI/Utoipa configuration (served at /api-docs)

pub mod health;
pub mod microsoft;
pub mod openapi;

pub use health::MISC_TAG;
pub use microsoft::MICROSOFT_TAG;

use std::future::{Future, IntoFuture};
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};
use utoipa_redoc::{Redoc, Servable};

use crate::AppState;
use crate::config::AppConfig;
use crate::error::ServerError;

/// Assembles all routes, the API docs and the request logger.
pub fn build_router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(openapi::ApiDoc::openapi())
        .merge(microsoft::router(state))
        .routes(routes!(health::health))
        .layer(TraceLayer::new_for_http())
        .split_for_parts();

    router.merge(Redoc::with_url("/api-docs", api))
}

/// Binds the configured address and serves until SIGINT/SIGTERM.
#[tracing::instrument(skip_all, fields(addr = %config.bind_address))]
pub async fn start_webserver(state: AppState, config: &AppConfig) -> Result<(), ServerError> {
    let listener = TcpListener::bind(&config.bind_address)
        .await
        .map_err(|source| ServerError::Bind {
            addr: config.bind_address.clone(),
            source,
        })?;

    match listener.local_addr() {
        Ok(addr) => tracing::info!(%addr, "listening"),
        Err(e) => tracing::warn!(error = %e, "listening on unknown address"),
    }

    serve(
        listener,
        build_router(state),
        shutdown_signal(),
        config.shutdown_grace(),
    )
    .await
}

/// Serves `router` until `shutdown` resolves, then drains in-flight requests.
///
/// New connections are refused as soon as `shutdown` resolves. Requests still
/// running after `grace` are dropped and [`ServerError::ShutdownTimeout`] is
/// returned.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
    grace: Duration,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let mut graceful_rx = shutdown_tx.subscribe();
    let mut deadline_rx = shutdown_tx.subscribe();

    tokio::spawn(async move {
        shutdown.await;
        tracing::info!("Server is shutting down gracefully...");
        if shutdown_tx.send(()).is_err() {
            tracing::error!("Failed to send shutdown signal");
        }
    });

    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            graceful_rx.recv().await.ok();
        })
        .into_future();

    let deadline = async move {
        if deadline_rx.recv().await.is_err() {
            std::future::pending::<()>().await;
        }
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = server => result.map_err(ServerError::Serve),
        () = deadline => Err(ServerError::ShutdownTimeout(grace)),
    }
}

/// Resolves on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT (Ctrl+C)"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }
}
