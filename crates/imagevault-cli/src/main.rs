#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use imagevault_server::handler::routes;
use imagevault_server::middleware::{RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt};
use imagevault_server::service::{ServiceConfig, ServiceState};
use tokio_util::sync::CancellationToken;

use crate::config::{Cli, MiddlewareConfig};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "imagevault_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "imagevault_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "imagevault_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = format!("{error:#}"),
            "application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log();
    cli.validate()?;

    let shutdown = CancellationToken::new();
    let state = create_service_state(&cli.service, shutdown.clone()).await?;
    let router = create_router(state, &cli.middleware);

    server::serve(router, &cli.server, shutdown).await?;

    Ok(())
}

/// Connects to the object store and builds the service state.
async fn create_service_state(
    config: &ServiceConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<ServiceState> {
    ServiceState::from_config(config, shutdown)
        .await
        .context("failed to initialize image storage")
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Recovery (outermost) - catches panics and enforces timeouts
/// 2. Observability - request IDs and tracing spans
/// 3. Security - CORS, body limit
/// 4. Routes (innermost) - actual request handlers
fn create_router(state: ServiceState, middleware: &MiddlewareConfig) -> Router {
    routes()
        .with_state(state)
        .with_security(&middleware.security)
        .with_observability()
        .with_recovery(&middleware.recovery)
}
