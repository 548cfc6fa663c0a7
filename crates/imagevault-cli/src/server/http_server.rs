//! HTTP server startup.

use std::future::IntoFuture;

use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::{ServerError, ServerResult, serve_with_shutdown, shutdown_signal};
use crate::TRACING_TARGET_SERVER_STARTUP;
use crate::config::ServerConfig;

/// Binds to the configured address and serves `app` until a shutdown
/// signal arrives.
///
/// On SIGINT or SIGTERM, `shutdown` is cancelled so in-flight store calls
/// abort, the listener stops accepting connections, and open requests get
/// up to the configured shutdown timeout to finish.
pub async fn serve(
    app: Router,
    server_config: &ServerConfig,
    shutdown: CancellationToken,
) -> ServerResult<()> {
    let server_addr = server_config.server_addr();

    let listener = TcpListener::bind(server_addr).await.map_err(|err| {
        tracing::error!(
            target: TRACING_TARGET_SERVER_STARTUP,
            addr = %server_addr,
            error = %err,
            "Failed to bind to address"
        );
        ServerError::bind_error(server_addr, err)
    })?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        addr = %server_addr,
        "Server is ready and listening for connections"
    );

    let signal = shutdown_signal(shutdown.clone());
    let shutdown_timeout = server_config.shutdown_timeout();

    serve_with_shutdown(server_config, shutdown, shutdown_timeout, move || {
        axum::serve(listener, app)
            .with_graceful_shutdown(signal)
            .into_future()
    })
    .await
}
