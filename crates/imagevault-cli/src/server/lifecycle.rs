//! Server lifecycle management.

use std::future::Future;
use std::io;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::{ServerError, ServerResult};
use crate::config::ServerConfig;
use crate::{TRACING_TARGET_SERVER_SHUTDOWN, TRACING_TARGET_SERVER_STARTUP};

/// Drives the server future, bounding graceful shutdown by
/// `shutdown_timeout` once `shutdown` is cancelled.
pub async fn serve_with_shutdown<F>(
    server_config: &ServerConfig,
    shutdown: CancellationToken,
    shutdown_timeout: Duration,
    serve_fn: impl FnOnce() -> F,
) -> ServerResult<()>
where
    F: Future<Output = io::Result<()>>,
{
    let start_time = Instant::now();
    log_security_warnings(server_config);

    let drain_deadline = async {
        shutdown.cancelled().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    let result = tokio::select! {
        result = serve_fn() => result,
        () = drain_deadline => {
            tracing::warn!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                timeout_secs = shutdown_timeout.as_secs(),
                "Shutdown timeout elapsed, dropping open connections"
            );
            Ok(())
        }
    };

    handle_result(result, start_time)
}

/// Logs security warnings for potentially unsafe configurations.
fn log_security_warnings(config: &ServerConfig) {
    if config.binds_to_all_interfaces() {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Server bound to all interfaces - ensure firewall is configured"
        );
    }
}

/// Handles the server result and logs appropriate messages.
fn handle_result(result: io::Result<()>, start_time: Instant) -> ServerResult<()> {
    let uptime = start_time.elapsed();

    match result {
        Ok(()) => {
            tracing::info!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                uptime_secs = uptime.as_secs(),
                "Shutdown completed"
            );
            Ok(())
        }
        Err(err) => {
            let err = ServerError::Runtime(err);
            tracing::error!(
                target: TRACING_TARGET_SERVER_SHUTDOWN,
                error = %err,
                uptime_secs = uptime.as_secs(),
                suggestion = err.suggestion(),
                "Fatal error"
            );
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::pending;

    use super::*;

    #[tokio::test]
    async fn completes_when_server_completes() {
        let config = ServerConfig::default();
        let result = serve_with_shutdown(
            &config,
            CancellationToken::new(),
            Duration::from_secs(1),
            || async { Ok(()) },
        )
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn surfaces_runtime_errors() {
        let config = ServerConfig::default();
        let result = serve_with_shutdown(
            &config,
            CancellationToken::new(),
            Duration::from_secs(1),
            || async { Err(io::Error::other("test error")) },
        )
        .await;
        assert!(matches!(result, Err(ServerError::Runtime(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn stops_after_shutdown_timeout() {
        let config = ServerConfig::default();
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let result = serve_with_shutdown(&config, shutdown, Duration::from_secs(5), || {
            pending::<io::Result<()>>()
        })
        .await;
        assert!(result.is_ok());
    }
}
