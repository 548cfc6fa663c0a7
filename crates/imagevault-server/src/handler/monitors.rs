//! Health check handler.
//!
//! Reports liveness together with whether the configured bucket answers a
//! probe.

use axum::Json;
use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use imagevault_store::ImageStorage;
use jiff::Timestamp;

use crate::handler::response::{HealthStatus, MonitorStatus};
use crate::service::{RequestScope, ServiceState};

/// Tracing target for monitor operations.
const TRACING_TARGET: &str = "imagevault_server::handler::monitors";

#[tracing::instrument(skip_all)]
async fn health_status(
    State(storage): State<ImageStorage>,
    State(scope): State<RequestScope>,
) -> (StatusCode, Json<MonitorStatus>) {
    let probe = storage.check_bucket(&scope.context()).await;

    if let Err(err) = &probe {
        tracing::warn!(
            target: TRACING_TARGET,
            error = %err,
            bucket = storage.bucket_name(),
            "Bucket probe failed"
        );
    }

    let bucket_reachable = probe.is_ok();
    let (status, status_code) = if bucket_reachable {
        (HealthStatus::Healthy, StatusCode::OK)
    } else {
        (HealthStatus::Unhealthy, StatusCode::SERVICE_UNAVAILABLE)
    };

    let response = MonitorStatus {
        status,
        bucket_reachable,
        bucket: storage.bucket_name().to_owned(),
        backend: storage.backend_name().to_owned(),
        checked_at: Timestamp::now(),
    };

    tracing::debug!(
        target: TRACING_TARGET,
        status = %status,
        status_code = status_code.as_u16(),
        "Health status response prepared"
    );

    (status_code, Json(response))
}

/// Returns a [`Router`] with all health monitoring routes.
pub fn routes() -> Router<ServiceState> {
    Router::new().route("/health", get(health_status))
}

#[cfg(test)]
mod tests {
    use imagevault_store::backend::Operation;

    use super::*;
    use crate::handler::test::{create_test_server, create_test_server_with_backend};

    #[tokio::test]
    async fn healthy_when_bucket_reachable() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server.get("/health").await;
        response.assert_status_ok();

        let body = response.json::<MonitorStatus>();
        assert_eq!(body.status, HealthStatus::Healthy);
        assert!(body.bucket_reachable);
        assert_eq!(body.bucket, "test-images");
        assert_eq!(body.backend, "memory");

        Ok(())
    }

    #[tokio::test]
    async fn unhealthy_when_probe_fails() -> anyhow::Result<()> {
        let (server, backend) = create_test_server_with_backend().await?;
        backend.fail(Operation::HeadBucket);

        let response = server.get("/health").await;
        response.assert_status(StatusCode::SERVICE_UNAVAILABLE);

        let body = response.json::<MonitorStatus>();
        assert_eq!(body.status, HealthStatus::Unhealthy);
        assert!(!body.bucket_reachable);

        Ok(())
    }
}
