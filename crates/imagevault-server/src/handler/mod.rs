//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use imagevault_server::handler::routes;
//! use imagevault_server::service::{ServiceConfig, ServiceState};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::default();
//! let state = ServiceState::from_config(&config, CancellationToken::new()).await?;
//! let app: axum::Router = routes().with_state(state);
//! # Ok(())
//! # }
//! ```
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod error;
mod images;
mod monitors;
pub mod request;
pub mod response;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub(crate) use crate::handler::response::ErrorResponse;
use crate::service::ServiceState;

#[inline]
async fn not_found() -> Response {
    ErrorKind::NotFound.into_response()
}

#[inline]
async fn method_not_allowed() -> Response {
    ErrorKind::MethodNotAllowed.into_response()
}

/// Returns a [`Router`] with all routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(images::routes())
        .merge(monitors::routes())
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
}

#[cfg(test)]
pub(crate) mod test {
    use axum::Router;
    use axum_test::TestServer;
    use imagevault_store::backend::MemoryBackend;
    use imagevault_store::{ImageStorage, StoreConfig};
    use jiff::Timestamp;
    use serde_json::json;
    use tokio_util::sync::CancellationToken;

    use crate::handler::routes;
    use crate::service::ServiceState;

    /// Bucket every test server provisions.
    pub const TEST_BUCKET: &str = "test-images";

    /// 2025-01-01T00:00:00Z
    fn new_year() -> Timestamp {
        Timestamp::from_second(1_735_689_600).unwrap_or(Timestamp::UNIX_EPOCH)
    }

    /// Returns a new [`TestServer`] with the given router and state.
    pub fn create_test_server_with_state(
        router: Router<ServiceState>,
        state: ServiceState,
    ) -> anyhow::Result<TestServer> {
        let app = router.with_state(state);
        let server = TestServer::new(app)?;
        Ok(server)
    }

    /// Returns a [`ServiceState`] over an in-memory store, together with the
    /// backend for failure injection.
    pub async fn create_test_state() -> anyhow::Result<(ServiceState, MemoryBackend)> {
        let backend = MemoryBackend::new();
        let storage = ImageStorage::with_backend(StoreConfig::new(TEST_BUCKET), backend.clone())
            .await?
            .with_clock(new_year);

        let state = ServiceState::new(storage, CancellationToken::new());
        Ok((state, backend))
    }

    /// Returns a new [`TestServer`] over an in-memory store, together with
    /// the backend for failure injection.
    pub async fn create_test_server_with_backend() -> anyhow::Result<(TestServer, MemoryBackend)>
    {
        let (state, backend) = create_test_state().await?;
        let server = create_test_server_with_state(routes(), state)?;
        Ok((server, backend))
    }

    /// Returns a new [`TestServer`] with the default router over an
    /// in-memory store.
    pub async fn create_test_server() -> anyhow::Result<TestServer> {
        let (server, _) = create_test_server_with_backend().await?;
        Ok(server)
    }

    #[tokio::test]
    async fn handlers() -> anyhow::Result<()> {
        let server = create_test_server().await?;
        assert!(server.is_running());
        Ok(())
    }

    #[tokio::test]
    async fn unknown_routes_are_json_404() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server.get("/nothing/here").await;
        response.assert_status_not_found();
        response.assert_json(&json!({
            "name": "not_found",
            "message": "The requested resource was not found",
            "status": 404,
        }));

        Ok(())
    }

    #[tokio::test]
    async fn wrong_method_is_json_405() -> anyhow::Result<()> {
        let server = create_test_server().await?;

        let response = server.put("/images/upload").await;
        response.assert_status(axum::http::StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.json::<serde_json::Value>()["status"], 405);

        Ok(())
    }
}
