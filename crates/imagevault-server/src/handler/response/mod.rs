//! Response types for HTTP handlers.

mod error_response;
mod monitors;

use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

pub use error_response::ErrorResponse;
pub use monitors::{HealthStatus, MonitorStatus};

/// Marker value of the success envelope.
pub const SUCCESS: &str = "success";

/// Envelope wrapping every successful JSON response:
/// `{"status": "success", "data": ...}`.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub status: String,
    pub data: T,
}

impl<T> Envelope<T> {
    /// Wraps `data` in a success envelope.
    pub fn success(data: T) -> Self {
        Self {
            status: SUCCESS.to_owned(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
