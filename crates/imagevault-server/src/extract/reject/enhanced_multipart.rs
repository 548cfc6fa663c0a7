//! Multipart extractor rejecting with the JSON error type.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{FromRequest, Multipart as AxumMultipart, Request};
use axum::http::StatusCode;
use derive_more::{Deref, DerefMut, From};

use crate::TRACING_TARGET_EXTRACT;
use crate::handler::{Error, ErrorKind, Result};

/// Multipart form extractor with JSON rejections.
///
/// Body-limit overflows are reported as 400 with a size message rather
/// than axum's plain-text 413.
#[must_use]
#[derive(Debug, Deref, DerefMut, From)]
pub struct Multipart(pub AxumMultipart);

impl Multipart {
    /// Returns the inner Axum Multipart extractor.
    #[inline]
    pub fn into_inner(self) -> AxumMultipart {
        self.0
    }

    /// Yields the next field, mapping read failures to [`Error`].
    pub async fn next_part(&mut self) -> Result<Option<Field<'_>>> {
        self.0.next_field().await.map_err(multipart_error)
    }
}

impl<S> FromRequest<S> for Multipart
where
    S: Send + Sync,
{
    type Rejection = Error<'static>;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        AxumMultipart::from_request(req, state)
            .await
            .map(Multipart)
            .map_err(Into::into)
    }
}

impl From<MultipartRejection> for Error<'static> {
    fn from(rejection: MultipartRejection) -> Self {
        tracing::debug!(
            target: TRACING_TARGET_EXTRACT,
            error = %rejection,
            "Multipart extraction failed"
        );

        match rejection {
            MultipartRejection::InvalidBoundary(_) => ErrorKind::BadRequest
                .with_message("Request must be multipart/form-data with a valid boundary."),
            _ => ErrorKind::BadRequest
                .with_message("Invalid multipart request")
                .with_context(rejection.to_string()),
        }
    }
}

/// Maps an error raised while streaming multipart fields.
pub(crate) fn multipart_error(err: MultipartError) -> Error<'static> {
    tracing::debug!(
        target: TRACING_TARGET_EXTRACT,
        error = %err,
        "Failed to read multipart field"
    );

    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ErrorKind::BadRequest
            .with_message("Uploaded file exceeds the maximum allowed size.")
            .with_context(err.body_text())
    } else {
        ErrorKind::BadRequest
            .with_message("Invalid multipart data")
            .with_context(err.body_text())
    }
}
