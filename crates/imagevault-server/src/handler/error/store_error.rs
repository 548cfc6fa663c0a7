//! Conversion of storage errors into HTTP errors.

use imagevault_store::ErrorKind as StoreErrorKind;

use crate::TRACING_TARGET_HANDLER;
use crate::handler::{Error, ErrorKind};

impl From<imagevault_store::Error> for Error<'static> {
    fn from(error: imagevault_store::Error) -> Self {
        match error.kind() {
            StoreErrorKind::Validation => {
                tracing::debug!(target: TRACING_TARGET_HANDLER, error = %error, "Rejected request");
                ErrorKind::BadRequest.with_message(error.message().to_owned())
            }
            StoreErrorKind::NotFound => {
                tracing::debug!(target: TRACING_TARGET_HANDLER, key = error.key(), "Image not found");
                ErrorKind::NotFound.with_message(error.message().to_owned())
            }
            StoreErrorKind::Infrastructure | StoreErrorKind::Config => {
                let source = std::error::Error::source(&error).map(ToString::to_string);
                tracing::error!(
                    target: TRACING_TARGET_HANDLER,
                    error = %error,
                    source = source.as_deref(),
                    "Storage operation failed"
                );
                ErrorKind::InternalServerError.with_context(error.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;

    #[test]
    fn validation_maps_to_bad_request_with_message() {
        let error: Error = imagevault_store::Error::validation("Metadata must be a JSON object.").into();
        assert_eq!(error.kind(), ErrorKind::BadRequest);
        assert_eq!(error.message(), Some("Metadata must be a JSON object."));
    }

    #[test]
    fn not_found_keeps_key_message() {
        let error: Error = imagevault_store::Error::not_found("a.png").into();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert_eq!(error.message(), Some("Image not found with key: a.png"));
        assert_eq!(error.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn infrastructure_detail_stays_internal() {
        let error: Error =
            imagevault_store::Error::infrastructure("Cannot access bucket 'secret-bucket'").into();
        assert_eq!(error.kind(), ErrorKind::InternalServerError);
        assert_eq!(error.message(), None);
        assert!(error.context().is_some_and(|c| c.contains("secret-bucket")));
    }
}
