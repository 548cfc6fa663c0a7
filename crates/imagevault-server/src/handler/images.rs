//! Image upload, listing, retrieval and deletion handlers.

use std::fmt::Write;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use bytes::Bytes;
use imagevault_store::{
    DeleteReceipt, ImageStorage, Metadata, ObjectSummary, Retrieved, StoreReceipt, Upload,
};

use crate::extract::{Multipart, Path, Query, multipart_error};
use crate::handler::request::{ImagePathParams, ListImagesQuery, RetrieveQuery};
use crate::handler::response::Envelope;
use crate::handler::{ErrorKind, Result};
use crate::service::{RequestScope, ServiceState};

/// Tracing target for image operations.
const TRACING_TARGET: &str = "imagevault_server::handler::images";

/// File part of an upload form.
struct FilePart {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

/// Uploads an image with optional metadata.
///
/// Form data:
/// - `file`: the image (filename and content type are taken from the part)
/// - `metadata`: optional JSON object of string values
#[tracing::instrument(skip_all)]
async fn upload_image(
    State(storage): State<ImageStorage>,
    State(scope): State<RequestScope>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Envelope<StoreReceipt>)> {
    let mut file = None;
    let mut metadata = None;

    while let Some(field) = multipart.next_part().await? {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let data = field.bytes().await.map_err(multipart_error)?;
                file = Some(FilePart {
                    filename,
                    content_type,
                    data,
                });
            }
            Some("metadata") => {
                metadata = Some(field.text().await.map_err(multipart_error)?);
            }
            other => {
                tracing::debug!(target: TRACING_TARGET, field = other, "Ignoring form field");
            }
        }
    }

    let file = file
        .ok_or_else(|| ErrorKind::BadRequest.with_message("Missing 'file' part in request."))?;

    if file.filename.is_empty() {
        return Err(ErrorKind::BadRequest.with_message("No file selected for upload."));
    }

    let metadata = match metadata {
        Some(raw) => Metadata::from_json_str(&raw)?,
        None => Metadata::default(),
    };

    tracing::debug!(
        target: TRACING_TARGET,
        filename = %file.filename,
        size = file.data.len(),
        metadata_entries = metadata.len(),
        "Processing upload"
    );

    let mut upload = Upload::new(file.filename, file.data).with_metadata(metadata);
    if let Some(content_type) = file.content_type {
        upload = upload.with_content_type(content_type);
    }

    let receipt = storage.store(&scope.context(), upload).await?;
    Ok((StatusCode::CREATED, Envelope::success(receipt)))
}

/// Lists images, optionally filtered by key prefix and capped by `limit`.
#[tracing::instrument(skip_all)]
async fn list_images(
    State(storage): State<ImageStorage>,
    State(scope): State<RequestScope>,
    Query(query): Query<ListImagesQuery>,
) -> Result<Envelope<Vec<ObjectSummary>>> {
    let filter = query.into_filter()?;
    let images = storage.enumerate(&scope.context(), &filter).await?;

    tracing::debug!(target: TRACING_TARGET, count = images.len(), "Listed images");
    Ok(Envelope::success(images))
}

/// Builds an `attachment` disposition for `filename`.
///
/// Printable ASCII names without quotes or backslashes are sent verbatim.
/// Anything else gets an ASCII fallback plus a percent-encoded `filename*`.
fn attachment_disposition(filename: &str) -> HeaderValue {
    let unsafe_char = |c: char| !(c == ' ' || c.is_ascii_graphic()) || c == '"' || c == '\\';

    let value = if filename.chars().any(unsafe_char) {
        let fallback: String = filename
            .chars()
            .map(|c| if unsafe_char(c) { '_' } else { c })
            .collect();
        format!(
            "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
            percent_encode(filename)
        )
    } else {
        format!("attachment; filename=\"{filename}\"")
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// Encodes everything outside the RFC 5987 `attr-char` set.
fn percent_encode(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            encoded.push(char::from(byte));
        } else {
            let _ = write!(encoded, "%{byte:02X}");
        }
    }
    encoded
}

/// Returns an image's metadata (`mode=view`, default) or its bytes
/// (`mode=download`).
#[tracing::instrument(skip_all, fields(key = %path_params.key))]
async fn retrieve_image(
    State(storage): State<ImageStorage>,
    State(scope): State<RequestScope>,
    Path(path_params): Path<ImagePathParams>,
    Query(query): Query<RetrieveQuery>,
) -> Result<Response> {
    let mode = query.mode()?;

    let response = match storage.retrieve(&scope.context(), &path_params.key, mode).await? {
        Retrieved::Info(info) => Envelope::success(info).into_response(),
        Retrieved::Content(content) => {
            let content_type = HeaderValue::from_str(&content.content_type)
                .unwrap_or(HeaderValue::from_static("application/octet-stream"));
            let disposition = attachment_disposition(&content.filename);

            tracing::debug!(
                target: TRACING_TARGET,
                size = content.data.len(),
                "Serving download"
            );

            (
                [
                    (header::CONTENT_TYPE, content_type),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                content.data,
            )
                .into_response()
        }
    };

    Ok(response)
}

/// Deletes an image.
#[tracing::instrument(skip_all, fields(key = %path_params.key))]
async fn delete_image(
    State(storage): State<ImageStorage>,
    State(scope): State<RequestScope>,
    Path(path_params): Path<ImagePathParams>,
) -> Result<Envelope<DeleteReceipt>> {
    let receipt = storage.remove(&scope.context(), &path_params.key).await?;
    Ok(Envelope::success(receipt))
}

/// Returns a [`Router`] with all image routes.
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .route("/images/upload", post(upload_image))
        .route("/images", get(list_images))
        .route("/images/", get(list_images))
        .route("/images/{*key}", get(retrieve_image).delete(delete_image))
}
