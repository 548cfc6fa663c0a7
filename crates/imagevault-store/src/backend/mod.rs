//! Object-store protocol consumed by [`ImageStorage`].
//!
//! [`ObjectBackend`] is the narrow set of native calls the storage layer
//! needs. Implementations report a missing bucket or object as
//! [`BackendError::NotFound`] and everything else as
//! [`BackendError::Service`]; deciding what a miss *means* is left to the
//! caller.
//!
//! [`ImageStorage`]: crate::ImageStorage

#[cfg(any(test, feature = "memory"))]
#[cfg_attr(docsrs, doc(cfg(feature = "memory")))]
mod memory;
mod s3;

use std::collections::HashMap;
use std::error::Error as StdError;

use bytes::Bytes;
use jiff::Timestamp;

#[cfg(any(test, feature = "memory"))]
pub use self::memory::{MemoryBackend, Operation};
pub use self::s3::S3Backend;
use crate::BoxedError;

/// Result type for backend calls.
pub type BackendResult<T, E = BackendError> = std::result::Result<T, E>;

/// Failure reported by an [`ObjectBackend`] call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The bucket or object does not exist.
    #[error("{0} does not exist")]
    NotFound(String),

    /// Any other failure of the store or its transport.
    #[error("{operation} failed: {source}")]
    Service {
        /// Name of the native call that failed.
        operation: &'static str,
        /// Underlying client error.
        #[source]
        source: BoxedError,
    },
}

impl BackendError {
    /// Creates a not-found error for the named resource.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// Creates a service error for the named operation.
    pub fn service(
        operation: &'static str,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Service {
            operation,
            source: Box::new(source),
        }
    }

    /// Returns whether the bucket or object was missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// An object as returned by the bulk list call (no custom metadata).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedObject {
    pub key: String,
    pub size_bytes: u64,
    pub last_modified: Timestamp,
}

/// Object attributes returned by a head call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectHead {
    pub size_bytes: u64,
    pub last_modified: Timestamp,
    pub content_type: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Object attributes plus the full payload.
#[derive(Debug, Clone)]
pub struct ObjectBody {
    pub head: ObjectHead,
    pub data: Bytes,
}

/// A single write request.
#[derive(Debug, Clone)]
pub struct PutObject {
    pub key: String,
    pub data: Bytes,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

/// Native object-store calls, all keyed by bucket name.
///
/// Implementations must be safe to share between concurrent request
/// handlers; [`ImageStorage`] holds one behind an `Arc` and never locks
/// around calls.
///
/// [`ImageStorage`]: crate::ImageStorage
#[async_trait::async_trait]
pub trait ObjectBackend: Send + Sync + 'static {
    /// Short identifier used in logs (e.g. "s3", "memory").
    fn name(&self) -> &'static str;

    /// Probes for bucket existence.
    async fn head_bucket(&self, bucket: &str) -> BackendResult<()>;

    /// Creates the bucket.
    async fn create_bucket(&self, bucket: &str) -> BackendResult<()>;

    /// Writes an object, replacing any object stored under the same key.
    async fn put_object(&self, bucket: &str, object: PutObject) -> BackendResult<()>;

    /// Lists objects, optionally filtered by key prefix and capped in count.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        max_keys: Option<u32>,
    ) -> BackendResult<Vec<ListedObject>>;

    /// Fetches object attributes and custom metadata.
    async fn head_object(&self, bucket: &str, key: &str) -> BackendResult<ObjectHead>;

    /// Fetches object attributes and the payload.
    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<ObjectBody>;

    /// Deletes an object. Stores commonly report success for missing keys.
    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<()>;
}
