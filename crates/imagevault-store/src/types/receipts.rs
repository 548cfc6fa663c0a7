//! Results returned by storage operations.

use bytes::Bytes;
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Metadata, ObjectKey};

/// Outcome of a successful store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreReceipt {
    pub key: ObjectKey,
    /// Address the object is reachable at.
    pub url: String,
}

/// One entry of an enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    pub key: String,
    pub last_modified: Timestamp,
    pub size_bytes: u64,
    pub metadata: Metadata,
}

/// Attributes of a single object, without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub key: String,
    pub last_modified: Timestamp,
    pub size_bytes: u64,
    pub content_type: Option<String>,
    pub metadata: Metadata,
}

/// Payload of a single object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectContent {
    /// Suggested download filename (the key).
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

/// Result of [`ImageStorage::retrieve`], shaped by the requested mode.
///
/// [`ImageStorage::retrieve`]: crate::ImageStorage::retrieve
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieved {
    Info(ObjectInfo),
    Content(ObjectContent),
}

/// Status reported after a removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteStatus {
    Deleted,
}

/// Outcome of a successful removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReceipt {
    pub key: String,
    pub status: DeleteStatus,
}

impl DeleteReceipt {
    /// Creates a receipt for a deleted key.
    pub fn deleted(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            status: DeleteStatus::Deleted,
        }
    }
}
