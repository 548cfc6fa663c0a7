#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

// Tracing target constants for consistent logging
pub const TRACING_TARGET_CLIENT: &str = "imagevault_store::client";
pub const TRACING_TARGET_BUCKETS: &str = "imagevault_store::buckets";
pub const TRACING_TARGET_OBJECTS: &str = "imagevault_store::objects";

pub mod backend;
mod config;
mod context;
mod error;
mod storage;
pub mod types;

#[doc(hidden)]
pub mod prelude;

pub use crate::backend::{BackendError, ObjectBackend, S3Backend};
pub use crate::config::StoreConfig;
pub use crate::context::CallContext;
pub use crate::error::{BoxedError, Error, ErrorKind, Result};
pub use crate::storage::ImageStorage;
pub use crate::types::{
    DeleteReceipt, DeleteStatus, ListFilter, Metadata, ObjectContent, ObjectInfo, ObjectKey,
    ObjectSummary, RetrieveMode, Retrieved, StoreReceipt, Upload,
};
