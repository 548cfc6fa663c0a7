//! Convenience re-exports.

pub use crate::backend::ObjectBackend;
pub use crate::types::{ListFilter, Metadata, RetrieveMode, Retrieved, Upload};
pub use crate::{CallContext, Error, ErrorKind, ImageStorage, Result, StoreConfig};
