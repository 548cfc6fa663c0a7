//! Value types accepted and returned by [`ImageStorage`].
//!
//! [`ImageStorage`]: crate::ImageStorage

mod list_filter;
mod metadata;
mod object_key;
mod receipts;
mod retrieve_mode;
mod upload;

pub use list_filter::ListFilter;
pub use metadata::Metadata;
pub use object_key::{ObjectKey, sanitize_filename};
pub use receipts::{
    DeleteReceipt, DeleteStatus, ObjectContent, ObjectInfo, ObjectSummary, Retrieved,
    StoreReceipt,
};
pub use retrieve_mode::RetrieveMode;
pub use upload::{DEFAULT_CONTENT_TYPE, Upload};
