//! Extractors converting axum rejections into the JSON error type.

pub mod enhanced_multipart;
pub mod enhanced_path;
pub mod enhanced_query;

pub use self::enhanced_multipart::Multipart;
pub(crate) use self::enhanced_multipart::multipart_error;
pub use self::enhanced_path::Path;
pub use self::enhanced_query::Query;
