//! Request extractors with JSON rejections.
//!
//! - [`Path`] - path parameters
//! - [`Query`] - query string parameters
//! - [`Multipart`] - `multipart/form-data` bodies

pub mod reject;

pub(crate) use crate::extract::reject::multipart_error;
pub use crate::extract::reject::{Multipart, Path, Query};
