//! Request types for HTTP handlers.

mod images;

pub use images::*;
