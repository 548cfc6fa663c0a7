//! Upload payloads.

use bytes::Bytes;

use super::Metadata;

/// Content type used when the client did not send one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// A single image upload, consumed by [`ImageStorage::store`].
///
/// [`ImageStorage::store`]: crate::ImageStorage::store
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
    pub metadata: Metadata,
}

impl Upload {
    /// Creates an upload with the default content type and no metadata.
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            filename: filename.into(),
            content_type: DEFAULT_CONTENT_TYPE.to_owned(),
            data: data.into(),
            metadata: Metadata::default(),
        }
    }

    /// Sets the content type. Blank values keep the default.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        if !content_type.trim().is_empty() {
            self.content_type = content_type;
        }
        self
    }

    /// Sets the metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Returns the payload size in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns whether the payload is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_octet_stream() {
        let upload = Upload::new("a.png", &b"abc"[..]).with_content_type("  ");
        assert_eq!(upload.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(upload.len(), 3);
        assert!(upload.metadata.is_empty());
    }

    #[test]
    fn keeps_supplied_content_type() {
        let upload = Upload::new("a.png", Vec::new()).with_content_type("image/png");
        assert_eq!(upload.content_type, "image/png");
        assert!(upload.is_empty());
    }
}
