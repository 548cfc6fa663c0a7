//! Retrieval modes.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// What [`ImageStorage::retrieve`] returns for a key.
///
/// [`ImageStorage::retrieve`]: crate::ImageStorage::retrieve
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(AsRefStr, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum RetrieveMode {
    /// Attributes and metadata only.
    #[default]
    View,
    /// Raw bytes with content type.
    Download,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(RetrieveMode::from_str("view").unwrap(), RetrieveMode::View);
        assert_eq!(RetrieveMode::from_str("DOWNLOAD").unwrap(), RetrieveMode::Download);
        assert_eq!(RetrieveMode::from_str("View").unwrap(), RetrieveMode::View);
        assert!(RetrieveMode::from_str("stream").is_err());
        assert!(RetrieveMode::from_str("").is_err());
    }

    #[test]
    fn defaults_to_view() {
        assert_eq!(RetrieveMode::default(), RetrieveMode::View);
        assert_eq!(RetrieveMode::Download.to_string(), "download");
    }
}
