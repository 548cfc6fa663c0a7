//! Generated object keys.
//!
//! Keys have the form `{YYYYMMDDHHMMSS}-{sanitized filename}` with the
//! timestamp taken in UTC at store time. Two uploads of the same sanitized
//! filename within one second produce the same key and the later write
//! replaces the earlier one.

use derive_more::{AsRef, Deref, Display};
use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Key format for the timestamp prefix.
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Key of a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(Display, Deref, AsRef, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Generates the key for `filename` uploaded at `now`.
    ///
    /// Fails with a validation error when nothing of the filename survives
    /// sanitization.
    pub fn generate(filename: &str, now: Timestamp) -> Result<Self> {
        let sanitized = sanitize_filename(filename);
        if sanitized.is_empty() {
            return Err(Error::validation(format!(
                "Filename '{filename}' contains no usable characters."
            )));
        }

        Ok(Self(format!("{}-{sanitized}", now.strftime(TIMESTAMP_FORMAT))))
    }

    /// Returns the key as a string slice.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key, returning the inner string.
    #[inline]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<ObjectKey> for String {
    fn from(key: ObjectKey) -> Self {
        key.0
    }
}

/// Reduces a client-supplied filename to a safe single path segment.
///
/// Drops non-ASCII characters, turns path separators and whitespace runs
/// into `_`, removes anything outside `[A-Za-z0-9_.-]` and trims leading or
/// trailing dots and underscores. The extension survives.
pub fn sanitize_filename(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = ascii.split_whitespace().collect::<Vec<_>>().join("_");
    let safe: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    safe.trim_matches(|c| c == '.' || c == '_').to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_second(secs).unwrap()
    }

    #[test]
    fn key_prefix_is_utc_timestamp() {
        // 2025-01-01T00:00:00Z
        let key = ObjectKey::generate("photo.png", at(1_735_689_600)).unwrap();
        assert_eq!(key.as_str(), "20250101000000-photo.png");
    }

    #[test]
    fn same_second_same_name_collides() {
        let now = at(1_735_689_600);
        let first = ObjectKey::generate("a.png", now).unwrap();
        let second = ObjectKey::generate("a.png", now).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn strips_path_components_and_unsafe_characters() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(sanitize_filename("C:\\Users\\me\\cat.jpg"), "C_Users_me_cat.jpg");
        assert_eq!(sanitize_filename("my holiday  photo.png"), "my_holiday_photo.png");
        assert_eq!(sanitize_filename("weird$name!.gif"), "weirdname.gif");
        assert_eq!(sanitize_filename("résumé.png"), "rsum.png");
        assert_eq!(sanitize_filename(".hidden"), "hidden");
    }

    #[test]
    fn unusable_filename_is_validation_error() {
        let err = ObjectKey::generate("../..", at(0)).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Validation);
        assert!(sanitize_filename("日本語").is_empty());
    }

    #[test]
    fn serializes_as_plain_string() {
        let key = ObjectKey::generate("a.png", at(0)).unwrap();
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"19700101000000-a.png\"");
    }
}
