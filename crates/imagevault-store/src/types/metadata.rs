//! User-supplied key/value metadata.

use std::collections::{BTreeMap, HashMap};

use derive_more::{Deref, DerefMut};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// String-to-string metadata attached to an image.
///
/// Keys and values are stored as given. S3 transports metadata in HTTP
/// headers, so some stores lowercase the keys on the way back.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[derive(Deref, DerefMut, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<String, String>);

impl Metadata {
    /// Creates empty metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Parses a JSON object into metadata.
    ///
    /// String values are kept as-is; any other value is stored as its JSON
    /// text (`42`, `true`, `null`, `{"a":1}`).
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw).map_err(|e| {
            Error::validation("Metadata must be a valid JSON string.").with_source(e)
        })?;

        let Value::Object(map) = value else {
            return Err(Error::validation("Metadata must be a JSON object."));
        };

        let entries = map
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect();

        Ok(Self(entries))
    }

    /// Consumes the metadata, returning the inner map.
    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<HashMap<String, String>> for Metadata {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl From<Metadata> for HashMap<String, String> {
    fn from(metadata: Metadata) -> Self {
        metadata.0.into_iter().collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Metadata
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
