use std::str::FromStr;

use imagevault_store::{ListFilter, RetrieveMode};
use serde::{Deserialize, Serialize};

use crate::handler::{ErrorKind, Result};

/// Path parameters naming a single image. Keys may contain `/`.
#[must_use]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePathParams {
    pub key: String,
}

/// Query parameters for listing images.
///
/// `limit` is kept as text so that malformed values produce a precise
/// message instead of a generic deserialization error.
#[must_use]
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ListImagesQuery {
    pub prefix: Option<String>,
    pub limit: Option<String>,
}

impl ListImagesQuery {
    /// Builds the storage filter. An empty `limit` is treated as absent.
    pub fn into_filter(self) -> Result<ListFilter> {
        let mut filter = ListFilter::new();

        if let Some(prefix) = self.prefix {
            filter = filter.with_prefix(prefix);
        }

        if let Some(limit) = self.limit.as_deref().filter(|l| !l.is_empty()) {
            let limit = limit.trim().parse::<i64>().map_err(|_| {
                ErrorKind::BadRequest.with_message("'limit' must be an integer.")
            })?;
            filter = filter.with_max_results(limit)?;
        }

        Ok(filter)
    }
}

/// Query parameters for retrieving an image.
#[must_use]
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RetrieveQuery {
    pub mode: Option<String>,
}

impl RetrieveQuery {
    /// Parses the mode case-insensitively, defaulting to `view`.
    pub fn mode(&self) -> Result<RetrieveMode> {
        match self.mode.as_deref() {
            None => Ok(RetrieveMode::default()),
            Some(mode) => RetrieveMode::from_str(mode).map_err(|_| {
                ErrorKind::BadRequest
                    .with_message("Invalid 'mode' parameter. Must be 'view' or 'download'.")
            }),
        }
    }
}
