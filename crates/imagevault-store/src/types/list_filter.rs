//! Enumeration filters.

use std::num::NonZeroU32;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Optional key prefix and result cap for [`ImageStorage::enumerate`].
///
/// [`ImageStorage::enumerate`]: crate::ImageStorage::enumerate
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    prefix: Option<String>,
    max_results: Option<NonZeroU32>,
}

impl ListFilter {
    /// Creates a filter matching every key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts results to keys starting with `prefix`. An empty prefix
    /// matches every key.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// Caps the number of results. Zero, negative, and out-of-range values
    /// are rejected.
    pub fn with_max_results(mut self, max_results: i64) -> Result<Self> {
        let max_results = u32::try_from(max_results)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| Error::validation("'limit' must be a positive integer."))?;

        self.max_results = Some(max_results);
        Ok(self)
    }

    /// Returns the key prefix.
    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the result cap.
    #[inline]
    pub fn max_results(&self) -> Option<u32> {
        self.max_results.map(NonZeroU32::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_prefix_matches_everything() {
        let filter = ListFilter::new().with_prefix("");
        assert_eq!(filter.prefix(), None);
        assert_eq!(ListFilter::new().with_prefix("2025").prefix(), Some("2025"));
    }

    #[test]
    fn max_results_must_be_positive() {
        assert_eq!(ListFilter::new().with_max_results(5).unwrap().max_results(), Some(5));
        for bad in [0, -1, i64::from(u32::MAX) + 1] {
            let err = ListFilter::new().with_max_results(bad).unwrap_err();
            assert_eq!(err.message(), "'limit' must be a positive integer.");
        }
    }
}
