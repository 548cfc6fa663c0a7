//! Storage layer error types.
//!
//! Every failure leaving [`ImageStorage`] carries one [`ErrorKind`]:
//!
//! - [`ErrorKind::Validation`]: caller-supplied input was malformed.
//! - [`ErrorKind::NotFound`]: the referenced key does not exist.
//! - [`ErrorKind::Infrastructure`]: the object store failed, was unreachable,
//!   or the call was cancelled or timed out.
//! - [`ErrorKind::Config`]: the store configuration was rejected at startup.
//!
//! [`ImageStorage`]: crate::ImageStorage

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use crate::backend::BackendError;

/// Type alias for boxed errors that are Send + Sync.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Specialized [`Result`] type for storage operations.
///
/// [`Result`]: std::result::Result
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kind enumeration for categorizing storage errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller input was malformed. Never retried, never a system fault.
    Validation,
    /// The referenced object does not exist.
    NotFound,
    /// The object store failed or could not be reached.
    Infrastructure,
    /// The store configuration is invalid.
    Config,
}

impl ErrorKind {
    /// Returns the error kind as a string for categorization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Infrastructure => "infrastructure",
            Self::Config => "config",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage error with structured information.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
#[must_use = "errors should be handled appropriately"]
pub struct Error {
    kind: ErrorKind,
    message: Cow<'static, str>,
    key: Option<String>,
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    #[inline]
    fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            key: None,
            source: None,
        }
    }

    /// Attaches a source error to this error.
    #[inline]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Creates a new validation error.
    #[inline]
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Creates a not-found error for the given object key.
    pub fn not_found(key: impl Into<String>) -> Self {
        let key = key.into();
        let mut error = Self::new(
            ErrorKind::NotFound,
            format!("Image not found with key: {key}"),
        );
        error.key = Some(key);
        error
    }

    /// Creates a new infrastructure error.
    #[inline]
    pub fn infrastructure(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Infrastructure, message)
    }

    /// Creates a new configuration error.
    #[inline]
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Creates an infrastructure error for a store call aborted by its caller.
    pub fn cancelled(operation: &'static str) -> Self {
        Self::infrastructure(format!("{operation} was cancelled"))
    }

    /// Creates an infrastructure error for a store call exceeding its deadline.
    pub fn timed_out(operation: &'static str, timeout: Duration) -> Self {
        Self::infrastructure(format!(
            "{operation} timed out after {}ms",
            timeout.as_millis()
        ))
    }

    /// Returns the error kind.
    #[must_use]
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the human-readable message.
    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the object key for not-found errors.
    #[must_use]
    #[inline]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Returns whether this error is a missing object.
    #[must_use]
    #[inline]
    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    /// Returns whether this error should be logged as a system fault.
    #[must_use]
    #[inline]
    pub fn is_system_fault(&self) -> bool {
        matches!(self.kind, ErrorKind::Infrastructure | ErrorKind::Config)
    }
}

impl From<BackendError> for Error {
    fn from(err: BackendError) -> Self {
        Error::infrastructure(err.to_string()).with_source(err)
    }
}
