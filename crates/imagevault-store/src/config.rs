//! Object store connection configuration.

use std::fmt;
use std::net::Ipv4Addr;
use std::time::Duration;

#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::{Error, Result};

/// Default values for configuration options.
mod defaults {
    /// Bucket used by the local emulator setup.
    pub const BUCKET_NAME: &str = "image-storage-bucket";

    /// LocalStack edge endpoint.
    pub const ENDPOINT_URL: &str = "http://localhost:4566";

    pub const REGION: &str = "us-east-1";

    /// Emulator credentials.
    pub const ACCESS_KEY_ID: &str = "test";
    pub const SECRET_ACCESS_KEY: &str = "test";

    /// Per-call deadline in seconds.
    pub const OPERATION_TIMEOUT_SECS: u64 = 30;
}

/// Upper bound for [`StoreConfig::operation_timeout`], in seconds.
const MAX_OPERATION_TIMEOUT_SECS: u64 = 300;

/// Connection settings for the S3-compatible store.
///
/// # Environment Variables
///
/// - `S3_BUCKET_NAME` - Bucket holding the images (default: image-storage-bucket)
/// - `S3_ENDPOINT_URL` - Endpoint override; empty targets AWS (default: http://localhost:4566)
/// - `AWS_REGION` - Region name (default: us-east-1)
/// - `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` - Static credentials (default: test/test)
/// - `S3_OPERATION_TIMEOUT` - Per-call deadline in seconds (default: 30, max: 300)
#[derive(Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct StoreConfig {
    /// Name of the bucket holding the images.
    #[cfg_attr(
        feature = "config",
        arg(long = "s3-bucket-name", env = "S3_BUCKET_NAME", default_value = defaults::BUCKET_NAME)
    )]
    pub bucket_name: String,

    /// Endpoint override for emulators and self-hosted stores.
    #[cfg_attr(
        feature = "config",
        arg(long = "s3-endpoint-url", env = "S3_ENDPOINT_URL", default_value = defaults::ENDPOINT_URL)
    )]
    #[serde(default)]
    pub endpoint_url: String,

    /// Region the bucket lives in.
    #[cfg_attr(
        feature = "config",
        arg(long = "aws-region", env = "AWS_REGION", default_value = defaults::REGION)
    )]
    pub region: String,

    /// Access key identifier.
    #[cfg_attr(
        feature = "config",
        arg(long = "aws-access-key-id", env = "AWS_ACCESS_KEY_ID", default_value = defaults::ACCESS_KEY_ID, hide_env_values = true)
    )]
    pub access_key_id: String,

    /// Secret access key.
    #[cfg_attr(
        feature = "config",
        arg(long = "aws-secret-access-key", env = "AWS_SECRET_ACCESS_KEY", default_value = defaults::SECRET_ACCESS_KEY, hide_env_values = true)
    )]
    #[serde(skip_serializing)]
    pub secret_access_key: String,

    /// Deadline for a single store call in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long = "s3-operation-timeout", env = "S3_OPERATION_TIMEOUT", default_value_t = defaults::OPERATION_TIMEOUT_SECS)
    )]
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout: u64,
}

fn default_operation_timeout() -> u64 {
    defaults::OPERATION_TIMEOUT_SECS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bucket_name: defaults::BUCKET_NAME.to_owned(),
            endpoint_url: defaults::ENDPOINT_URL.to_owned(),
            region: defaults::REGION.to_owned(),
            access_key_id: defaults::ACCESS_KEY_ID.to_owned(),
            secret_access_key: defaults::SECRET_ACCESS_KEY.to_owned(),
            operation_timeout: defaults::OPERATION_TIMEOUT_SECS,
        }
    }
}

impl StoreConfig {
    /// Creates a configuration for the given bucket with default connection settings.
    pub fn new(bucket_name: impl Into<String>) -> Self {
        Self {
            bucket_name: bucket_name.into(),
            ..Self::default()
        }
    }

    /// Sets the endpoint override. An empty string targets AWS.
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    /// Sets the region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// Sets the static credentials.
    pub fn with_credentials(
        mut self,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        self.access_key_id = access_key_id.into();
        self.secret_access_key = secret_access_key.into();
        self
    }

    /// Sets the per-call deadline in seconds.
    pub fn with_operation_timeout(mut self, secs: u64) -> Self {
        self.operation_timeout = secs;
        self
    }

    /// Returns the per-call deadline.
    #[inline]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout)
    }

    /// Returns the parsed endpoint override, or `None` when targeting AWS.
    pub fn endpoint(&self) -> Result<Option<Url>> {
        let raw = self.endpoint_url.trim();
        if raw.is_empty() {
            return Ok(None);
        }

        let url = Url::parse(raw).map_err(|e| {
            Error::config(format!("S3 endpoint URL '{raw}' is not a valid URL")).with_source(e)
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "S3 endpoint URL must use http or https, got '{}'",
                url.scheme()
            )));
        }

        Ok(Some(url))
    }

    /// Returns the address an object is reachable at.
    ///
    /// Path-style against the endpoint override, virtual-hosted against AWS.
    pub fn object_url(&self, key: &str) -> Result<String> {
        let url = match self.endpoint()? {
            Some(endpoint) => format!(
                "{}/{}/{key}",
                endpoint.as_str().trim_end_matches('/'),
                self.bucket_name
            ),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{key}",
                self.bucket_name, self.region
            ),
        };
        Ok(url)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        validate_bucket_name(&self.bucket_name)?;

        if self.region.trim().is_empty() {
            return Err(Error::config("AWS region cannot be empty"));
        }

        if self.access_key_id.is_empty() || self.secret_access_key.is_empty() {
            return Err(Error::config("AWS credentials cannot be empty"));
        }

        self.endpoint()?;

        if self.operation_timeout == 0 || self.operation_timeout > MAX_OPERATION_TIMEOUT_SECS {
            return Err(Error::config(format!(
                "S3 operation timeout must be between 1 and {MAX_OPERATION_TIMEOUT_SECS} seconds"
            )));
        }

        Ok(())
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("bucket_name", &self.bucket_name)
            .field("endpoint_url", &self.endpoint_url)
            .field("region", &self.region)
            .field("access_key_id", &mask(&self.access_key_id))
            .field("secret_access_key", &"****")
            .field("operation_timeout", &self.operation_timeout)
            .finish()
    }
}

/// Keeps the first four characters of a credential.
fn mask(value: &str) -> String {
    let visible: String = value.chars().take(4).collect();
    if visible.len() == value.len() {
        "****".to_owned()
    } else {
        format!("{visible}****")
    }
}

fn validate_bucket_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| Error::config(format!("Invalid bucket name '{name}': {reason}"));

    if !(3..=63).contains(&name.len()) {
        return Err(invalid("must be between 3 and 63 characters"));
    }

    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'.')
    {
        return Err(invalid(
            "only lowercase letters, digits, hyphens and dots are allowed",
        ));
    }

    let edges_ok = |b: Option<u8>| b.is_some_and(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if !edges_ok(name.bytes().next()) || !edges_ok(name.bytes().last()) {
        return Err(invalid("must start and end with a letter or digit"));
    }

    if name.contains("..") {
        return Err(invalid("must not contain consecutive dots"));
    }

    if name.parse::<Ipv4Addr>().is_ok() {
        return Err(invalid("must not be formatted as an IP address"));
    }

    Ok(())
}
