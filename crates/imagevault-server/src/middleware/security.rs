//! Security middleware: CORS, upload size limit and response hardening.

use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::http::header::{self, HeaderValue};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;

/// Default values for configuration options.
mod defaults {
    pub const MAX_UPLOAD_SIZE_MB: usize = 16;
    pub const CORS_MAX_AGE_SECS: u64 = 3600;

    /// Origins allowed when none are configured.
    pub const DEV_ORIGINS: &[&str] = &[
        "http://localhost:3000",
        "http://localhost:5000",
        "http://localhost:5173",
        "http://127.0.0.1:3000",
        "http://127.0.0.1:5000",
    ];
}

const BYTES_PER_MB: usize = 1024 * 1024;

/// Extension trait for `axum::`[`Router`] to apply security middleware.
pub trait RouterSecurityExt<S> {
    /// Layers CORS rules, the request body limit and `nosniff`.
    fn with_security(self, config: &SecurityConfig) -> Self;

    /// Layers security middleware with default configuration.
    fn with_default_security(self) -> Self;
}

impl<S> RouterSecurityExt<S> for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_security(self, config: &SecurityConfig) -> Self {
        let cors = &config.cors;
        let cors_layer = CorsLayer::new()
            .allow_origin(cors.to_header_values())
            .allow_methods([Method::GET, Method::POST, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
            .expose_headers([header::CONTENT_DISPOSITION])
            .allow_credentials(cors.allow_credentials)
            .max_age(cors.max_age());

        self.layer(DefaultBodyLimit::max(config.max_upload_size()))
            .layer(cors_layer)
            .layer(SetResponseHeaderLayer::overriding(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
    }

    fn with_default_security(self) -> Self {
        self.with_security(&SecurityConfig::default())
    }
}

/// Security settings for the HTTP surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct SecurityConfig {
    /// Maximum request body size for uploads in megabytes.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "MAX_UPLOAD_SIZE_MB", default_value_t = defaults::MAX_UPLOAD_SIZE_MB)
    )]
    pub max_upload_size_mb: usize,

    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(flatten)]
    pub cors: CorsConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_upload_size_mb: defaults::MAX_UPLOAD_SIZE_MB,
            cors: CorsConfig::default(),
        }
    }
}

impl SecurityConfig {
    /// Sets the upload limit in megabytes.
    pub fn with_max_upload_size_mb(mut self, megabytes: usize) -> Self {
        self.max_upload_size_mb = megabytes;
        self
    }

    /// Returns the upload limit in bytes.
    pub fn max_upload_size(&self) -> usize {
        self.max_upload_size_mb.saturating_mul(BYTES_PER_MB)
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct CorsConfig {
    /// List of allowed CORS origins.
    ///
    /// If empty, defaults to localhost origins for development.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "CORS_ALLOWED_ORIGINS", value_delimiter = ',')
    )]
    pub allowed_origins: Vec<String>,

    /// Maximum age for CORS preflight requests in seconds.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "CORS_MAX_AGE", default_value_t = defaults::CORS_MAX_AGE_SECS)
    )]
    pub max_age_seconds: u64,

    /// Whether to allow credentials in CORS requests.
    #[cfg_attr(
        feature = "config",
        arg(long, env = "CORS_ALLOW_CREDENTIALS", default_value = "false")
    )]
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_age_seconds: defaults::CORS_MAX_AGE_SECS,
            allow_credentials: false,
        }
    }
}

impl CorsConfig {
    /// Returns the CORS max age as a Duration.
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_seconds)
    }

    /// Converts configured origins to header values, falling back to
    /// localhost origins for development. Unparseable origins are skipped.
    pub fn to_header_values(&self) -> Vec<HeaderValue> {
        if self.allowed_origins.is_empty() {
            defaults::DEV_ORIGINS
                .iter()
                .copied()
                .map(HeaderValue::from_static)
                .collect()
        } else {
            self.allowed_origins
                .iter()
                .filter_map(|origin| origin.trim().parse().ok())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::multipart::{MultipartForm, Part};
    use serde_json::Value;

    use super::*;
    use crate::handler::routes;
    use crate::handler::test::create_test_state;

    #[test]
    fn falls_back_to_dev_origins() {
        let origins = CorsConfig::default().to_header_values();
        assert!(origins.contains(&HeaderValue::from_static("http://localhost:3000")));
    }

    #[test]
    fn skips_invalid_origins() {
        let config = CorsConfig {
            allowed_origins: vec!["https://app.example.com".into(), "bad\norigin".into()],
            ..CorsConfig::default()
        };
        assert_eq!(config.to_header_values().len(), 1);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() -> anyhow::Result<()> {
        let (state, backend) = create_test_state().await?;
        let config = SecurityConfig::default().with_max_upload_size_mb(1);
        let app = routes().with_security(&config).with_state(state);
        let server = axum_test::TestServer::new(app)?;

        let payload = vec![0_u8; 2 * BYTES_PER_MB];
        let form = MultipartForm::new().add_part(
            "file",
            Part::bytes(payload).file_name("huge.png").mime_type("image/png"),
        );

        let response = server.post("/images/upload").multipart(form).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["message"],
            "Uploaded file exceeds the maximum allowed size."
        );
        assert_eq!(backend.object_count("test-images").await, 0);

        Ok(())
    }

    #[tokio::test]
    async fn sets_nosniff() -> anyhow::Result<()> {
        let (state, _) = create_test_state().await?;
        let app = routes().with_default_security().with_state(state);
        let server = axum_test::TestServer::new(app)?;

        let response = server.get("/health").await;
        assert_eq!(response.header(header::X_CONTENT_TYPE_OPTIONS), "nosniff");

        Ok(())
    }
}
