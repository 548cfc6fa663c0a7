//! Middleware for `axum::Router` and HTTP request processing.
//!
//! - Security: CORS, upload body limit, `nosniff`
//! - Observability: request IDs and request tracing
//! - Recovery: panics and request timeouts become JSON 500 responses
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use axum::Router;
//! use imagevault_server::middleware::{
//!     RecoveryConfig, RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt,
//!     SecurityConfig,
//! };
//!
//! let app: Router = Router::new()
//!     .with_security(&SecurityConfig::default())
//!     .with_observability()
//!     .with_recovery(&RecoveryConfig::default());
//! ```

mod observability;
mod recovery;
mod security;

pub use observability::RouterObservabilityExt;
pub use recovery::{RecoveryConfig, RouterRecoveryExt};
pub use security::{CorsConfig, RouterSecurityExt, SecurityConfig};
