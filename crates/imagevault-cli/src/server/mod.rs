//! HTTP server startup and lifecycle management.

mod error;
mod http_server;
mod lifecycle;
mod shutdown;

pub use self::error::{ServerError, ServerResult};
pub use self::http_server::serve;
use self::lifecycle::serve_with_shutdown;
use self::shutdown::shutdown_signal;
