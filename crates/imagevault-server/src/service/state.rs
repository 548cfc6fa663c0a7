//! Application state and dependency injection.

use std::time::Duration;

use imagevault_store::{CallContext, ImageStorage, Result};
use tokio_util::sync::CancellationToken;

use crate::service::ServiceConfig;

/// Per-request cancellation and deadline source.
///
/// Every [`CallContext`] it hands out is a child of the process shutdown
/// token, so in-flight store calls abort when the server stops.
#[derive(Debug, Clone)]
pub struct RequestScope {
    shutdown: CancellationToken,
    operation_timeout: Duration,
}

impl RequestScope {
    /// Creates a scope bound to `shutdown`.
    pub fn new(shutdown: CancellationToken, operation_timeout: Duration) -> Self {
        Self {
            shutdown,
            operation_timeout,
        }
    }

    /// Returns a fresh context for one request.
    pub fn context(&self) -> CallContext {
        CallContext::child_of(&self.shutdown).with_timeout(self.operation_timeout)
    }
}

/// Application state.
///
/// Used for the [`State`] extraction (dependency injection).
///
/// [`State`]: axum::extract::State
#[must_use = "state does nothing unless you use it"]
#[derive(Debug, Clone)]
pub struct ServiceState {
    storage: ImageStorage,
    scope: RequestScope,
}

impl ServiceState {
    /// Initializes application state from configuration.
    ///
    /// Connects to the object store and provisions the bucket.
    pub async fn from_config(config: &ServiceConfig, shutdown: CancellationToken) -> Result<Self> {
        let storage = config.connect_storage().await?;
        Ok(Self::new(storage, shutdown))
    }

    /// Builds state around an already constructed storage.
    pub fn new(storage: ImageStorage, shutdown: CancellationToken) -> Self {
        let scope = RequestScope::new(shutdown, storage.config().operation_timeout());
        Self { storage, scope }
    }

    /// Returns the image storage.
    #[inline]
    pub fn storage(&self) -> &ImageStorage {
        &self.storage
    }
}

macro_rules! impl_di {
    ($($f:ident: $t:ty),+) => {$(
        impl axum::extract::FromRef<ServiceState> for $t {
            fn from_ref(state: &ServiceState) -> Self {
                state.$f.clone()
            }
        }
    )+};
}

impl_di!(storage: ImageStorage);
impl_di!(scope: RequestScope);
