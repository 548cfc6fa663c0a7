use imagevault_store::{ImageStorage, Result, StoreConfig};
#[cfg(feature = "config")]
use clap::Args;
use serde::{Deserialize, Serialize};

/// App [`state`] configuration.
///
/// [`state`]: crate::service::ServiceState
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "config", derive(Args))]
#[must_use = "config does nothing unless you use it"]
pub struct ServiceConfig {
    /// Object store connection.
    #[cfg_attr(feature = "config", command(flatten))]
    #[serde(flatten)]
    pub store: StoreConfig,

    /// Serve from an in-process store instead of S3. Data is lost on exit.
    #[cfg(feature = "memory")]
    #[cfg_attr(
        feature = "config",
        arg(long = "memory-backend", env = "IMAGEVAULT_MEMORY_BACKEND", default_value_t = false)
    )]
    #[serde(default)]
    pub memory_backend: bool,
}

impl ServiceConfig {
    /// Creates a configuration for the given store.
    pub fn new(store: StoreConfig) -> Self {
        Self {
            store,
            #[cfg(feature = "memory")]
            memory_backend: false,
        }
    }

    /// Connects to the object store and provisions the bucket.
    pub async fn connect_storage(&self) -> Result<ImageStorage> {
        #[cfg(feature = "memory")]
        if self.memory_backend {
            let backend = imagevault_store::backend::MemoryBackend::new();
            return ImageStorage::with_backend(self.store.clone(), backend).await;
        }

        ImageStorage::connect(self.store.clone()).await
    }
}
