//! Image storage operations over an [`ObjectBackend`].

use std::fmt;
use std::sync::Arc;

use futures::{StreamExt, stream};
use jiff::Timestamp;
use tracing::{debug, error, info, instrument};

use crate::backend::{BackendError, ObjectBackend, PutObject, S3Backend};
use crate::types::{
    DEFAULT_CONTENT_TYPE, DeleteReceipt, ListFilter, ObjectContent, ObjectInfo, ObjectKey,
    ObjectSummary, RetrieveMode, Retrieved, StoreReceipt, Upload,
};
use crate::{
    CallContext, Error, Result, StoreConfig, TRACING_TARGET_BUCKETS, TRACING_TARGET_OBJECTS,
};

/// Number of metadata lookups in flight while enumerating.
const ELABORATION_CONCURRENCY: usize = 8;

/// Storage access for images held in a single bucket.
///
/// Cloning is cheap; all clones share the same backend connection. The
/// bucket is guaranteed to exist once construction succeeds.
#[derive(Clone)]
pub struct ImageStorage {
    backend: Arc<dyn ObjectBackend>,
    config: Arc<StoreConfig>,
    clock: fn() -> Timestamp,
}

impl ImageStorage {
    /// Connects to the configured S3-compatible store and provisions the
    /// bucket.
    pub async fn connect(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let backend = S3Backend::new(&config)?;
        Self::with_backend(config, backend).await
    }

    /// Uses an existing backend and provisions the bucket.
    ///
    /// The bucket is probed on every construction; a missing bucket is
    /// created, any other probe failure fails construction.
    #[instrument(skip_all, target = TRACING_TARGET_BUCKETS, fields(bucket = %config.bucket_name, backend = backend.name()))]
    pub async fn with_backend(config: StoreConfig, backend: impl ObjectBackend) -> Result<Self> {
        config.validate()?;

        let storage = Self {
            backend: Arc::new(backend),
            config: Arc::new(config),
            clock: Timestamp::now,
        };

        let ctx = CallContext::new().with_timeout(storage.config.operation_timeout());
        storage.ensure_bucket(&ctx).await?;
        Ok(storage)
    }

    /// Replaces the clock used to timestamp generated keys.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> Timestamp) -> Self {
        self.clock = clock;
        self
    }

    /// Returns the bucket name.
    #[inline]
    pub fn bucket_name(&self) -> &str {
        &self.config.bucket_name
    }

    /// Returns the store configuration.
    #[inline]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the backend identifier.
    #[inline]
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    async fn ensure_bucket(&self, ctx: &CallContext) -> Result<()> {
        let bucket = self.bucket_name();

        match ctx.run("head_bucket", self.backend.head_bucket(bucket)).await? {
            Ok(()) => {
                debug!(target: TRACING_TARGET_BUCKETS, bucket, "Bucket exists");
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                info!(target: TRACING_TARGET_BUCKETS, bucket, "Bucket not found, creating");
                ctx.run("create_bucket", self.backend.create_bucket(bucket))
                    .await?
                    .map_err(|err| {
                        Error::infrastructure(format!("Failed to create bucket '{bucket}'"))
                            .with_source(err)
                    })?;
                info!(target: TRACING_TARGET_BUCKETS, bucket, "Bucket created");
                Ok(())
            }
            Err(err) => {
                error!(target: TRACING_TARGET_BUCKETS, bucket, error = %err, "Bucket probe failed");
                Err(Error::infrastructure(format!("Cannot access bucket '{bucket}'")).with_source(err))
            }
        }
    }

    /// Probes bucket reachability without creating anything.
    #[instrument(skip_all, target = TRACING_TARGET_BUCKETS, fields(bucket = %self.config.bucket_name))]
    pub async fn check_bucket(&self, ctx: &CallContext) -> Result<()> {
        let bucket = self.bucket_name();
        ctx.run("head_bucket", self.backend.head_bucket(bucket))
            .await?
            .map_err(|err| {
                Error::infrastructure(format!("Cannot access bucket '{bucket}'")).with_source(err)
            })
    }

    /// Writes an upload under a freshly generated key.
    ///
    /// The key is `{YYYYMMDDHHMMSS}-{sanitized filename}`; an existing
    /// object under the same key is replaced.
    #[instrument(skip_all, target = TRACING_TARGET_OBJECTS, fields(filename = %upload.filename, size = upload.len()))]
    pub async fn store(&self, ctx: &CallContext, upload: Upload) -> Result<StoreReceipt> {
        if upload.filename.trim().is_empty() {
            return Err(Error::validation("No file selected for upload."));
        }

        let key = ObjectKey::generate(&upload.filename, (self.clock)())?;
        let url = self.config.object_url(&key)?;

        let object = PutObject {
            key: key.to_string(),
            data: upload.data,
            content_type: upload.content_type,
            metadata: upload.metadata.into(),
        };

        ctx.run("put_object", self.backend.put_object(self.bucket_name(), object))
            .await
            .and_then(|result| {
                result.map_err(|err| {
                    Error::infrastructure(format!("Failed to store image '{key}'")).with_source(err)
                })
            })
            .inspect_err(|err| log_failure(err))?;

        info!(target: TRACING_TARGET_OBJECTS, key = %key, "Image stored");
        Ok(StoreReceipt { key, url })
    }

    /// Lists images with their metadata.
    ///
    /// Entries whose metadata lookup fails (including objects deleted
    /// between the list and the lookup) are skipped. Order follows the
    /// store's listing.
    #[instrument(skip_all, target = TRACING_TARGET_OBJECTS, fields(prefix = filter.prefix(), max_results = filter.max_results()))]
    pub async fn enumerate(&self, ctx: &CallContext, filter: &ListFilter) -> Result<Vec<ObjectSummary>> {
        let bucket = self.bucket_name();

        let listed = ctx
            .run(
                "list_objects",
                self.backend
                    .list_objects(bucket, filter.prefix(), filter.max_results()),
            )
            .await
            .and_then(|result| {
                result.map_err(|err| Error::infrastructure("Failed to list images").with_source(err))
            })
            .inspect_err(|err| log_failure(err))?;

        let elaborated: Vec<_> = stream::iter(listed)
            .map(|object| async move {
                let head = ctx
                    .run("head_object", self.backend.head_object(bucket, &object.key))
                    .await;
                (object, head)
            })
            .buffered(ELABORATION_CONCURRENCY)
            .collect()
            .await;

        let mut summaries = Vec::with_capacity(elaborated.len());
        for (object, head) in elaborated {
            let head = match head {
                Ok(Ok(head)) => head,
                Ok(Err(err)) => {
                    debug!(target: TRACING_TARGET_OBJECTS, key = %object.key, error = %err, "Skipping entry");
                    continue;
                }
                Err(err) if ctx.is_cancelled() => return Err(err),
                Err(err) => {
                    debug!(target: TRACING_TARGET_OBJECTS, key = %object.key, error = %err, "Skipping entry");
                    continue;
                }
            };

            summaries.push(ObjectSummary {
                key: object.key,
                last_modified: object.last_modified,
                size_bytes: object.size_bytes,
                metadata: head.metadata.into(),
            });
        }

        debug!(target: TRACING_TARGET_OBJECTS, count = summaries.len(), "Images listed");
        Ok(summaries)
    }

    /// Fetches an image's attributes or its payload.
    #[instrument(skip_all, target = TRACING_TARGET_OBJECTS, fields(key = %key, mode = %mode))]
    pub async fn retrieve(&self, ctx: &CallContext, key: &str, mode: RetrieveMode) -> Result<Retrieved> {
        let bucket = self.bucket_name();

        let retrieved = match mode {
            RetrieveMode::View => {
                let head = ctx
                    .run("head_object", self.backend.head_object(bucket, key))
                    .await?
                    .map_err(|err| object_error(key, "retrieve", err))
                    .inspect_err(|err| log_failure(err))?;

                Retrieved::Info(ObjectInfo {
                    key: key.to_owned(),
                    last_modified: head.last_modified,
                    size_bytes: head.size_bytes,
                    content_type: head.content_type,
                    metadata: head.metadata.into(),
                })
            }
            RetrieveMode::Download => {
                let body = ctx
                    .run("get_object", self.backend.get_object(bucket, key))
                    .await?
                    .map_err(|err| object_error(key, "retrieve", err))
                    .inspect_err(|err| log_failure(err))?;

                Retrieved::Content(ObjectContent {
                    filename: key.to_owned(),
                    content_type: body
                        .head
                        .content_type
                        .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned()),
                    data: body.data,
                })
            }
        };

        Ok(retrieved)
    }

    /// Deletes an image after confirming it exists.
    #[instrument(skip_all, target = TRACING_TARGET_OBJECTS, fields(key = %key))]
    pub async fn remove(&self, ctx: &CallContext, key: &str) -> Result<DeleteReceipt> {
        let bucket = self.bucket_name();

        ctx.run("head_object", self.backend.head_object(bucket, key))
            .await?
            .map_err(|err| object_error(key, "delete", err))
            .inspect_err(|err| log_failure(err))?;

        ctx.run("delete_object", self.backend.delete_object(bucket, key))
            .await?
            .map_err(|err| object_error(key, "delete", err))
            .inspect_err(|err| log_failure(err))?;

        info!(target: TRACING_TARGET_OBJECTS, key, "Image deleted");
        Ok(DeleteReceipt::deleted(key))
    }
}

impl fmt::Debug for ImageStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageStorage")
            .field("backend", &self.backend.name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn object_error(key: &str, action: &str, err: BackendError) -> Error {
    if err.is_not_found() {
        Error::not_found(key)
    } else {
        Error::infrastructure(format!("Failed to {action} image '{key}'")).with_source(err)
    }
}

/// Callers own error-level reporting; the store only traces.
fn log_failure(err: &Error) {
    debug!(
        target: TRACING_TARGET_OBJECTS,
        error = %err,
        system_fault = err.is_system_fault(),
        "Store call failed"
    );
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use tracing::Level;
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};
    use tracing_subscriber::Registry;

    use super::*;
    use crate::backend::{MemoryBackend, Operation};
    use crate::{ErrorKind, Metadata};

    const BUCKET: &str = "images";

    /// 2025-01-01T00:00:00Z
    fn new_year() -> Timestamp {
        Timestamp::from_second(1_735_689_600).unwrap_or(Timestamp::UNIX_EPOCH)
    }

    /// 2025-01-02T00:00:00Z
    fn next_day() -> Timestamp {
        Timestamp::from_second(1_735_776_000).unwrap_or(Timestamp::UNIX_EPOCH)
    }

    fn config() -> StoreConfig {
        StoreConfig::new(BUCKET).with_endpoint_url("http://localhost:4566")
    }

    async fn storage(backend: &MemoryBackend) -> ImageStorage {
        ImageStorage::with_backend(config(), backend.clone())
            .await
            .unwrap()
            .with_clock(new_year)
    }

    fn ctx() -> CallContext {
        CallContext::new()
    }

    fn png(name: &str, data: &'static [u8]) -> Upload {
        Upload::new(name, Bytes::from_static(data)).with_content_type("image/png")
    }

    #[tokio::test]
    async fn construction_creates_missing_bucket() {
        let backend = MemoryBackend::new();
        assert!(!backend.has_bucket(BUCKET).await);

        storage(&backend).await;
        assert!(backend.has_bucket(BUCKET).await);

        // Second construction finds the bucket and succeeds.
        storage(&backend).await;
    }

    #[tokio::test]
    async fn construction_fails_when_probe_fails() {
        let backend = MemoryBackend::new();
        backend.fail(Operation::HeadBucket);

        let err = ImageStorage::with_backend(config(), backend).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }

    #[tokio::test]
    async fn construction_fails_when_create_fails() {
        let backend = MemoryBackend::new();
        backend.fail(Operation::CreateBucket);

        let err = ImageStorage::with_backend(config(), backend).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }

    #[tokio::test]
    async fn construction_rejects_invalid_config() {
        let err = ImageStorage::with_backend(StoreConfig::new("NO"), MemoryBackend::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[tokio::test]
    async fn photo_with_author_end_to_end() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;
        let metadata = Metadata::from_json_str(r#"{"author":"alice"}"#).unwrap();

        let receipt = storage
            .store(&ctx(), png("photo.png", b"\x89PNG\r\n").with_metadata(metadata.clone()))
            .await
            .unwrap();
        assert_eq!(receipt.key.as_str(), "20250101000000-photo.png");
        assert_eq!(
            receipt.url,
            "http://localhost:4566/images/20250101000000-photo.png"
        );

        let Retrieved::Info(info) = storage
            .retrieve(&ctx(), &receipt.key, RetrieveMode::View)
            .await
            .unwrap()
        else {
            panic!("view must return info");
        };
        assert_eq!(info.metadata, metadata);
        assert_eq!(info.size_bytes, 6);
        assert_eq!(info.content_type.as_deref(), Some("image/png"));

        let Retrieved::Content(content) = storage
            .retrieve(&ctx(), &receipt.key, RetrieveMode::Download)
            .await
            .unwrap()
        else {
            panic!("download must return content");
        };
        assert_eq!(content.data.as_ref(), b"\x89PNG\r\n");
        assert_eq!(content.content_type, "image/png");
        assert_eq!(content.filename, "20250101000000-photo.png");

        let listed = storage.enumerate(&ctx(), &ListFilter::new()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metadata, metadata);

        let receipt = storage.remove(&ctx(), &receipt.key).await.unwrap();
        assert_eq!(receipt, DeleteReceipt::deleted("20250101000000-photo.png"));

        for mode in [RetrieveMode::View, RetrieveMode::Download] {
            let err = storage
                .retrieve(&ctx(), "20250101000000-photo.png", mode)
                .await
                .unwrap_err();
            assert!(err.is_not_found());
        }

        let listed = storage.enumerate(&ctx(), &ListFilter::new()).await.unwrap();
        assert!(listed.iter().all(|s| s.key != "20250101000000-photo.png"));
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn same_second_uploads_overwrite() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;

        let first = storage.store(&ctx(), png("a.png", b"first")).await.unwrap();
        let second = storage.store(&ctx(), png("a.png", b"second")).await.unwrap();
        assert_eq!(first.key, second.key);
        assert_eq!(backend.object_count(BUCKET).await, 1);

        let Retrieved::Content(content) = storage
            .retrieve(&ctx(), &second.key, RetrieveMode::Download)
            .await
            .unwrap()
        else {
            panic!("download must return content");
        };
        assert_eq!(content.data.as_ref(), b"second");
    }

    #[tokio::test]
    async fn enumerate_filters_by_prefix_and_caps() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;
        storage.store(&ctx(), png("image_alpha.png", b"a")).await.unwrap();
        storage.store(&ctx(), png("other_beta.jpg", b"b")).await.unwrap();
        let storage = storage.with_clock(next_day);
        storage.store(&ctx(), png("image_gamma.png", b"c")).await.unwrap();

        let filter = ListFilter::new().with_prefix("20250101");
        let keys: Vec<_> = storage
            .enumerate(&ctx(), &filter)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.key)
            .collect();
        assert_eq!(
            keys,
            ["20250101000000-image_alpha.png", "20250101000000-other_beta.jpg"]
        );

        let filter = ListFilter::new().with_max_results(2).unwrap();
        assert_eq!(storage.enumerate(&ctx(), &filter).await.unwrap().len(), 2);

        let filter = ListFilter::new().with_prefix("nomatch");
        assert!(storage.enumerate(&ctx(), &filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn enumerate_reads_past_the_first_page() {
        let backend = MemoryBackend::new().with_page_size(2);
        let storage = storage(&backend).await;
        for name in ["a.png", "b.png", "c.png", "d.png", "e.png"] {
            storage.store(&ctx(), png(name, b"x")).await.unwrap();
        }

        let listed = storage.enumerate(&ctx(), &ListFilter::new()).await.unwrap();
        assert_eq!(listed.len(), 5);
        assert_eq!(listed[4].key, "20250101000000-e.png");
        assert_eq!(backend.list_pages(), 3);

        let filter = ListFilter::new().with_max_results(3).unwrap();
        let listed = storage.enumerate(&ctx(), &filter).await.unwrap();
        let keys: Vec<_> = listed.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "20250101000000-a.png",
                "20250101000000-b.png",
                "20250101000000-c.png"
            ]
        );
    }

    #[tokio::test]
    async fn enumerate_skips_entries_without_metadata() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;
        storage.store(&ctx(), png("a.png", b"a")).await.unwrap();
        storage.store(&ctx(), png("b.png", b"b")).await.unwrap();

        backend.fail_key(Operation::HeadObject, "20250101000000-a.png");
        let listed = storage.enumerate(&ctx(), &ListFilter::new()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].key, "20250101000000-b.png");
    }

    #[tokio::test]
    async fn enumerate_list_failure_is_infrastructure() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;
        backend.fail(Operation::ListObjects);

        let err = storage.enumerate(&ctx(), &ListFilter::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }

    #[derive(Clone, Default)]
    struct LevelCounter {
        errors: Arc<AtomicUsize>,
        store_debug: Arc<AtomicUsize>,
    }

    impl<S: tracing::Subscriber> Layer<S> for LevelCounter {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: layer::Context<'_, S>) {
            let metadata = event.metadata();
            if *metadata.level() == Level::ERROR {
                self.errors.fetch_add(1, Ordering::SeqCst);
            } else if *metadata.level() == Level::DEBUG
                && metadata.target() == TRACING_TARGET_OBJECTS
            {
                self.store_debug.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[tokio::test]
    async fn store_failures_are_traced_below_error_level() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;
        backend.fail(Operation::ListObjects);
        backend.fail(Operation::GetObject);

        let counter = LevelCounter::default();
        let _guard = tracing::subscriber::set_default(Registry::default().with(counter.clone()));

        storage.enumerate(&ctx(), &ListFilter::new()).await.unwrap_err();
        storage
            .retrieve(&ctx(), "a.png", RetrieveMode::Download)
            .await
            .unwrap_err();

        assert_eq!(counter.errors.load(Ordering::SeqCst), 0);
        assert!(counter.store_debug.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn missing_keys_are_not_found() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;

        for mode in [RetrieveMode::View, RetrieveMode::Download] {
            let err = storage.retrieve(&ctx(), "ghost.png", mode).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
            assert_eq!(err.key(), Some("ghost.png"));
            assert_eq!(err.message(), "Image not found with key: ghost.png");
        }

        let err = storage.remove(&ctx(), "ghost.png").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn store_failure_leaves_nothing_behind() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;
        backend.fail(Operation::PutObject);

        let err = storage.store(&ctx(), png("a.png", b"a")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(backend.object_count(BUCKET).await, 0);
    }

    #[tokio::test]
    async fn store_rejects_blank_and_unusable_filenames() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;

        let err = storage.store(&ctx(), png("", b"a")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "No file selected for upload.");

        let err = storage.store(&ctx(), png("../", b"a")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn head_failure_other_than_missing_is_infrastructure() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;
        let receipt = storage.store(&ctx(), png("a.png", b"a")).await.unwrap();
        backend.fail(Operation::HeadObject);

        let err = storage
            .retrieve(&ctx(), &receipt.key, RetrieveMode::View)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);

        let err = storage.remove(&ctx(), &receipt.key).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(backend.object_count(BUCKET).await, 1);
    }

    #[tokio::test]
    async fn cancelled_context_aborts_operations() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;
        let ctx = CallContext::new();
        ctx.cancellation().cancel();

        let err = storage.store(&ctx, png("a.png", b"a")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
        assert_eq!(backend.object_count(BUCKET).await, 0);

        let err = storage.enumerate(&ctx, &ListFilter::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Infrastructure);
    }

    #[tokio::test]
    async fn check_bucket_reports_reachability() {
        let backend = MemoryBackend::new();
        let storage = storage(&backend).await;
        storage.check_bucket(&ctx()).await.unwrap();

        backend.fail(Operation::HeadBucket);
        let err = storage.check_bucket(&ctx()).await.unwrap_err();
        assert!(err.is_system_fault());
    }
}
