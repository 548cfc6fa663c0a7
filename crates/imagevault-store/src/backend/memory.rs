//! In-process backend for tests and local development.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;
use jiff::Timestamp;
use tokio::sync::RwLock;

use super::{BackendError, BackendResult, ListedObject, ObjectBackend, ObjectBody, ObjectHead, PutObject};

/// Native call names used to inject failures into a [`MemoryBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    HeadBucket,
    CreateBucket,
    PutObject,
    ListObjects,
    HeadObject,
    GetObject,
    DeleteObject,
}

impl Operation {
    fn as_str(self) -> &'static str {
        match self {
            Self::HeadBucket => "head_bucket",
            Self::CreateBucket => "create_bucket",
            Self::PutObject => "put_object",
            Self::ListObjects => "list_objects",
            Self::HeadObject => "head_object",
            Self::GetObject => "get_object",
            Self::DeleteObject => "delete_object",
        }
    }
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    metadata: HashMap<String, String>,
    last_modified: Timestamp,
}

impl StoredObject {
    fn head(&self) -> ObjectHead {
        ObjectHead {
            size_bytes: self.data.len() as u64,
            last_modified: self.last_modified,
            content_type: Some(self.content_type.clone()),
            metadata: self.metadata.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Failures {
    operations: HashSet<Operation>,
    keys: HashSet<(Operation, String)>,
}

type Buckets = HashMap<String, BTreeMap<String, StoredObject>>;

/// [`ObjectBackend`] holding buckets in memory.
///
/// Clones share state. Keys are listed in lexicographic order, like S3,
/// and listing walks pages of [`MemoryBackend::with_page_size`] entries
/// when a page size is set. Individual calls can be made to fail with
/// [`MemoryBackend::fail`] and [`MemoryBackend::fail_key`].
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    buckets: Arc<RwLock<Buckets>>,
    failures: Arc<Mutex<Failures>>,
    page_size: Option<usize>,
    list_pages: Arc<AtomicUsize>,
}

impl MemoryBackend {
    /// Creates an empty backend with no buckets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the number of entries a single list page returns.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size.max(1));
        self
    }

    /// Returns how many list pages have been served so far.
    pub fn list_pages(&self) -> usize {
        self.list_pages.load(Ordering::Relaxed)
    }

    /// Makes every call of `operation` fail with a service error.
    pub fn fail(&self, operation: Operation) {
        self.failures().operations.insert(operation);
    }

    /// Makes calls of `operation` on `key` fail with a service error.
    pub fn fail_key(&self, operation: Operation, key: impl Into<String>) {
        self.failures().keys.insert((operation, key.into()));
    }

    /// Removes all injected failures.
    pub fn clear_failures(&self) {
        let mut failures = self.failures();
        failures.operations.clear();
        failures.keys.clear();
    }

    /// Returns whether the bucket exists.
    pub async fn has_bucket(&self, bucket: &str) -> bool {
        self.buckets.read().await.contains_key(bucket)
    }

    /// Returns the number of objects in the bucket.
    pub async fn object_count(&self, bucket: &str) -> usize {
        self.buckets
            .read()
            .await
            .get(bucket)
            .map_or(0, BTreeMap::len)
    }

    fn failures(&self) -> std::sync::MutexGuard<'_, Failures> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, operation: Operation, key: Option<&str>) -> BackendResult<()> {
        let failures = self.failures();
        let injected = failures.operations.contains(&operation)
            || key.is_some_and(|key| failures.keys.contains(&(operation, key.to_owned())));

        if injected {
            return Err(BackendError::service(
                operation.as_str(),
                std::io::Error::other("injected failure"),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn head_bucket(&self, bucket: &str) -> BackendResult<()> {
        self.check(Operation::HeadBucket, None)?;
        if self.has_bucket(bucket).await {
            Ok(())
        } else {
            Err(BackendError::not_found(bucket))
        }
    }

    async fn create_bucket(&self, bucket: &str) -> BackendResult<()> {
        self.check(Operation::CreateBucket, None)?;
        self.buckets
            .write()
            .await
            .entry(bucket.to_owned())
            .or_default();
        Ok(())
    }

    async fn put_object(&self, bucket: &str, object: PutObject) -> BackendResult<()> {
        self.check(Operation::PutObject, Some(&object.key))?;
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| BackendError::not_found(bucket))?;

        objects.insert(
            object.key,
            StoredObject {
                data: object.data,
                content_type: object.content_type,
                metadata: object.metadata,
                last_modified: Timestamp::now(),
            },
        );
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        max_keys: Option<u32>,
    ) -> BackendResult<Vec<ListedObject>> {
        self.check(Operation::ListObjects, None)?;
        let buckets = self.buckets.read().await;
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| BackendError::not_found(bucket))?;

        let cap = max_keys.map_or(usize::MAX, |n| n as usize);
        let mut listed: Vec<ListedObject> = Vec::new();

        loop {
            let remaining = cap - listed.len();
            if remaining == 0 {
                break;
            }
            let page_limit = self.page_size.map_or(remaining, |size| size.min(remaining));
            let start = listed
                .last()
                .map_or(Bound::Unbounded, |last| Bound::Excluded(last.key.as_str()));

            let mut page: Vec<_> = objects
                .range::<str, _>((start, Bound::Unbounded))
                .filter(|(key, _)| prefix.is_none_or(|p| key.starts_with(p)))
                .take(page_limit.saturating_add(1))
                .map(|(key, object)| ListedObject {
                    key: key.clone(),
                    size_bytes: object.data.len() as u64,
                    last_modified: object.last_modified,
                })
                .collect();
            self.list_pages.fetch_add(1, Ordering::Relaxed);

            let truncated = page.len() > page_limit;
            page.truncate(page_limit);
            listed.extend(page);

            if !truncated {
                break;
            }
        }

        Ok(listed)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> BackendResult<ObjectHead> {
        self.check(Operation::HeadObject, Some(key))?;
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(StoredObject::head)
            .ok_or_else(|| BackendError::not_found(format!("{bucket}/{key}")))
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<ObjectBody> {
        self.check(Operation::GetObject, Some(key))?;
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|object| ObjectBody {
                head: object.head(),
                data: object.data.clone(),
            })
            .ok_or_else(|| BackendError::not_found(format!("{bucket}/{key}")))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<()> {
        self.check(Operation::DeleteObject, Some(key))?;
        let mut buckets = self.buckets.write().await;
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| BackendError::not_found(bucket))?;
        objects.remove(key);
        Ok(())
    }
}
