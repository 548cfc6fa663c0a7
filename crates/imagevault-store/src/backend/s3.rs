//! S3-compatible backend built on `aws-sdk-s3`.
//!
//! Works with AWS S3, LocalStack, and MinIO. Path-style addressing is always
//! enabled so that emulated stores behind a single host resolve buckets.

use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::http::HttpResponse;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::{ByteStream, DateTime};
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use jiff::Timestamp;
use tracing::{debug, info};

use super::{BackendError, BackendResult, ListedObject, ObjectBackend, ObjectBody, ObjectHead, PutObject};
use crate::{StoreConfig, TRACING_TARGET_CLIENT};

/// Region that rejects an explicit location constraint on bucket creation.
const DEFAULT_REGION: &str = "us-east-1";

/// Error codes the store uses for a missing bucket or object.
const NOT_FOUND_CODES: &[&str] = &["NoSuchBucket", "NoSuchKey", "NotFound", "404"];

/// [`ObjectBackend`] speaking the S3 protocol.
#[derive(Clone)]
pub struct S3Backend {
    client: Client,
    region: String,
}

impl S3Backend {
    /// Builds an S3 client from the store configuration.
    ///
    /// The SDK's own retry layer is disabled: a store call either succeeds
    /// or fails once, and retry policy belongs to the caller.
    pub fn new(config: &StoreConfig) -> crate::Result<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "imagevault",
        );

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled())
            .force_path_style(true);

        if let Some(endpoint) = config.endpoint()? {
            builder = builder.endpoint_url(endpoint.as_str().trim_end_matches('/'));
        }

        info!(
            target: TRACING_TARGET_CLIENT,
            endpoint = config.endpoint_url.as_str(),
            region = %config.region,
            "S3 client initialized"
        );

        Ok(Self {
            client: Client::from_conf(builder.build()),
            region: config.region.clone(),
        })
    }

    /// Wraps an already configured SDK client.
    pub fn from_client(client: Client, region: impl Into<String>) -> Self {
        Self {
            client,
            region: region.into(),
        }
    }
}

impl fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Backend")
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ObjectBackend for S3Backend {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn head_bucket(&self, bucket: &str) -> BackendResult<()> {
        self.client
            .head_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|err| classify("head_bucket", bucket, err))?;
        Ok(())
    }

    async fn create_bucket(&self, bucket: &str) -> BackendResult<()> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            let constraint = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(constraint);
        }

        match request.send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(|e| e.is_bucket_already_owned_by_you()) =>
            {
                debug!(
                    target: TRACING_TARGET_CLIENT,
                    bucket = %bucket,
                    "Bucket already owned by this account"
                );
                Ok(())
            }
            Err(err) => Err(classify("create_bucket", bucket, err)),
        }
    }

    async fn put_object(&self, bucket: &str, object: PutObject) -> BackendResult<()> {
        let resource = format!("{bucket}/{}", object.key);
        self.client
            .put_object()
            .bucket(bucket)
            .key(object.key)
            .content_type(object.content_type)
            .set_metadata(Some(object.metadata))
            .body(ByteStream::from(object.data))
            .send()
            .await
            .map_err(|err| classify("put_object", &resource, err))?;
        Ok(())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: Option<&str>,
        max_keys: Option<u32>,
    ) -> BackendResult<Vec<ListedObject>> {
        let cap = max_keys.map(|n| n as usize);
        let mut objects = Vec::new();
        let mut continuation_token = None;
        let mut pages = 0_usize;

        loop {
            let remaining = cap.map(|cap| cap.saturating_sub(objects.len()));
            let output = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .set_prefix(prefix.map(str::to_owned))
                .set_max_keys(remaining.map(|n| i32::try_from(n).unwrap_or(i32::MAX)))
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|err| classify("list_objects", bucket, err))?;
            pages += 1;

            objects.extend(output.contents().iter().filter_map(|object| {
                Some(ListedObject {
                    key: object.key()?.to_owned(),
                    size_bytes: size_from(object.size()),
                    last_modified: timestamp_from(object.last_modified()),
                })
            }));

            if let Some(cap) = cap.filter(|&cap| objects.len() >= cap) {
                objects.truncate(cap);
                break;
            }

            match output.next_continuation_token() {
                Some(token) if output.is_truncated() == Some(true) => {
                    continuation_token = Some(token.to_owned());
                }
                _ => break,
            }
        }

        debug!(
            target: TRACING_TARGET_CLIENT,
            bucket,
            pages,
            count = objects.len(),
            "Listed objects"
        );
        Ok(objects)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> BackendResult<ObjectHead> {
        let output = self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify("head_object", &format!("{bucket}/{key}"), err))?;

        Ok(ObjectHead {
            size_bytes: size_from(output.content_length()),
            last_modified: timestamp_from(output.last_modified()),
            content_type: output.content_type().map(str::to_owned),
            metadata: output.metadata().cloned().unwrap_or_default(),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<ObjectBody> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify("get_object", &format!("{bucket}/{key}"), err))?;

        let head = ObjectHead {
            size_bytes: size_from(output.content_length()),
            last_modified: timestamp_from(output.last_modified()),
            content_type: output.content_type().map(str::to_owned),
            metadata: output.metadata().cloned().unwrap_or_default(),
        };

        let data = output
            .body
            .collect()
            .await
            .map_err(|err| BackendError::service("get_object", err))?
            .into_bytes();

        Ok(ObjectBody { head, data })
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> BackendResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify("delete_object", &format!("{bucket}/{key}"), err))?;
        Ok(())
    }
}

/// Maps an SDK error onto [`BackendError`], recognizing every way the store
/// reports a missing bucket or key (typed variant, error code, or bare 404).
fn classify<E>(operation: &'static str, resource: &str, err: SdkError<E, HttpResponse>) -> BackendError
where
    E: ProvideErrorMetadata + StdError + Send + Sync + 'static,
{
    let code_not_found = err
        .as_service_error()
        .and_then(ProvideErrorMetadata::code)
        .is_some_and(|code| NOT_FOUND_CODES.contains(&code));
    let status_not_found = matches!(&err, SdkError::ServiceError(_))
        && err
            .raw_response()
            .is_some_and(|response| response.status().as_u16() == 404);

    if code_not_found || status_not_found {
        return BackendError::not_found(resource);
    }

    debug!(
        target: TRACING_TARGET_CLIENT,
        operation,
        resource,
        error = %DisplayErrorContext(&err),
        "S3 call failed"
    );

    BackendError::service(operation, err)
}

fn size_from(size: Option<i64>) -> u64 {
    size.and_then(|n| u64::try_from(n).ok()).unwrap_or_default()
}

fn timestamp_from(value: Option<&DateTime>) -> Timestamp {
    value
        .and_then(|dt| {
            let nanos = i32::try_from(dt.subsec_nanos()).ok()?;
            Timestamp::new(dt.secs(), nanos).ok()
        })
        .unwrap_or(Timestamp::UNIX_EPOCH)
}
