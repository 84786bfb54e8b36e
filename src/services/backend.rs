//! Pluggable S3-compatible backend.
//!
//! `StoreBackend` is the seam between the store's key/URL logic and the wire
//! protocol: five operations (stat, put, get, remove, copy) are all the
//! pipeline ever needs. `S3Backend` is the production implementation over
//! `aws-sdk-s3`, pointed at any S3-compatible endpoint (MinIO included).

use crate::config::StoreConfig;
use crate::errors::{MediaError, MediaResult};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Builder, Credentials, Region};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::ObjectCannedAcl;
use bytes::Bytes;
use futures::Stream;
use std::io;
use std::pin::Pin;

/// Streamed object body: chunks as the backend yields them.
pub type ByteChunks = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Metadata attached to an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: String,
    pub cache_control: String,
    /// Canned ACL; `None` means no ACL header is sent at all.
    pub acl: Option<String>,
}

/// What the backend reports back after a put.
#[derive(Debug, Clone, Default)]
pub struct PutResult {
    pub etag: Option<String>,
    pub version_id: Option<String>,
}

#[async_trait::async_trait]
pub trait StoreBackend: Send + Sync {
    /// Whether an object exists. "Not found" is `Ok(false)`, never an error;
    /// transport and auth failures propagate.
    async fn stat(&self, key: &str) -> MediaResult<bool>;

    /// Write an object. Same-key put overwrites, per object store semantics.
    async fn put(&self, key: &str, bytes: Bytes, opts: PutOptions) -> MediaResult<PutResult>;

    /// Read an object as a chunk stream. Dropping the stream releases the
    /// underlying connection, which is the abort path for streamed reads.
    async fn get(&self, key: &str) -> MediaResult<ByteChunks>;

    /// Remove an object. Absence is success.
    async fn remove(&self, key: &str) -> MediaResult<()>;

    /// Server-side copy. The source is left intact.
    async fn copy(&self, src: &str, dst: &str) -> MediaResult<()>;
}

/// `StoreBackend` over `aws-sdk-s3` with a custom endpoint.
#[derive(Debug, Clone)]
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl S3Backend {
    /// Build a client from explicit configuration. Static credentials and
    /// forced path-style addressing, which S3-compatible stores expect.
    pub fn from_config(config: &StoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            "media-store",
        );
        let s3_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint_url())
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        tracing::debug!(
            endpoint = %config.endpoint_url(),
            bucket = %config.bucket,
            "initialized S3 backend"
        );

        Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        }
    }
}

#[async_trait::async_trait]
impl StoreBackend for S3Backend {
    async fn stat(&self, key: &str) -> MediaResult<bool> {
        let result = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err)) if service_err.err().is_not_found() => {
                Ok(false)
            }
            Err(err) => Err(MediaError::Backend(format!("HeadObject: {err:?}"))),
        }
    }

    async fn put(&self, key: &str, bytes: Bytes, opts: PutOptions) -> MediaResult<PutResult> {
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(&opts.content_type)
            .cache_control(&opts.cache_control)
            .set_acl(opts.acl.as_deref().map(ObjectCannedAcl::from))
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|err| MediaError::Backend(format!("PutObject: {err:?}")))?;

        Ok(PutResult {
            etag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
        })
    }

    async fn get(&self, key: &str) -> MediaResult<ByteChunks> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| MediaError::Backend(format!("GetObject: {err:?}")))?;

        let stream = futures::stream::try_unfold(output.body, |mut body| async move {
            match body.try_next().await {
                Ok(Some(chunk)) => Ok(Some((chunk, body))),
                Ok(None) => Ok(None),
                Err(err) => Err(io::Error::other(err)),
            }
        });

        Ok(Box::pin(stream))
    }

    async fn remove(&self, key: &str) -> MediaResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| MediaError::Backend(format!("DeleteObject: {err:?}")))?;
        Ok(())
    }

    async fn copy(&self, src: &str, dst: &str) -> MediaResult<()> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(format!("{}/{}", self.bucket, src))
            .key(dst)
            .send()
            .await
            .map_err(|err| MediaError::Backend(format!("CopyObject: {err:?}")))?;
        Ok(())
    }
}
