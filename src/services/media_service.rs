//! MediaPipeline — orchestrates fetcher, analyzer, and object store to
//! materialize media, derive its metadata, and keep stored artifacts
//! (original + thumbnail) consistent across rename and delete.

use crate::catalog::Catalog;
use crate::config::MediaConfig;
use crate::errors::{MediaError, MediaResult};
use crate::models::{MediaRecord, RenameOutcome, UploadOutcome};
use crate::services::fetcher::MediaFetcher;
use crate::services::image_service::ImageAnalyzer;
use crate::services::object_store::ObjectStore;
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Thumbnail filename for a primary filename: everything from the first `.`
/// onward becomes `-thumbnail.jpg`. Pure, so a primary name always maps to
/// the same thumbnail name.
pub fn thumbnail_name(filename: &str) -> String {
    let stem = filename.split('.').next().unwrap_or(filename);
    format!("{stem}-thumbnail.jpg")
}

/// The media pipeline. Owns the byte lifecycle in the object store and
/// returns values for a [`Catalog`] to persist; it never persists records
/// itself (except the delete ordering documented on [`MediaPipeline::delete`]).
#[derive(Clone)]
pub struct MediaPipeline {
    store: Arc<ObjectStore>,
    fetcher: MediaFetcher,
    analyzer: ImageAnalyzer,
    max_upload_bytes: u64,
}

impl MediaPipeline {
    pub fn new(store: Arc<ObjectStore>, config: &MediaConfig) -> MediaResult<Self> {
        Ok(Self {
            store,
            fetcher: MediaFetcher::new(Duration::from_secs(config.fetch_timeout_secs))?,
            analyzer: ImageAnalyzer::new(config.thumbnail_edge, config.jpeg_quality),
            max_upload_bytes: config.max_upload_bytes,
        })
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// Fetch a remote URL and store it under `filename`.
    ///
    /// Fails with `Conflict` before any transfer when the filename is taken.
    /// The size cap is enforced while the body streams, so an oversized
    /// source never materializes an object.
    pub async fn store_url(&self, remote_url: &str, filename: &str) -> MediaResult<UploadOutcome> {
        self.ensure_absent(filename).await?;
        let payload = self.fetcher.fetch(remote_url, self.max_upload_bytes).await?;
        self.put(payload.bytes, filename).await
    }

    /// Store caller-supplied bytes under `filename`, subject to the same
    /// conflict check and size cap as remote fetches.
    ///
    /// The existence check and the upload are not atomic: two concurrent
    /// uploads to the same filename can both pass the check, and the later
    /// put wins (same-key upload overwrites). The window is accepted, not
    /// eliminated.
    pub async fn store_bytes(&self, bytes: Bytes, filename: &str) -> MediaResult<UploadOutcome> {
        self.ensure_absent(filename).await?;
        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(MediaError::PayloadTooLarge {
                size: bytes.len() as u64,
                max: self.max_upload_bytes,
            });
        }
        self.put(bytes, filename).await
    }

    async fn ensure_absent(&self, filename: &str) -> MediaResult<()> {
        if self.store.exists(filename).await? {
            return Err(MediaError::Conflict(filename.to_string()));
        }
        Ok(())
    }

    async fn put(&self, bytes: Bytes, filename: &str) -> MediaResult<UploadOutcome> {
        let size = bytes.len() as u64;
        let uploaded = self.store.upload(bytes, filename).await?;
        Ok(UploadOutcome {
            url: uploaded.url,
            size,
            hash: uploaded.hash,
        })
    }

    /// Recompute derived metadata for an existing record.
    ///
    /// Best-effort by design: a record whose URL is not managed by this
    /// store comes back unchanged (externally-hosted media is legitimate),
    /// and an analysis failure also returns the record unchanged rather than
    /// propagating. A thumbnail upload failure is isolated — logged and
    /// skipped while the rest of the metadata update still applies. Backend
    /// failures reading the original do propagate.
    pub async fn reparse(&self, record: &MediaRecord) -> MediaResult<MediaRecord> {
        let Some(key) = self.store.key_for_url(&record.url) else {
            return Ok(record.clone());
        };

        let bytes = self.store.download(&key).await?;
        let analysis = match self.analyzer.analyze(bytes.clone()).await {
            Ok(analysis) => analysis,
            Err(err) => {
                warn!(key = %key, error = %err, "reparse skipped: analysis failed");
                return Ok(record.clone());
            }
        };

        let mut updated = record.clone();
        updated.width = Some(analysis.width);
        updated.height = Some(analysis.height);
        updated.color = analysis.color;
        updated.size = bytes.len() as u64;
        updated.file_hash = Some(self.store.content_hash(&bytes));

        let thumb_key = thumbnail_name(&key);
        match self.store.upload(Bytes::from(analysis.thumbnail), &thumb_key).await {
            Ok(uploaded) => updated.thumbnail_url = Some(uploaded.url),
            Err(err) => {
                warn!(key = %thumb_key, error = %err, "thumbnail upload failed, keeping rest of reparse");
            }
        }

        updated.updated_at = Utc::now();
        Ok(updated)
    }

    /// Rename the stored objects behind a record.
    ///
    /// Returns `None` when the record's URL is not managed by this store.
    /// The primary and thumbnail renames run concurrently; a failure in
    /// either propagates, but a succeeded half is not rolled back — an
    /// orphaned renamed copy is accepted, consistent with delete.
    pub async fn rename(
        &self,
        record: &MediaRecord,
        new_filename: &str,
    ) -> MediaResult<Option<RenameOutcome>> {
        let Some(old_key) = self.store.key_for_url(&record.url) else {
            return Ok(None);
        };

        let old_thumb = record
            .thumbnail_url
            .as_deref()
            .and_then(|url| self.store.key_for_url(url));

        let outcome = match old_thumb {
            Some(old_thumb_key) => {
                let new_thumb_key = thumbnail_name(new_filename);
                let (url, thumbnail_url) = tokio::try_join!(
                    self.store.rename(&old_key, new_filename),
                    self.store.rename(&old_thumb_key, &new_thumb_key),
                )?;
                RenameOutcome {
                    url,
                    thumbnail_url: Some(thumbnail_url),
                }
            }
            None => RenameOutcome {
                url: self.store.rename(&old_key, new_filename).await?,
                thumbnail_url: None,
            },
        };

        Ok(Some(outcome))
    }

    /// Drop the record from the catalog, then remove both stored objects.
    ///
    /// The catalog delete goes first: a record must never point at objects
    /// the store no longer has, while stale objects without a record are
    /// acceptable orphans. Each object is removed independently and absence
    /// of either is not an error.
    pub async fn delete(&self, catalog: &dyn Catalog, record: &MediaRecord) -> MediaResult<()> {
        catalog.delete_by_id(record.id).await?;

        if let Some(key) = self.store.key_for_url(&record.url) {
            self.store.delete(&key).await?;
        }
        if let Some(thumb_key) = record
            .thumbnail_url
            .as_deref()
            .and_then(|url| self.store.key_for_url(url))
        {
            self.store.delete(&thumb_key).await?;
        }
        Ok(())
    }
}
