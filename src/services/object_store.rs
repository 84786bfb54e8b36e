//! ObjectStore — key/URL addressing and object lifecycle over a
//! [`StoreBackend`]. This file owns key validation, the base-path namespace,
//! content-type and cache metadata, and the copy-then-delete rename; the
//! wire protocol lives behind the backend trait.

use crate::config::StoreConfig;
use crate::errors::{MediaError, MediaResult};
use crate::services::backend::{PutOptions, StoreBackend};
use bytes::Bytes;
use futures::StreamExt;
use std::sync::Arc;
use tracing::debug;

const MAX_KEY_LEN: usize = 1024;

/// Stored objects are immutable once written; a year of caching is safe.
const CACHE_CONTROL: &str = "public, max-age=31536000";

/// What an upload produced.
#[derive(Debug, Clone)]
pub struct UploadedObject {
    /// Public URL the object is now served from.
    pub url: String,
    pub etag: Option<String>,
    pub version_id: Option<String>,
    /// MD5 hex digest of the uploaded bytes. Callers should reuse this
    /// instead of hashing the same bytes again.
    pub hash: String,
}

/// Key-addressed store for media objects.
///
/// Keys are relative to the configured base path and may contain at most one
/// `/` of nesting below it. Public URLs derive deterministically from
/// base-URL + base-path + key, and [`ObjectStore::key_for_url`] is the exact
/// inverse of [`ObjectStore::url_for`].
#[derive(Clone)]
pub struct ObjectStore {
    backend: Arc<dyn StoreBackend>,
    config: StoreConfig,
}

impl ObjectStore {
    pub fn new(backend: Arc<dyn StoreBackend>, config: StoreConfig) -> Self {
        Self { backend, config }
    }

    /// Key validation: rejects traversal vectors and more than one level of
    /// nesting below the base path.
    fn ensure_key_safe(&self, key: &str) -> MediaResult<()> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(MediaError::InvalidKey(key.to_string()));
        }
        if key.starts_with('/') || key.ends_with('/') || key.contains("..") {
            return Err(MediaError::InvalidKey(key.to_string()));
        }
        if key.matches('/').count() > 1 {
            return Err(MediaError::InvalidKey(key.to_string()));
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(MediaError::InvalidKey(key.to_string()));
        }
        Ok(())
    }

    fn base_path(&self) -> &str {
        self.config.base_path.trim_matches('/')
    }

    /// Backend key: base path prefix plus the relative key.
    fn object_key(&self, key: &str) -> String {
        let base = self.base_path();
        if base.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", base, key)
        }
    }

    /// Public URL for a key.
    pub fn url_for(&self, key: &str) -> String {
        let base_url = self.config.base_url.trim_end_matches('/');
        let base = self.base_path();
        if base.is_empty() {
            format!("{}/{}", base_url, key)
        } else {
            format!("{}/{}/{}", base_url, base, key)
        }
    }

    /// Key for a public URL, or `None` when the URL lies outside the
    /// configured base-URL/base-path space. A negative result, not an error:
    /// records may reference externally-hosted media.
    pub fn key_for_url(&self, url: &str) -> Option<String> {
        let prefix = self.url_for("");
        url.strip_prefix(&prefix)
            .filter(|rest| !rest.is_empty())
            .map(str::to_string)
    }

    /// MD5 hex digest used for upload bookkeeping.
    pub fn content_hash(&self, bytes: &[u8]) -> String {
        format!("{:x}", md5::compute(bytes))
    }

    /// Whether `key` is already stored. NotFound is `false`; transport and
    /// auth failures propagate.
    pub async fn exists(&self, key: &str) -> MediaResult<bool> {
        self.ensure_key_safe(key)?;
        self.backend.stat(&self.object_key(key)).await
    }

    /// Upload `bytes` under `key` with content type derived from the key's
    /// extension and long-lived cache headers. The configured default ACL is
    /// attached only when one is set.
    pub async fn upload(&self, bytes: Bytes, key: &str) -> MediaResult<UploadedObject> {
        self.ensure_key_safe(key)?;
        let hash = self.content_hash(&bytes);
        let opts = PutOptions {
            content_type: content_type_for_key(key).to_string(),
            cache_control: CACHE_CONTROL.to_string(),
            acl: self.config.default_acl.clone(),
        };
        let result = self.backend.put(&self.object_key(key), bytes, opts).await?;
        debug!(key = %key, hash = %hash, "uploaded object");

        Ok(UploadedObject {
            url: self.url_for(key),
            etag: result.etag,
            version_id: result.version_id,
            hash,
        })
    }

    /// Download the whole object.
    pub async fn download(&self, key: &str) -> MediaResult<Bytes> {
        self.download_with_progress(key, |_| Ok(())).await
    }

    /// Download with a progress callback receiving cumulative bytes read.
    /// An error returned from the callback aborts the transfer immediately;
    /// the backend stream is dropped on that path as well as on completion,
    /// releasing the underlying connection either way.
    pub async fn download_with_progress<F>(&self, key: &str, mut progress: F) -> MediaResult<Bytes>
    where
        F: FnMut(u64) -> MediaResult<()>,
    {
        self.ensure_key_safe(key)?;
        let mut stream = self.backend.get(&self.object_key(key)).await?;

        let mut body = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            body.extend_from_slice(&chunk);
            progress(body.len() as u64)?;
        }

        Ok(Bytes::from(body))
    }

    /// Remove an object. Idempotent: absence is not an error at any layer.
    pub async fn delete(&self, key: &str) -> MediaResult<()> {
        self.ensure_key_safe(key)?;
        self.backend.remove(&self.object_key(key)).await
    }

    /// Move an object via copy-then-delete. The original is only removed
    /// after the copy succeeds, so a failed copy leaves it intact. Returns
    /// the new public URL.
    pub async fn rename(&self, old_key: &str, new_key: &str) -> MediaResult<String> {
        self.ensure_key_safe(old_key)?;
        self.ensure_key_safe(new_key)?;

        self.backend
            .copy(&self.object_key(old_key), &self.object_key(new_key))
            .await?;
        self.backend.remove(&self.object_key(old_key)).await?;
        debug!(from = %old_key, to = %new_key, "renamed object");

        Ok(self.url_for(new_key))
    }
}

/// Content type from a key's extension. Image formats map to their MIME
/// type; everything else falls back to octet-stream.
fn content_type_for_key(key: &str) -> &'static str {
    let ext = key.rsplit('.').next().unwrap_or_default().to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "tif" | "tiff" => "image/tiff",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::memory::MemoryBackend;

    fn config(base_path: &str) -> StoreConfig {
        StoreConfig {
            endpoint: "localhost:9000".into(),
            region: "us-east-1".into(),
            secure: false,
            access_key: "ak".into(),
            secret_key: "sk".into(),
            bucket: "media".into(),
            base_path: base_path.into(),
            base_url: "https://cdn.example.com".into(),
            default_acl: None,
        }
    }

    fn store_with(base_path: &str) -> (Arc<MemoryBackend>, ObjectStore) {
        let backend = Arc::new(MemoryBackend::new());
        let store = ObjectStore::new(backend.clone(), config(base_path));
        (backend, store)
    }

    #[test]
    fn url_key_round_trip() {
        let (_, store) = store_with("uploads");
        for key in ["a.jpg", "nested/a.jpg", "weird name.png"] {
            let url = store.url_for(key);
            assert_eq!(store.key_for_url(&url).as_deref(), Some(key));
        }
    }

    #[test]
    fn url_round_trip_with_empty_base_path() {
        let (_, store) = store_with("");
        let url = store.url_for("a.jpg");
        assert_eq!(url, "https://cdn.example.com/a.jpg");
        assert_eq!(store.key_for_url(&url).as_deref(), Some("a.jpg"));
        assert_eq!(store.key_for_url("https://other.example.com/a.jpg"), None);
    }

    #[test]
    fn foreign_urls_map_to_no_key() {
        let (_, store) = store_with("uploads");
        assert_eq!(store.key_for_url("https://elsewhere.example/x.jpg"), None);
        assert_eq!(store.key_for_url("https://cdn.example.com/other/x.jpg"), None);
        // the bare prefix itself names no object
        assert_eq!(store.key_for_url("https://cdn.example.com/uploads/"), None);
    }

    #[tokio::test]
    async fn upload_sets_content_type_and_cache_control() {
        let (backend, store) = store_with("uploads");
        let uploaded = store
            .upload(Bytes::from_static(b"12345"), "pic.png")
            .await
            .unwrap();

        assert_eq!(uploaded.url, "https://cdn.example.com/uploads/pic.png");
        assert_eq!(uploaded.hash, format!("{:x}", md5::compute(b"12345")));

        let entry = backend.entry("uploads/pic.png").await.unwrap();
        assert_eq!(entry.options.content_type, "image/png");
        assert_eq!(entry.options.cache_control, CACHE_CONTROL);
        assert_eq!(entry.options.acl, None);
    }

    #[tokio::test]
    async fn acl_is_sent_only_when_configured() {
        let backend = Arc::new(MemoryBackend::new());
        let mut cfg = config("uploads");
        cfg.default_acl = Some("public-read".into());
        let store = ObjectStore::new(backend.clone(), cfg);

        store.upload(Bytes::from_static(b"x"), "a.jpg").await.unwrap();
        let entry = backend.entry("uploads/a.jpg").await.unwrap();
        assert_eq!(entry.options.acl.as_deref(), Some("public-read"));
    }

    #[tokio::test]
    async fn keys_allow_at_most_one_level_of_nesting() {
        let (_, store) = store_with("uploads");
        assert!(store.upload(Bytes::from_static(b"x"), "a/b.jpg").await.is_ok());

        let err = store
            .upload(Bytes::from_static(b"x"), "a/b/c.jpg")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidKey(_)));

        for bad in ["", "/a.jpg", "a/../b.jpg", "a\\b.jpg"] {
            assert!(store.upload(Bytes::from_static(b"x"), bad).await.is_err());
        }
    }

    #[tokio::test]
    async fn download_reports_cumulative_progress() {
        let (_, store) = store_with("uploads");
        let payload = Bytes::from(vec![7u8; 20 * 1024]);
        store.upload(payload.clone(), "big.bin").await.unwrap();

        let mut seen = Vec::new();
        let bytes = store
            .download_with_progress("big.bin", |total| {
                seen.push(total);
                Ok(())
            })
            .await
            .unwrap();

        assert_eq!(bytes, payload);
        assert!(seen.len() > 1, "expected multiple progress callbacks");
        assert_eq!(*seen.last().unwrap(), payload.len() as u64);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn progress_error_aborts_download() {
        let (_, store) = store_with("uploads");
        store
            .upload(Bytes::from(vec![7u8; 20 * 1024]), "big.bin")
            .await
            .unwrap();

        let result = store
            .download_with_progress("big.bin", |total| {
                if total > 8 * 1024 {
                    Err(MediaError::PayloadTooLarge {
                        size: total,
                        max: 8 * 1024,
                    })
                } else {
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(MediaError::PayloadTooLarge { .. })));
    }

    #[tokio::test]
    async fn rename_copies_before_deleting() {
        let (backend, store) = store_with("uploads");
        store.upload(Bytes::from_static(b"abc"), "old.jpg").await.unwrap();

        let url = store.rename("old.jpg", "new.jpg").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/uploads/new.jpg");
        assert!(!store.exists("old.jpg").await.unwrap());
        assert_eq!(backend.entry("uploads/new.jpg").await.unwrap().data.as_ref(), b"abc");
    }

    #[tokio::test]
    async fn failed_copy_leaves_original_intact() {
        let (_, store) = store_with("uploads");
        // nothing uploaded, so the copy half fails
        assert!(store.rename("ghost.jpg", "new.jpg").await.is_err());
        assert!(!store.exists("new.jpg").await.unwrap());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_, store) = store_with("uploads");
        store.upload(Bytes::from_static(b"x"), "a.jpg").await.unwrap();
        store.delete("a.jpg").await.unwrap();
        store.delete("a.jpg").await.unwrap();
        assert!(!store.exists("a.jpg").await.unwrap());
    }

    #[test]
    fn content_types_cover_image_formats() {
        assert_eq!(content_type_for_key("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for_key("a.webp"), "image/webp");
        assert_eq!(content_type_for_key("a.svg"), "image/svg+xml");
        assert_eq!(content_type_for_key("noext"), "application/octet-stream");
    }
}
