//! In-memory `StoreBackend` for tests and substituted deployments.

use crate::errors::{MediaError, MediaResult};
use crate::services::backend::{ByteChunks, PutOptions, PutResult, StoreBackend};
use bytes::Bytes;
use futures::stream;
use std::collections::HashMap;
use std::io;
use tokio::sync::RwLock;

/// Chunk size used when replaying stored bytes, so streamed reads exercise
/// more than one progress callback invocation.
const CHUNK_BYTES: usize = 8 * 1024;

/// One stored object: payload plus the metadata it was put with.
#[derive(Debug, Clone)]
pub struct StoredEntry {
    pub data: Bytes,
    pub options: PutOptions,
}

/// `StoreBackend` over a map. Overwrite-on-same-key, like the real thing.
#[derive(Default)]
pub struct MemoryBackend {
    objects: RwLock<HashMap<String, StoredEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored payload and put metadata for a key, if present.
    pub async fn entry(&self, key: &str) -> Option<StoredEntry> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait::async_trait]
impl StoreBackend for MemoryBackend {
    async fn stat(&self, key: &str) -> MediaResult<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn put(&self, key: &str, bytes: Bytes, opts: PutOptions) -> MediaResult<PutResult> {
        let etag = format!("{:x}", md5::compute(&bytes));
        self.objects.write().await.insert(
            key.to_string(),
            StoredEntry {
                data: bytes,
                options: opts,
            },
        );
        Ok(PutResult {
            etag: Some(etag),
            version_id: None,
        })
    }

    async fn get(&self, key: &str) -> MediaResult<ByteChunks> {
        let entry = self
            .entry(key)
            .await
            .ok_or_else(|| MediaError::Backend(format!("object `{key}` not found")))?;
        let chunks: Vec<io::Result<Bytes>> = entry
            .data
            .chunks(CHUNK_BYTES)
            .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
            .collect();
        Ok(Box::pin(stream::iter(chunks)))
    }

    async fn remove(&self, key: &str) -> MediaResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn copy(&self, src: &str, dst: &str) -> MediaResult<()> {
        let entry = self
            .entry(src)
            .await
            .ok_or_else(|| MediaError::Backend(format!("copy source `{src}` not found")))?;
        self.objects.write().await.insert(dst.to_string(), entry);
        Ok(())
    }
}
