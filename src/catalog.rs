//! Abstract persistence collaborator for media records.
//!
//! The pipeline owns the lifecycle of the *bytes* in the object store and
//! returns values for a catalog to persist; the relational side lives behind
//! this trait. `MemoryCatalog` backs tests and small embeddings.

use crate::errors::MediaResult;
use crate::models::MediaRecord;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Owner filter applied when listing records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerScope {
    /// No owner restriction.
    Any,
    /// Records owned by exactly this user.
    Is(Uuid),
    /// Records owned by anyone but this user.
    IsNot(Uuid),
}

impl OwnerScope {
    pub fn matches(&self, owner_id: Uuid) -> bool {
        match self {
            OwnerScope::Any => true,
            OwnerScope::Is(id) => owner_id == *id,
            OwnerScope::IsNot(id) => owner_id != *id,
        }
    }
}

/// Persistence interface for [`MediaRecord`].
///
/// The pipeline never embeds query logic beyond scoping by id or owner.
#[async_trait::async_trait]
pub trait Catalog: Send + Sync {
    async fn create(&self, record: MediaRecord) -> MediaResult<()>;

    /// Update an existing record by id.
    async fn update(&self, record: &MediaRecord) -> MediaResult<()>;

    async fn find_by_id(&self, id: Uuid) -> MediaResult<Option<MediaRecord>>;

    /// All records matching the owner scope, oldest first.
    async fn find_by_owner(&self, scope: OwnerScope) -> MediaResult<Vec<MediaRecord>>;

    /// Remove a record. Absence is tolerated, mirroring delete semantics
    /// at the store layer.
    async fn delete_by_id(&self, id: Uuid) -> MediaResult<()>;
}

/// In-memory catalog keyed by record id.
#[derive(Default)]
pub struct MemoryCatalog {
    records: RwLock<HashMap<Uuid, MediaRecord>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait::async_trait]
impl Catalog for MemoryCatalog {
    async fn create(&self, record: MediaRecord) -> MediaResult<()> {
        self.records.write().await.insert(record.id, record);
        Ok(())
    }

    async fn update(&self, record: &MediaRecord) -> MediaResult<()> {
        self.records.write().await.insert(record.id, record.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> MediaResult<Option<MediaRecord>> {
        Ok(self.records.read().await.get(&id).cloned())
    }

    async fn find_by_owner(&self, scope: OwnerScope) -> MediaResult<Vec<MediaRecord>> {
        let records = self.records.read().await;
        let mut matched: Vec<MediaRecord> = records
            .values()
            .filter(|record| scope.matches(record.owner_id))
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(matched)
    }

    async fn delete_by_id(&self, id: Uuid) -> MediaResult<()> {
        self.records.write().await.remove(&id);
        Ok(())
    }
}
