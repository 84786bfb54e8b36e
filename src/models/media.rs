//! Represents a media attachment and the values produced by pipeline operations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single media attachment as the catalog persists it.
///
/// `url` always points at the stored original. Derived fields
/// (`width`/`height`/`color`/`thumbnail_url`/`file_hash`) are populated or
/// refreshed by reparse and may be absent: a record with a `url` but no
/// derived metadata is valid, since metadata derivation is best-effort.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MediaRecord {
    /// Internal UUID for catalog indexing.
    pub id: Uuid,

    /// Owning user.
    pub owner_id: Uuid,

    /// Filename the object was stored under (its key below the base path).
    pub filename: String,

    /// Public URL of the stored original.
    pub url: String,

    /// Public URL of the derived thumbnail, if one was rendered.
    pub thumbnail_url: Option<String>,

    /// Pixel dimensions, when analysis succeeded.
    pub width: Option<u32>,
    pub height: Option<u32>,

    /// Dominant color as `#rrggbb`, when extraction succeeded.
    pub color: Option<String>,

    /// Byte length of the stored original.
    pub size: u64,

    /// Content digest of the stored original.
    pub file_hash: Option<String>,

    /// Free-text, comma-separated tags.
    pub labels: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MediaRecord {
    /// Build a fresh record from a completed upload. Derived metadata starts
    /// empty; a later reparse fills it in.
    pub fn from_upload(owner_id: Uuid, filename: &str, outcome: &UploadOutcome) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            filename: filename.to_string(),
            url: outcome.url.clone(),
            thumbnail_url: None,
            width: None,
            height: None,
            color: None,
            size: outcome.size,
            file_hash: Some(outcome.hash.clone()),
            labels: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of materializing one stored object from input bytes.
/// Never partially populated.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UploadOutcome {
    pub url: String,
    pub size: u64,
    pub hash: String,
}

/// New public URLs after a rename. `thumbnail_url` is `None` when the
/// record had no managed thumbnail to move.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RenameOutcome {
    pub url: String,
    pub thumbnail_url: Option<String>,
}
