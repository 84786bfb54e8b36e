//! media-store
//!
//! Media storage and processing pipeline: acquire bytes (remote fetch or
//! direct upload), hash and cap them, persist them to an S3-compatible
//! object store under a normalized key scheme, derive image metadata and a
//! thumbnail, and keep a record's stored artifacts consistent across rename
//! and delete.
//!
//! The relational side lives behind the [`Catalog`] trait; HTTP routing and
//! authentication are the embedding application's concern. Construct an
//! [`ObjectStore`] over a [`services::backend::StoreBackend`] (production:
//! `S3Backend`; tests: `MemoryBackend`), then drive it through a
//! [`MediaPipeline`].

pub mod catalog;
pub mod config;
pub mod errors;
pub mod models;
pub mod services;

pub use catalog::{Catalog, MemoryCatalog, OwnerScope};
pub use config::{AppConfig, MediaConfig, StoreConfig};
pub use errors::{MediaError, MediaResult};
pub use models::{LabelTerm, MediaRecord, RenameOutcome, UploadOutcome};
pub use services::backend::S3Backend;
pub use services::fetcher::MediaFetcher;
pub use services::image_service::ImageAnalyzer;
pub use services::label_service::{TermOptions, common_terms, media_labels};
pub use services::media_service::{MediaPipeline, thumbnail_name};
pub use services::memory::MemoryBackend;
pub use services::object_store::ObjectStore;
