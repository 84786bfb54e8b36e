//! Core data models for the media pipeline.
//!
//! These entities are the values the pipeline hands back for the catalog to
//! persist; the pipeline itself never owns their storage. Fields that may
//! legitimately be "not computed" are `Option`, never sentinel strings.

pub mod labels;
pub mod media;

pub use labels::LabelTerm;
pub use media::{MediaRecord, RenameOutcome, UploadOutcome};
