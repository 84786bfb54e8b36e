//! Service layer: storage, fetching, analysis, and aggregation.

pub mod backend;
pub mod fetcher;
pub mod hashing;
pub mod image_service;
pub mod label_service;
pub mod media_service;
pub mod memory;
pub mod object_store;
