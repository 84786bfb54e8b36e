//! End-to-end pipeline flow over the in-memory backend: upload, reparse,
//! rename, delete — the full lifecycle the embedding application drives.

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use media_store::{
    Catalog, MediaConfig, MediaPipeline, MediaRecord, MemoryBackend, MemoryCatalog, ObjectStore,
    OwnerScope, StoreConfig, TermOptions, media_labels,
};
use std::io::Cursor;
use std::sync::{Arc, Once};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

static INIT: Once = Once::new();

fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

fn store_config() -> StoreConfig {
    StoreConfig {
        endpoint: "localhost:9000".into(),
        region: "us-east-1".into(),
        secure: false,
        access_key: "ak".into(),
        secret_key: "sk".into(),
        bucket: "media".into(),
        base_path: "uploads".into(),
        base_url: "https://cdn.example.com".into(),
        default_acl: Some("public-read".into()),
    }
}

fn png_bytes() -> Bytes {
    let img = RgbImage::from_pixel(1024, 768, Rgb([120, 60, 30]));
    let mut buf = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    Bytes::from(buf)
}

#[tokio::test]
async fn full_lifecycle() {
    init_tracing();

    let backend = Arc::new(MemoryBackend::new());
    let store = Arc::new(ObjectStore::new(backend.clone(), store_config()));
    let pipeline = MediaPipeline::new(store.clone(), &MediaConfig::default()).unwrap();
    let catalog = MemoryCatalog::new();
    let owner = Uuid::new_v4();

    // upload
    let image = png_bytes();
    let outcome = pipeline.store_bytes(image.clone(), "vacation.jpg").await.unwrap();
    assert_eq!(outcome.size, image.len() as u64);

    let mut record = MediaRecord::from_upload(owner, "vacation.jpg", &outcome);
    record.labels = Some("beach, sunset".into());
    catalog.create(record.clone()).await.unwrap();

    // reparse fills in derived metadata and the thumbnail
    let record = pipeline.reparse(&record).await.unwrap();
    catalog.update(&record).await.unwrap();
    assert_eq!(record.width, Some(1024));
    assert_eq!(record.height, Some(768));
    assert!(record.color.is_some());
    assert!(record.thumbnail_url.is_some());
    assert!(store.exists("vacation-thumbnail.jpg").await.unwrap());

    // the ACL configured on the store reached the backend
    let entry = backend.entry("uploads/vacation.jpg").await.unwrap();
    assert_eq!(entry.options.acl.as_deref(), Some("public-read"));

    // rename keeps the pair consistent
    let renamed = pipeline.rename(&record, "holiday.jpg").await.unwrap().unwrap();
    let mut record = record;
    record.filename = "holiday.jpg".into();
    record.url = renamed.url;
    record.thumbnail_url = renamed.thumbnail_url;
    catalog.update(&record).await.unwrap();

    assert!(store.exists("holiday.jpg").await.unwrap());
    assert!(store.exists("holiday-thumbnail.jpg").await.unwrap());
    assert!(!store.exists("vacation.jpg").await.unwrap());

    // label aggregation needs a second record for counts above one
    let other = pipeline.store_bytes(Bytes::from_static(b"tiny"), "other.jpg").await.unwrap();
    let mut second = MediaRecord::from_upload(owner, "other.jpg", &other);
    second.labels = Some("sunset, pier".into());
    catalog.create(second).await.unwrap();

    let terms = media_labels(&catalog, OwnerScope::Is(owner), &TermOptions::default())
        .await
        .unwrap();
    assert_eq!(terms.len(), 1);
    assert_eq!(terms[0].term, "sunset");
    assert_eq!(terms[0].count, 2);

    // delete removes the record first, then both objects
    pipeline.delete(&catalog, &record).await.unwrap();
    assert!(catalog.find_by_id(record.id).await.unwrap().is_none());
    assert!(!store.exists("holiday.jpg").await.unwrap());
    assert!(!store.exists("holiday-thumbnail.jpg").await.unwrap());
}
