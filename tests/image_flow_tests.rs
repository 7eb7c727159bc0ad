use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use image_vault::blob_store::{BlobStore, LocalStore};
use image_vault::images::{ImageService, IncomingFile, UploadFields};
use image_vault::metadata_store::{MetadataStore, RedbStore};

fn test_service() -> (
    tempfile::TempDir,
    ImageService,
    Arc<dyn BlobStore>,
    Arc<dyn MetadataStore>,
) {
    let dir = tempfile::tempdir().unwrap();
    let blob_store: Arc<dyn BlobStore> = Arc::new(
        LocalStore::new(dir.path().join("files"), "http://localhost:8080").unwrap(),
    );
    let metadata_store: Arc<dyn MetadataStore> =
        Arc::new(RedbStore::open(dir.path().join("data")).unwrap());
    let service = ImageService::new(Arc::clone(&blob_store), Arc::clone(&metadata_store));
    (dir, service, blob_store, metadata_store)
}

fn png(name: &str) -> IncomingFile {
    IncomingFile {
        file_name: name.to_string(),
        content_type: "image/png".to_string(),
        data: Bytes::from_static(b"\x89PNG\r\n\x1a\n"),
    }
}

fn tag_set(tags: &[&str]) -> BTreeSet<String> {
    tags.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn test_single_upload_round_trips_through_listing() {
    let (_dir, service, _blobs, _meta) = test_service();

    let fields = UploadFields {
        title: "Cat".to_string(),
        description: "A very good cat".to_string(),
        tags: tag_set(&["pet", "cute"]),
    };
    let stored = service.store_batch(vec![png("cat.png")], &fields).await.unwrap();
    assert_eq!(stored.len(), 1);

    let image = &stored[0];
    assert!(image.image_url.starts_with("http://localhost:8080/files/"));
    assert!(image.image_url.ends_with("-cat.png"));
    assert_eq!(image.title, "Cat");
    assert_eq!(image.tags, tag_set(&["pet", "cute"]));

    let listing = service.list().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].url, image.image_url);
    assert_eq!(listing[0].metadata.title, "Cat");
    assert_eq!(listing[0].metadata.description, "A very good cat");
    assert_eq!(listing[0].metadata.tags, tag_set(&["pet", "cute"]));
    assert_eq!(listing[0].metadata.upload_time, image.upload_time);
}

#[tokio::test]
async fn test_upload_with_no_fields_defaults_empty() {
    let (_dir, service, _blobs, _meta) = test_service();

    let stored = service
        .store_batch(vec![png("plain.png")], &UploadFields::default())
        .await
        .unwrap();

    assert_eq!(stored[0].title, "");
    assert_eq!(stored[0].description, "");
    assert!(stored[0].tags.is_empty());

    let listing = service.list().await.unwrap();
    assert_eq!(listing[0].metadata.title, "");
    assert!(listing[0].metadata.tags.is_empty());
}

#[tokio::test]
async fn test_batch_shares_upload_time() {
    let (_dir, service, _blobs, _meta) = test_service();

    let stored = service
        .store_batch(vec![png("one.png"), png("two.png")], &UploadFields::default())
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].upload_time, stored[1].upload_time);
    assert!(stored.iter().all(|s| s.title.is_empty()));

    let listing = service.list().await.unwrap();
    assert_eq!(listing.len(), 2);
    assert_ne!(listing[0].key, listing[1].key);
}

#[tokio::test]
async fn test_key_written_to_both_stores() {
    let (_dir, service, blobs, meta) = test_service();

    service
        .store_batch(vec![png("cat.png")], &UploadFields::default())
        .await
        .unwrap();

    let keys = blobs.list_keys().await.unwrap();
    assert_eq!(keys.len(), 1);

    let record = meta.get_image(&keys[0]).await.unwrap();
    assert!(record.is_some());
    assert_eq!(record.unwrap().key, keys[0]);
}

#[tokio::test]
async fn test_blob_without_metadata_lists_with_empty_fields() {
    let (_dir, service, blobs, _meta) = test_service();

    blobs
        .put("999-orphan.png", "image/png", Bytes::from("data"))
        .await
        .unwrap();

    let listing = service.list().await.unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].key, "999-orphan.png");
    assert_eq!(listing[0].metadata.title, "");
    assert_eq!(listing[0].metadata.upload_time, "");
    assert!(listing[0].metadata.tags.is_empty());
}

#[tokio::test]
async fn test_same_name_uploads_get_distinct_keys() {
    let (_dir, service, _blobs, _meta) = test_service();

    service
        .store_batch(vec![png("cat.png")], &UploadFields::default())
        .await
        .unwrap();
    // Keys are derived from millisecond timestamps, so separate requests in
    // the same millisecond would collide. Give the clock a moment to move.
    tokio::time::sleep(Duration::from_millis(5)).await;
    service
        .store_batch(vec![png("cat.png")], &UploadFields::default())
        .await
        .unwrap();

    let listing = service.list().await.unwrap();
    assert_eq!(listing.len(), 2);
    assert_ne!(listing[0].key, listing[1].key);
}

#[tokio::test]
async fn test_listing_empty_store() {
    let (_dir, service, _blobs, _meta) = test_service();
    assert!(service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_response_serializes_camel_case() {
    let (_dir, service, _blobs, _meta) = test_service();

    let fields = UploadFields {
        title: "Cat".to_string(),
        description: String::new(),
        tags: tag_set(&["pet"]),
    };
    let stored = service.store_batch(vec![png("cat.png")], &fields).await.unwrap();

    let value = serde_json::to_value(&stored[0]).unwrap();
    assert!(value.get("imageUrl").is_some());
    assert!(value.get("uploadTime").is_some());
    assert_eq!(value["title"], "Cat");

    let listing = service.list().await.unwrap();
    let value = serde_json::to_value(&listing[0]).unwrap();
    assert!(value["metadata"].get("uploadTime").is_some());
    assert_eq!(value["metadata"]["tags"], serde_json::json!(["pet"]));
}
