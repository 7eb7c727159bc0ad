use std::collections::BTreeSet;

use image_vault::metadata_store::{
    ImageMetadata, MetadataStore, MetadataStoreError, RedbStore, UserRecord,
};

fn test_store() -> (tempfile::TempDir, RedbStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = RedbStore::open(dir.path().join("data")).unwrap();
    (dir, store)
}

fn sample_image(key: &str) -> ImageMetadata {
    ImageMetadata {
        key: key.to_string(),
        title: "Sunset".to_string(),
        description: "Over the bay".to_string(),
        tags: BTreeSet::from(["evening".to_string(), "water".to_string()]),
        upload_time: "2024-04-01T12:00:00.000Z".to_string(),
    }
}

// ============================================================================
// Image metadata
// ============================================================================

#[tokio::test]
async fn test_put_and_get_image() {
    let (_dir, store) = test_store();

    let record = sample_image("1712-sunset.png");
    store.put_image(&record).await.unwrap();

    let retrieved = store.get_image("1712-sunset.png").await.unwrap();
    assert_eq!(retrieved, Some(record));
}

#[tokio::test]
async fn test_get_image_not_found() {
    let (_dir, store) = test_store();
    assert_eq!(store.get_image("missing.png").await.unwrap(), None);
}

#[tokio::test]
async fn test_put_image_overwrites() {
    let (_dir, store) = test_store();

    let mut record = sample_image("1712-sunset.png");
    store.put_image(&record).await.unwrap();

    record.title = "Sunrise".to_string();
    store.put_image(&record).await.unwrap();

    let retrieved = store.get_image("1712-sunset.png").await.unwrap().unwrap();
    assert_eq!(retrieved.title, "Sunrise");
}

#[tokio::test]
async fn test_scan_images() {
    let (_dir, store) = test_store();

    store.put_image(&sample_image("1-a.png")).await.unwrap();
    store.put_image(&sample_image("2-b.png")).await.unwrap();

    let records = store.scan_images().await.unwrap();
    assert_eq!(records.len(), 2);

    let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
    assert!(keys.contains(&"1-a.png"));
    assert!(keys.contains(&"2-b.png"));
}

#[tokio::test]
async fn test_scan_empty() {
    let (_dir, store) = test_store();
    assert!(store.scan_images().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_tags_round_trip() {
    let (_dir, store) = test_store();

    let record = ImageMetadata {
        key: "1712-bare.png".to_string(),
        title: String::new(),
        description: String::new(),
        tags: BTreeSet::new(),
        upload_time: "2024-04-01T12:00:00.000Z".to_string(),
    };
    store.put_image(&record).await.unwrap();

    let retrieved = store.get_image("1712-bare.png").await.unwrap().unwrap();
    assert!(retrieved.tags.is_empty());
    assert_eq!(retrieved.title, "");
}

// ============================================================================
// User records
// ============================================================================

#[tokio::test]
async fn test_create_and_get_user() {
    let (_dir, store) = test_store();

    let user = UserRecord {
        username: "ines".to_string(),
        password_hash: "pbkdf2-sha256$100000$c2FsdA$aGFzaA".to_string(),
    };
    store.create_user(&user).await.unwrap();

    let retrieved = store.get_user("ines").await.unwrap();
    assert_eq!(retrieved, Some(user));
}

#[tokio::test]
async fn test_get_user_not_found() {
    let (_dir, store) = test_store();
    assert_eq!(store.get_user("nobody").await.unwrap(), None);
}

#[tokio::test]
async fn test_create_user_duplicate() {
    let (_dir, store) = test_store();

    let user = UserRecord {
        username: "ines".to_string(),
        password_hash: "hash-one".to_string(),
    };
    store.create_user(&user).await.unwrap();

    let duplicate = UserRecord {
        username: "ines".to_string(),
        password_hash: "hash-two".to_string(),
    };
    let err = store.create_user(&duplicate).await.unwrap_err();
    assert!(matches!(err, MetadataStoreError::AlreadyExists(_)));

    // The original record is untouched.
    let retrieved = store.get_user("ines").await.unwrap().unwrap();
    assert_eq!(retrieved.password_hash, "hash-one");
}
