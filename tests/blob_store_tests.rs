use bytes::Bytes;
use image_vault::blob_store::{BlobStore, BlobStoreError, LocalStore};

fn test_store() -> (tempfile::TempDir, LocalStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().join("files"), "http://localhost:8080").unwrap();
    (dir, store)
}

#[tokio::test]
async fn test_local_store_put_get() {
    let (_dir, store) = test_store();

    let data = Bytes::from("hello world");
    store
        .put("1712-cat.png", "image/png", data.clone())
        .await
        .unwrap();

    let retrieved = store.get("1712-cat.png").await.unwrap();
    assert_eq!(retrieved, data);
}

#[tokio::test]
async fn test_local_store_get_missing() {
    let (_dir, store) = test_store();

    let err = store.get("missing.png").await.unwrap_err();
    assert!(matches!(err, BlobStoreError::NotFound(_)));
}

#[tokio::test]
async fn test_local_store_overwrite() {
    let (_dir, store) = test_store();

    store
        .put("key.png", "image/png", Bytes::from("one"))
        .await
        .unwrap();
    store
        .put("key.png", "image/png", Bytes::from("two"))
        .await
        .unwrap();

    assert_eq!(store.get("key.png").await.unwrap(), Bytes::from("two"));
}

#[tokio::test]
async fn test_local_store_list_keys_sorted() {
    let (_dir, store) = test_store();

    for key in ["3-c.png", "1-a.png", "2-b.png"] {
        store
            .put(key, "image/png", Bytes::from("data"))
            .await
            .unwrap();
    }

    let keys = store.list_keys().await.unwrap();
    assert_eq!(keys, vec!["1-a.png", "2-b.png", "3-c.png"]);
}

#[tokio::test]
async fn test_local_store_list_empty() {
    let (_dir, store) = test_store();
    assert!(store.list_keys().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_local_store_rejects_escaping_keys() {
    let (_dir, store) = test_store();

    for key in ["../escape.png", "a/b.png", "..", ""] {
        let err = store.get(key).await.unwrap_err();
        assert!(
            matches!(err, BlobStoreError::NotFound(_)),
            "key {key:?} should be treated as absent"
        );
    }
}

#[tokio::test]
async fn test_local_store_url() {
    let (_dir, store) = test_store();
    assert_eq!(
        store.url("1712-cat.png"),
        "http://localhost:8080/files/1712-cat.png"
    );
}

#[tokio::test]
async fn test_local_store_url_trims_trailing_slash() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalStore::new(dir.path().join("files"), "http://localhost:8080/").unwrap();
    assert_eq!(store.url("k.png"), "http://localhost:8080/files/k.png");
}
