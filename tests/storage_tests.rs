use blog_engine::storage::{ALLOWED_IMAGE_TYPES, MockStorageService, StorageService};

#[tokio::test]
async fn mock_returns_deterministic_url_for_key() {
    let storage = MockStorageService::new();

    let url = storage
        .presigned_upload_url("images/abc.png", "image/png")
        .await
        .unwrap();

    assert!(url.starts_with("http://localhost:9000/mock-bucket/"));
    assert!(url.contains("images/abc.png"));
}

#[tokio::test]
async fn mock_sanitizes_traversal_segments() {
    let storage = MockStorageService::new();

    let url = storage
        .presigned_upload_url("images/../../etc/passwd", "image/png")
        .await
        .unwrap();

    assert!(!url.contains(".."));
    assert!(url.contains("images/etc/passwd"));
}

#[tokio::test]
async fn failing_mock_reports_errors() {
    let storage = MockStorageService::new_failing();

    assert!(storage
        .presigned_upload_url("images/abc.png", "image/png")
        .await
        .is_err());
    assert!(storage.delete_object("images/abc.png").await.is_err());
}

#[tokio::test]
async fn mock_records_deleted_keys_in_order() {
    let storage = MockStorageService::new();

    storage.delete_object("images/a.png").await.unwrap();
    storage.delete_object("images/b.png").await.unwrap();

    assert_eq!(
        storage.deleted_keys.lock().unwrap().as_slice(),
        ["images/a.png", "images/b.png"]
    );
}

#[test]
fn allowed_types_are_images_only() {
    assert!(ALLOWED_IMAGE_TYPES.contains(&"image/jpeg"));
    assert!(ALLOWED_IMAGE_TYPES.contains(&"image/png"));
    assert!(!ALLOWED_IMAGE_TYPES.contains(&"application/pdf"));
    assert!(ALLOWED_IMAGE_TYPES.iter().all(|t| t.starts_with("image/")));
}
