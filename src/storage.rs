use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// StorageService
///
/// Contract for the object store holding post cover images. Handlers depend
/// on the trait, so tests run against [`MockStorageService`] instead of a
/// network client.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket if missing. Called at startup in
    /// `Env::Local` so a fresh MinIO container works without manual setup.
    async fn ensure_bucket_exists(&self);

    /// Generates a short-lived signed URL for a direct client PUT of a cover
    /// image. The URL is bound to `key` and to `content_type`.
    async fn presigned_upload_url(&self, key: &str, content_type: &str)
    -> Result<String, String>;

    /// Removes a stored object. Used when a post that carries an image is
    /// deleted; a missing object is not an error.
    async fn delete_object(&self, key: &str) -> Result<(), String>;
}

/// Shared handle to the storage layer.
pub type StorageState = Arc<dyn StorageService>;

/// Upload URLs expire after ten minutes.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// MIME types accepted for cover images. Everything else is rejected before
/// a URL is signed.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

/// S3StorageClient
///
/// AWS-SDK-backed implementation. Path-style addressing is forced because
/// MinIO (the local store) does not serve virtual-hosted bucket URLs.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        // CreateBucket is idempotent; an already-exists response is ignored.
        let _ = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await;
    }

    async fn presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            // The signature covers the Content-Type header, so the upload
            // must match the type declared when the URL was requested.
            .content_type(content_type)
            .presigned(PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| e.to_string())?)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> Result<(), String> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(key)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}

/// Strips empty and navigation segments from a user-influenced key so it can
/// never climb out of the bucket prefix.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// In-memory stand-in used by tests. Returns deterministic URLs and records
/// which keys were deleted so tests can assert on image cleanup.
pub struct MockStorageService {
    /// When true, every operation reports a simulated failure.
    pub should_fail: bool,
    /// Keys passed to `delete_object`, in call order.
    pub deleted_keys: Mutex<Vec<String>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self {
            should_fail: false,
            deleted_keys: Mutex::new(Vec::new()),
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            deleted_keys: Mutex::new(Vec::new()),
        }
    }
}

impl Default for MockStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("mock storage failure".to_string());
        }
        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }

    async fn delete_object(&self, key: &str) -> Result<(), String> {
        if self.should_fail {
            return Err("mock storage failure".to_string());
        }
        self.deleted_keys.lock().unwrap().push(key.to_string());
        Ok(())
    }
}
