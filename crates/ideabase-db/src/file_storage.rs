//! Object storage backends for attachment bytes.
//!
//! Objects are addressed by storage key (`{ownerId}/{uuid}.{ext}`). Two
//! backends are provided:
//! - [`FilesystemBackend`]: keys map to paths under a base directory
//! - [`HttpObjectStore`]: a managed object store speaking the
//!   `/storage/v1/object/{bucket}/{key}` REST protocol
//!
//! ## Example
//!
//! ```rust,ignore
//! use ideabase_db::file_storage::{FilesystemBackend, StorageBackend};
//!
//! let backend = FilesystemBackend::new("/var/lib/ideabase/objects");
//! backend.put("u1/0b1c.pdf", &bytes, "application/pdf", false).await?;
//! ```

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use ideabase_core::{Error, Result};

/// Storage backend trait for different storage implementations.
///
/// Allows abstracting over the local filesystem or a remote object store.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Write an object. With `upsert == false` an existing object at `key`
    /// is left untouched and `Error::ObjectExists` is returned.
    async fn put(&self, key: &str, data: &[u8], content_type: &str, upsert: bool) -> Result<()>;

    /// Read an object (`Error::NotFound` if absent).
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if an object exists at `key`.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Reject keys that could escape the storage root.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains('\\') || key.contains('\0') {
        return Err(Error::InvalidInput(format!("Invalid storage key: {:?}", key)));
    }
    let path = Path::new(key);
    if !path
        .components()
        .all(|component| matches!(component, Component::Normal(_)))
    {
        return Err(Error::InvalidInput(format!("Invalid storage key: {:?}", key)));
    }
    Ok(())
}

/// Filesystem storage backend.
///
/// Path format: `{base_path}/{ownerId}/{uuid}.{ext}`
pub struct FilesystemBackend {
    base_path: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend with the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.base_path.join(key))
    }

    /// Validate that the storage backend can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup so permission problems surface
    /// before the first upload.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("probe.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_back = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_back != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }

    async fn write_temp(&self, full_path: &Path, data: &[u8]) -> Result<PathBuf> {
        let file_name = full_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let temp_path = full_path.with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));

        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            warn!(temp_path = %temp_path.display(), error = %e, "file_storage: File::create failed");
            e
        })?;
        let filled = fill_temp(&mut file, &temp_path, data).await;
        drop(file);
        discard_on_error(&temp_path, filled).await?;
        Ok(temp_path)
    }
}

async fn fill_temp(file: &mut fs::File, temp_path: &Path, data: &[u8]) -> Result<()> {
    file.write_all(data).await?;
    file.sync_all().await?;

    // rw-r--r--, never executable
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(temp_path, std::fs::Permissions::from_mode(0o644)).await?;
    }
    #[cfg(not(unix))]
    let _ = temp_path;
    Ok(())
}

/// Remove a half-written temp file when filling it failed.
async fn discard_on_error<T>(temp_path: &Path, result: Result<T>) -> Result<T> {
    if let Err(e) = &result {
        warn!(temp_path = %temp_path.display(), error = %e, "file_storage: discarding temp file");
        if let Err(rm) = fs::remove_file(temp_path).await {
            warn!(temp_path = %temp_path.display(), error = %rm, "file_storage: temp cleanup failed");
        }
    }
    result
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    async fn put(&self, key: &str, data: &[u8], _content_type: &str, upsert: bool) -> Result<()> {
        let full_path = self.full_path(key)?;
        debug!(
            subsystem = "storage",
            component = "filesystem",
            op = "put_object",
            file_path = %key,
            size_bytes = data.len(),
            upsert,
            "file_storage: put"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "file_storage: create_dir_all failed");
                e
            })?;
        }

        let temp_path = self.write_temp(&full_path, data).await?;

        if upsert {
            fs::rename(&temp_path, &full_path).await.map_err(|e| {
                warn!(to = %full_path.display(), error = %e, "file_storage: rename failed");
                e
            })?;
            return Ok(());
        }

        // A hard link fails atomically if the target already exists.
        let linked = fs::hard_link(&temp_path, &full_path).await;
        let _ = fs::remove_file(&temp_path).await;
        match linked {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(Error::ObjectExists(key.to_string()))
            }
            Err(e) => {
                warn!(to = %full_path.display(), error = %e, "file_storage: link failed");
                Err(e.into())
            }
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(key)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("Object {}", key)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let full_path = self.full_path(key)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let full_path = self.full_path(key)?;
        Ok(fs::try_exists(full_path).await?)
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }
}

/// Connection settings for [`HttpObjectStore`].
#[derive(Clone)]
pub struct HttpStoreConfig {
    /// Backend URL, e.g. `https://project.example.co`.
    pub base_url: String,
    /// Service credential sent as bearer token and `apikey` header.
    pub service_key: String,
    pub bucket: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for HttpStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStoreConfig")
            .field("base_url", &self.base_url)
            .field("service_key", &"[REDACTED]")
            .field("bucket", &self.bucket)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpStoreConfig {
    pub fn new(
        base_url: impl Into<String>,
        service_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            service_key: service_key.into(),
            bucket: bucket.into(),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Remote object store backend.
pub struct HttpObjectStore {
    client: reqwest::Client,
    config: HttpStoreConfig,
}

impl HttpObjectStore {
    pub fn new(config: HttpStoreConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(Error::Config("Storage URL must not be empty".into()));
        }
        if config.service_key.trim().is_empty() {
            return Err(Error::Config("Storage service key must not be empty".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build storage client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn object_url(&self, key: &str) -> Result<String> {
        validate_key(key)?;
        Ok(format!(
            "{}/storage/v1/object/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.bucket,
            key
        ))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.config.service_key)
            .header("apikey", &self.config.service_key)
    }

    /// The store reports some failures as 400 with a JSON `statusCode`.
    async fn error_for(key: &str, response: reqwest::Response) -> Error {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let embedded = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|v| {
                v.get("statusCode").and_then(|code| match code {
                    serde_json::Value::String(s) => s.parse::<u16>().ok(),
                    serde_json::Value::Number(n) => n.as_u64().map(|n| n as u16),
                    _ => None,
                })
            });
        let effective = embedded.unwrap_or(status.as_u16());
        match effective {
            409 => Error::ObjectExists(key.to_string()),
            404 => Error::NotFound(format!("Object {}", key)),
            _ => Error::Storage(format!("{} ({}): {}", key, status, body.trim())),
        }
    }
}

#[async_trait]
impl StorageBackend for HttpObjectStore {
    async fn put(&self, key: &str, data: &[u8], content_type: &str, upsert: bool) -> Result<()> {
        let url = self.object_url(key)?;
        debug!(
            subsystem = "storage",
            component = "http",
            op = "put_object",
            file_path = %key,
            size_bytes = data.len(),
            upsert,
            "object_store: put"
        );
        let response = self
            .authorized(self.client.post(&url))
            .header(header::CONTENT_TYPE, content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(data.to_vec())
            .send()
            .await
            .map_err(|e| Error::Storage(format!("{}: {}", key, e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Self::error_for(key, response).await)
        }
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let url = self.object_url(key)?;
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("{}: {}", key, e)))?;

        if !response.status().is_success() {
            return Err(Self::error_for(key, response).await);
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Storage(format!("{}: {}", key, e)))?;
        Ok(bytes.to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let url = self.object_url(key)?;
        let response = self
            .authorized(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("{}: {}", key, e)))?;

        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        match Self::error_for(key, response).await {
            Error::NotFound(_) => Ok(()),
            other => Err(other),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        let url = self.object_url(key)?;
        let response = self
            .authorized(self.client.head(&url))
            .send()
            .await
            .map_err(|e| Error::Storage(format!("{}: {}", key, e)))?;

        match response.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::BAD_REQUEST => Ok(false),
            s => Err(Error::Storage(format!("{} ({})", key, s))),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_accepts_owner_layout() {
        assert!(validate_key("3f1e0c9a-0000-4000-8000-000000000000/a.pdf").is_ok());
    }

    #[test]
    fn test_validate_key_rejects_traversal() {
        for key in ["", "../etc/passwd", "/abs/path", "u1/../../x", "a\\b", "./x"] {
            assert!(validate_key(key).is_err(), "accepted {:?}", key);
        }
    }

    #[tokio::test]
    async fn test_failed_temp_write_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join(".a.pdf.tmp");
        std::fs::write(&temp, b"partial").unwrap();

        let result: Result<()> =
            discard_on_error(&temp, Err(Error::Storage("disk full".into()))).await;
        assert!(result.is_err());
        assert!(!temp.exists());
    }

    #[tokio::test]
    async fn test_successful_temp_write_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let temp = dir.path().join(".a.pdf.tmp");
        std::fs::write(&temp, b"whole").unwrap();

        discard_on_error(&temp, Ok(())).await.unwrap();
        assert!(temp.exists());
    }

    #[tokio::test]
    async fn test_filesystem_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        backend
            .put("u1/report.pdf", b"%PDF-1.7", "application/pdf", false)
            .await
            .unwrap();
        assert!(backend.exists("u1/report.pdf").await.unwrap());
        assert_eq!(backend.get("u1/report.pdf").await.unwrap(), b"%PDF-1.7");

        backend.delete("u1/report.pdf").await.unwrap();
        assert!(!backend.exists("u1/report.pdf").await.unwrap());
        // Second delete is a no-op.
        backend.delete("u1/report.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn test_filesystem_put_without_upsert_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        backend.put("u1/a.txt", b"first", "text/plain", false).await.unwrap();
        let err = backend
            .put("u1/a.txt", b"second", "text/plain", false)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ObjectExists(_)));
        assert_eq!(backend.get("u1/a.txt").await.unwrap(), b"first");
    }

    #[tokio::test]
    async fn test_filesystem_upsert_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        backend.put("u1/a.txt", b"first", "text/plain", false).await.unwrap();
        backend.put("u1/a.txt", b"second", "text/plain", true).await.unwrap();
        assert_eq!(backend.get("u1/a.txt").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_filesystem_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());

        backend.put("u1/a.txt", b"x", "text/plain", false).await.unwrap();
        let _ = backend.put("u1/a.txt", b"y", "text/plain", false).await;

        let entries: Vec<_> = std::fs::read_dir(dir.path().join("u1"))
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(entries, vec!["a.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_filesystem_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path());
        assert!(matches!(
            backend.get("u1/missing.pdf").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_filesystem_validate() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FilesystemBackend::new(dir.path().join("nested"));
        backend.validate().await.unwrap();
    }

    #[test]
    fn test_http_store_requires_credentials() {
        assert!(HttpObjectStore::new(HttpStoreConfig::new("", "key", "attachments")).is_err());
        assert!(HttpObjectStore::new(HttpStoreConfig::new("http://x", " ", "attachments")).is_err());
        assert!(HttpObjectStore::new(HttpStoreConfig::new("http://x", "key", "attachments")).is_ok());
    }
}
