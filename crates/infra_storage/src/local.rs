//! Filesystem storage backend
//!
//! Files are laid out as `{root}/{category}/{file_id}` and addressed by
//! `{base_url}/{category}/{file_id}`. Uploads are written to a `.part` file
//! first and renamed into place once fully synced, so a reader never sees a
//! partial file.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use core_kernel::{AdapterHealth, DomainPort, HealthCheckResult, HealthCheckable, PortError};
use domain_claims::{AttachmentType, FileStorage, UploadStream};

use crate::error::StorageError;

/// Location of one stored file, relative to the storage root
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageKey {
    pub category: AttachmentType,
    pub file_id: Uuid,
}

impl StorageKey {
    /// A fresh key in `category`
    pub fn generate(category: AttachmentType) -> Self {
        Self {
            category,
            file_id: Uuid::now_v7(),
        }
    }

    /// Parses `{category}/{file_id}`
    ///
    /// Anything else, including paths that try to leave the category
    /// directory, is rejected.
    pub fn parse(key: &str) -> Option<Self> {
        let (category, file_id) = key.split_once('/')?;
        Some(Self {
            category: AttachmentType::parse(category)?,
            file_id: Uuid::parse_str(file_id).ok()?,
        })
    }

    pub fn relative_path(&self) -> PathBuf {
        Path::new(self.category.as_str()).join(self.file_id.to_string())
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.file_id)
    }
}

/// Attachment storage on a local (or mounted) filesystem
#[derive(Debug, Clone)]
pub struct LocalFileStorage {
    root: PathBuf,
    base_url: String,
    max_upload_bytes: Option<u64>,
}

impl LocalFileStorage {
    /// Creates a storage rooted at `root` whose URLs start with `base_url`
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            base_url,
            max_upload_bytes: None,
        }
    }

    /// Rejects uploads larger than `limit` bytes
    pub fn with_max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = Some(limit);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_for(&self, key: &StorageKey) -> String {
        format!("{}/{}", self.base_url, key)
    }

    /// Resolves a URL issued by this storage back to its key
    pub fn key_for(&self, url: &str) -> Result<StorageKey, StorageError> {
        url.strip_prefix(&self.base_url)
            .and_then(|rest| rest.strip_prefix('/'))
            .and_then(StorageKey::parse)
            .ok_or_else(|| StorageError::ForeignUrl(url.to_string()))
    }

    fn path_for(&self, key: &StorageKey) -> PathBuf {
        self.root.join(key.relative_path())
    }

    /// Reads a stored file back
    pub async fn read(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(&self.key_for(url)?);
        fs::read(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(url.to_string()),
            _ => StorageError::io(path, e),
        })
    }

    /// Checks that the root can be written, read back and cleaned up
    pub async fn validate(&self) -> Result<(), StorageError> {
        let check_dir = self.root.join(".health-check");
        let check_file = check_dir.join(Uuid::now_v7().to_string());
        let data = b"storage-health-check";

        fs::create_dir_all(&check_dir)
            .await
            .map_err(|e| StorageError::io(&check_dir, e))?;
        fs::write(&check_file, data)
            .await
            .map_err(|e| StorageError::io(&check_file, e))?;
        let read_back = fs::read(&check_file)
            .await
            .map_err(|e| StorageError::io(&check_file, e))?;
        fs::remove_file(&check_file)
            .await
            .map_err(|e| StorageError::io(&check_file, e))?;

        if read_back != data {
            return Err(StorageError::io(
                check_file,
                std::io::Error::new(std::io::ErrorKind::InvalidData, "read-back mismatch"),
            ));
        }
        Ok(())
    }

    async fn write_stream(
        &self,
        stream: &mut dyn UploadStream,
        temp: &Path,
        target: &Path,
    ) -> Result<u64, StorageError> {
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        let mut file = fs::File::create(temp)
            .await
            .map_err(|e| StorageError::io(temp, e))?;

        let written = match self.max_upload_bytes {
            Some(limit) => {
                let mut limited = (&mut *stream).take(limit.saturating_add(1));
                let written = tokio::io::copy(&mut limited, &mut file)
                    .await
                    .map_err(|e| StorageError::io(temp, e))?;
                if written > limit {
                    return Err(StorageError::TooLarge { limit });
                }
                written
            }
            None => tokio::io::copy(stream, &mut file)
                .await
                .map_err(|e| StorageError::io(temp, e))?,
        };

        file.flush().await.map_err(|e| StorageError::io(temp, e))?;
        file.sync_all().await.map_err(|e| StorageError::io(temp, e))?;
        drop(file);

        fs::rename(temp, target)
            .await
            .map_err(|e| StorageError::io(target, e))?;
        Ok(written)
    }
}

impl DomainPort for LocalFileStorage {}

#[async_trait]
impl FileStorage for LocalFileStorage {
    #[instrument(skip(self, stream), fields(category = %category))]
    async fn upload(&self, stream: &mut dyn UploadStream, category: AttachmentType) -> Result<String, PortError> {
        let key = StorageKey::generate(category);
        let target = self.path_for(&key);
        let temp = target.with_extension("part");

        match self.write_stream(stream, &temp, &target).await {
            Ok(size) => {
                debug!(key = %key, size, "Stored attachment file");
                Ok(self.url_for(&key))
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&temp).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(path = %temp.display(), error = %cleanup, "Failed to remove partial upload");
                    }
                }
                Err(e.into())
            }
        }
    }

    #[instrument(skip(self))]
    async fn delete_by_url(&self, url: &str) -> Result<(), PortError> {
        let path = self.path_for(&self.key_for(url)?);

        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(url.to_string()),
            _ => StorageError::io(&path, e),
        })?;

        debug!(path = %path.display(), "Deleted attachment file");
        Ok(())
    }
}

#[async_trait]
impl HealthCheckable for LocalFileStorage {
    async fn health_check(&self) -> HealthCheckResult {
        let start = Instant::now();
        let result = self.validate().await;
        let latency_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(()) => HealthCheckResult {
                adapter_id: "local-file-storage".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms,
                message: None,
                checked_at: Utc::now(),
            },
            Err(e) => HealthCheckResult {
                adapter_id: "local-file-storage".to_string(),
                status: AdapterHealth::Unhealthy,
                latency_ms,
                message: Some(format!("Storage error: {}", e)),
                checked_at: Utc::now(),
            },
        }
    }
}
