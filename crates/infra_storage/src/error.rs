//! Storage error types

use std::path::PathBuf;

use thiserror::Error;

use core_kernel::PortError;

/// Errors raised by the filesystem storage
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The upload exceeded the configured size limit
    #[error("upload exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64 },

    /// The URL was not issued by this storage
    #[error("'{0}' is not a URL of this storage")]
    ForeignUrl(String),

    /// No file is stored under the URL
    #[error("no file stored at '{0}'")]
    NotFound(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<StorageError> for PortError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound(url) => PortError::not_found("StoredFile", url),
            StorageError::TooLarge { .. } => PortError::validation(error.to_string()),
            StorageError::ForeignUrl(_) => PortError::validation_field(error.to_string(), "url"),
            StorageError::Io { .. } => PortError::Internal {
                message: error.to_string(),
                source: Some(Box::new(error)),
            },
        }
    }
}
