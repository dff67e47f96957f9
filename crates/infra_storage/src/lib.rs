//! Attachment File Storage
//!
//! Implements the claims domain's `FileStorage` port on a local or mounted
//! filesystem. Attachment records live in the database; this crate only
//! holds the bytes.
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_storage::LocalFileStorage;
//!
//! let storage = LocalFileStorage::new("/var/lib/warranty/attachments", "https://files.example.com/claims")
//!     .with_max_upload_bytes(50 * 1024 * 1024);
//! storage.validate().await?;
//! ```

pub mod error;
pub mod local;

pub use error::StorageError;
pub use local::{LocalFileStorage, StorageKey};
