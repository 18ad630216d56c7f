//! Hibiscus Artifact
//!
//! This crate provides the storage sink trait and implementations for
//! Hibiscus. Artifacts are binary blobs (spilled query results, files,
//! large data) that are stored outside the workflow engine's event
//! payloads and referenced by URI.
//!
//! The [`Store`] trait defines the backend layer for blob storage.
//! Implementations handle the actual storage (filesystem, S3, etc.);
//! callers translate task-scoped identifiers to storage keys.
//!
//! The trait uses async streaming for efficient handling of large blobs.

mod fs;

pub use fs::FsStore;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

/// Error type for storage sink operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The requested blob was not found.
  #[error("artifact not found: {0}")]
  NotFound(String),

  /// An I/O error occurred while reading or writing the backend.
  #[error("artifact io error: {0}")]
  Io(#[from] std::io::Error),

  /// The transfer failed partway; the partial blob has been discarded.
  #[error("artifact transfer failed for '{key}': {message}")]
  Transfer { key: String, message: String },
}

/// A pinned stream of byte chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, Error>> + Send>>;

/// Blob storage sink trait.
///
/// Implementations provide the actual storage backend (filesystem, S3,
/// etc.). `put` returns the address of the stored blob as an opaque URI
/// that downstream consumers can hand back to `get`-capable tooling.
#[async_trait]
pub trait Store: Send + Sync {
  /// Retrieve a blob by key.
  ///
  /// Returns a stream of bytes for efficient handling of large blobs.
  async fn get(&self, key: &str) -> Result<ByteStream, Error>;

  /// Store a blob and return its address.
  ///
  /// The stream must be fully consumed before the returned URI is
  /// considered visible; on failure no partial blob remains.
  async fn put(&self, key: &str, data: ByteStream, content_type: &str) -> Result<String, Error>;

  /// Delete a blob by key.
  async fn delete(&self, key: &str) -> Result<(), Error>;
}
