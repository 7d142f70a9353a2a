//! Byte-addressable blob storage used for every RDG file.
//!
//! Paths are `/`-separated and relative to the store root; a graph lives
//! under one uri prefix and its files are the direct children of it.

pub mod local;
pub mod memory;
pub mod write_group;

pub use local::LocalBlobStore;
pub use memory::MemoryBlobStore;
pub use write_group::WriteGroup;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;

/// Blob store errors
#[derive(Error, Debug)]
pub enum BlobError {
    /// Missing blob
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// Path escapes the store root or is empty
    #[error("Invalid blob path: {0:?}")]
    InvalidPath(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure injected by a test store
    #[error("Injected failure writing {0}")]
    Injected(String),

    /// A background write task panicked or was cancelled
    #[error("Write task failed: {0}")]
    Task(String),
}

pub type BlobResult<T> = Result<T, BlobError>;

/// Name and size of one listed blob
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlobMeta {
    /// File name relative to the listed directory
    pub name: String,
    /// Size in bytes
    pub size: u64,
}

/// Async blob store contract
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Read a whole blob
    async fn get(&self, path: &str) -> BlobResult<Bytes>;

    /// Create or replace a blob; readers see either the old or the new content
    async fn put(&self, path: &str, data: Bytes) -> BlobResult<()>;

    /// Size of a blob
    async fn stat(&self, path: &str) -> BlobResult<u64>;

    /// Blobs directly under `dir`
    fn list<'a>(&'a self, dir: &'a str) -> BoxStream<'a, BlobResult<BlobMeta>>;

    /// Delete `names` under `dir`; missing names are ignored
    async fn delete(&self, dir: &str, names: &[String]) -> BlobResult<()>;
}

/// Join a directory uri and a file name
pub fn join_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}

/// Last component of a blob path
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("graphs/g1", "meta"), "graphs/g1/meta");
        assert_eq!(join_path("graphs/g1/", "meta"), "graphs/g1/meta");
        assert_eq!(join_path("", "meta"), "meta");
        assert_eq!(file_name("graphs/g1/meta_3"), "meta_3");
        assert_eq!(file_name("meta"), "meta");
    }
}
