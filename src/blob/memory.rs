//! In-process blob store, mainly for tests

use super::{BlobError, BlobMeta, BlobResult, BlobStore};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

/// Blob store holding everything in a map
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Bytes>>,
    /// Puts to paths containing this substring fail
    fail_puts: Mutex<Option<String>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent put whose path contains `pattern` fail
    pub fn fail_puts_matching(&self, pattern: impl Into<String>) {
        *self.fail_puts.lock().unwrap_or_else(PoisonError::into_inner) = Some(pattern.into());
    }

    /// Stop injecting put failures
    pub fn clear_failures(&self) {
        *self.fail_puts.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// All stored paths
    pub fn paths(&self) -> Vec<String> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }

    fn list_dir(&self, dir: &str) -> Vec<BlobMeta> {
        let prefix = if dir.is_empty() { String::new() } else { format!("{}/", dir.trim_end_matches('/')) };
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, data)| {
                let name = &path[prefix.len()..];
                (!name.contains('/')).then(|| BlobMeta {
                    name: name.to_string(),
                    size: data.len() as u64,
                })
            })
            .collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn get(&self, path: &str) -> BlobResult<Bytes> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(path.to_string()))
    }

    async fn put(&self, path: &str, data: Bytes) -> BlobResult<()> {
        if path.is_empty() {
            return Err(BlobError::InvalidPath(path.to_string()));
        }
        let injected = self
            .fail_puts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|pattern| path.contains(pattern.as_str()));
        if injected {
            return Err(BlobError::Injected(path.to_string()));
        }
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), data);
        Ok(())
    }

    async fn stat(&self, path: &str) -> BlobResult<u64> {
        self.blobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .map(|data| data.len() as u64)
            .ok_or_else(|| BlobError::NotFound(path.to_string()))
    }

    fn list<'a>(&'a self, dir: &'a str) -> BoxStream<'a, BlobResult<BlobMeta>> {
        stream::iter(self.list_dir(dir).into_iter().map(Ok)).boxed()
    }

    async fn delete(&self, dir: &str, names: &[String]) -> BlobResult<()> {
        let mut blobs = self.blobs.lock().unwrap_or_else(PoisonError::into_inner);
        for name in names {
            blobs.remove(&super::join_path(dir, name));
        }
        Ok(())
    }
}
