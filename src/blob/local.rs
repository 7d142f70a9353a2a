//! Local-disk blob store rooted at a directory

use super::{BlobError, BlobMeta, BlobResult, BlobStore};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Blob store backed by files under `root`
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `root`; the directory is created on first write
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> BlobResult<PathBuf> {
        let rel = Path::new(path);
        let valid = !path.is_empty() && rel.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
        if !valid {
            return Err(BlobError::InvalidPath(path.to_string()));
        }
        Ok(self.root.join(rel))
    }

    async fn list_dir(&self, dir: &str) -> BlobResult<Vec<BlobMeta>> {
        let full = if dir.is_empty() { self.root.clone() } else { self.resolve(dir)? };
        let mut entries = match tokio::fs::read_dir(&full).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut metas = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            // skip in-flight temporary files
            if name.starts_with('.') {
                continue;
            }
            metas.push(BlobMeta { name, size: meta.len() });
        }
        metas.sort();
        Ok(metas)
    }
}

fn map_not_found(err: std::io::Error, path: &str) -> BlobError {
    if err.kind() == ErrorKind::NotFound {
        BlobError::NotFound(path.to_string())
    } else {
        BlobError::Io(err)
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn get(&self, path: &str) -> BlobResult<Bytes> {
        let full = self.resolve(path)?;
        let data = tokio::fs::read(&full).await.map_err(|e| map_not_found(e, path))?;
        Ok(Bytes::from(data))
    }

    async fn put(&self, path: &str, data: Bytes) -> BlobResult<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write to a hidden sibling then rename so readers never see a torn file
        let file_name = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| BlobError::InvalidPath(path.to_string()))?;
        let tmp = full.with_file_name(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));
        let written = match tokio::fs::write(&tmp, &data).await {
            Ok(()) => tokio::fs::rename(&tmp, &full).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            if let Err(cleanup) = tokio::fs::remove_file(&tmp).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    warn!("Could not remove temporary file {}: {}", tmp.display(), cleanup);
                }
            }
            return Err(e.into());
        }
        debug!("Wrote blob {} ({} bytes)", path, data.len());
        Ok(())
    }

    async fn stat(&self, path: &str) -> BlobResult<u64> {
        let full = self.resolve(path)?;
        let meta = tokio::fs::metadata(&full).await.map_err(|e| map_not_found(e, path))?;
        Ok(meta.len())
    }

    fn list<'a>(&'a self, dir: &'a str) -> BoxStream<'a, BlobResult<BlobMeta>> {
        stream::once(self.list_dir(dir))
            .flat_map(|listing| match listing {
                Ok(metas) => stream::iter(metas.into_iter().map(Ok)).boxed(),
                Err(e) => stream::iter(std::iter::once(Err(e))).boxed(),
            })
            .boxed()
    }

    async fn delete(&self, dir: &str, names: &[String]) -> BlobResult<()> {
        for name in names {
            let full = self.resolve(&super::join_path(dir, name))?;
            match tokio::fs::remove_file(&full).await {
                Ok(()) => debug!("Deleted blob {}/{}", dir, name),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_stat_list_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path());

        store.put("g/a", Bytes::from_static(b"hello")).await.unwrap();
        store.put("g/b", Bytes::from_static(b"xy")).await.unwrap();

        assert_eq!(store.get("g/a").await.unwrap(), Bytes::from_static(b"hello"));
        assert_eq!(store.stat("g/b").await.unwrap(), 2);

        let listed: Vec<BlobMeta> = store.list("g").try_collect().await.unwrap();
        assert_eq!(
            listed,
            vec![
                BlobMeta { name: "a".into(), size: 5 },
                BlobMeta { name: "b".into(), size: 2 },
            ]
        );

        store.delete("g", &["a".to_string(), "missing".to_string()]).await.unwrap();
        assert!(matches!(store.get("g/a").await, Err(BlobError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path());
        assert!(matches!(store.get("../etc/passwd").await, Err(BlobError::InvalidPath(_))));
        assert!(matches!(store.get("").await, Err(BlobError::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_failed_put_leaves_no_temporary_file() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path());
        store.put("g/a/x", Bytes::from_static(b"1")).await.unwrap();

        // `g/a` is a directory, so the final rename fails
        assert!(matches!(store.put("g/a", Bytes::from_static(b"2")).await, Err(BlobError::Io(_))));
        let leftovers: Vec<String> = std::fs::read_dir(temp_dir.path().join("g"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let store = LocalBlobStore::new(temp_dir.path());
        let listed: Vec<BlobMeta> = store.list("nothing/here").try_collect().await.unwrap();
        assert!(listed.is_empty());
    }
}
