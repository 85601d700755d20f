//! Local filesystem backend: `path` is joined onto a configured root.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream;
use indexer_util::errors::{IndexerError, IndexerResult};

use crate::backend::{ByteStream, StorageBackend};

#[derive(Debug, Clone)]
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StorageBackend for FileBackend {
    async fn download(&self, path: &str) -> IndexerResult<ByteStream> {
        let data = tokio::fs::read(self.full_path(path))
            .await
            .map_err(IndexerError::from)?;
        Ok(Box::pin(stream::once(async move { Ok(Bytes::from(data)) })))
    }

    async fn upload(&self, path: &str, data: Vec<u8>) -> IndexerResult<()> {
        let full = self.full_path(path);
        if let Some(parent) = full.parent() {
            ensure_dir(parent)?;
        }
        tokio::fs::write(&full, data).await.map_err(IndexerError::from)
    }
}

fn ensure_dir(path: &Path) -> IndexerResult<()> {
    indexer_util::fs::ensure_dir(path).map_err(IndexerError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn round_trips_bytes_through_nested_path() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());

        backend
            .upload("org/example/y/1.0.0/y-1.0.0.jar", b"hello".to_vec())
            .await
            .unwrap();

        let mut stream = backend
            .download("org/example/y/1.0.0/y-1.0.0.jar")
            .await
            .unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"hello");
    }

    #[tokio::test]
    async fn download_of_missing_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        let err = backend.download("missing/path.jar").await.unwrap_err();
        assert!(matches!(err, IndexerError::NotFound(_)));
    }
}
