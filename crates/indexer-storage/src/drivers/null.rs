//! A backend that discards every upload and serves nothing. Useful for
//! local testing of the ingestion controller without a real repository.

use async_trait::async_trait;
use futures_util::stream;
use indexer_util::errors::IndexerResult;

use crate::backend::{ByteStream, StorageBackend};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullBackend;

#[async_trait]
impl StorageBackend for NullBackend {
    async fn download(&self, _path: &str) -> IndexerResult<ByteStream> {
        Ok(Box::pin(stream::empty()))
    }

    async fn upload(&self, _path: &str, _data: Vec<u8>) -> IndexerResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn download_yields_no_bytes() {
        let backend = NullBackend;
        let mut stream = backend.download("org/x/y/1.0.0/y-1.0.0.jar").await.unwrap();
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn upload_always_succeeds() {
        let backend = NullBackend;
        backend.upload("any/path", vec![1, 2, 3]).await.unwrap();
    }
}
