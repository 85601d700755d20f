//! The two-operation interface every storage driver implements.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use indexer_util::errors::IndexerResult;

/// A stream of byte chunks making up one downloaded file.
pub type ByteStream = Pin<Box<dyn Stream<Item = IndexerResult<Bytes>> + Send>>;

/// Opaque byte store keyed by path. The controller is indifferent to which
/// driver backs a given instance.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Stream the bytes currently stored at `path`.
    async fn download(&self, path: &str) -> IndexerResult<ByteStream>;

    /// Write `data` at `path`, creating any required intermediate
    /// containers.
    async fn upload(&self, path: &str, data: Vec<u8>) -> IndexerResult<()>;
}
