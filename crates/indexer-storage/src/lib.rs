//! Storage Backend: an opaque byte store keyed by path, pluggable by URL
//! scheme. The ingestion controller calls `download`/`upload` without
//! caring which driver is active; driver selection happens once at boot.

use std::sync::Arc;

use indexer_util::errors::{IndexerError, IndexerResult};

pub mod backend;
pub mod drivers;

pub use backend::{ByteStream, StorageBackend};

/// Construct the driver named by `url`'s scheme: `http(s)://`, `ftp://`,
/// `file://`, or `null://`.
pub fn backend_for_url(url: &str) -> IndexerResult<Arc<dyn StorageBackend>> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(Arc::new(drivers::http::HttpBackend::new(url, None, None)))
    } else if url.starts_with("ftp://") {
        Ok(Arc::new(drivers::ftp::FtpBackend::new(url)?))
    } else if let Some(path) = url.strip_prefix("file://") {
        Ok(Arc::new(drivers::file::FileBackend::new(path)))
    } else if url.starts_with("null://") {
        Ok(Arc::new(drivers::null::NullBackend))
    } else {
        Err(IndexerError::InternalError(format!(
            "unsupported storage backend scheme: {url}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unknown_scheme() {
        let err = backend_for_url("gopher://example.com").unwrap_err();
        assert!(matches!(err, IndexerError::InternalError(_)));
    }

    #[test]
    fn file_scheme_constructs_file_backend() {
        assert!(backend_for_url("file:///tmp/repo/").is_ok());
    }

    #[test]
    fn null_scheme_constructs_null_backend() {
        assert!(backend_for_url("null://").is_ok());
    }
}
