//! HTTP(S) backend, forwarding to a backing repository over plain HTTP(S),
//! optionally with Basic Auth credentials and a separate read-only URL (for
//! repositories fronted by a CDN on the read path).

use async_trait::async_trait;
use futures_util::TryStreamExt;
use indexer_util::errors::{IndexerError, IndexerResult};
use reqwest::{Client, StatusCode};

use crate::backend::{ByteStream, StorageBackend};

#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    write_base_url: String,
    read_base_url: String,
    auth: Option<(String, String)>,
}

impl HttpBackend {
    pub fn new(write_base_url: &str, read_base_url: Option<&str>, auth: Option<(String, String)>) -> Self {
        Self {
            client: Client::new(),
            write_base_url: write_base_url.trim_end_matches('/').to_string(),
            read_base_url: read_base_url
                .unwrap_or(write_base_url)
                .trim_end_matches('/')
                .to_string(),
            auth,
        }
    }

    fn join(base: &str, path: &str) -> String {
        format!("{base}/{}", path.trim_start_matches('/'))
    }
}

#[async_trait]
impl StorageBackend for HttpBackend {
    async fn download(&self, path: &str) -> IndexerResult<ByteStream> {
        let mut req = self.client.get(Self::join(&self.read_base_url, path));
        if let Some((user, pass)) = &self.auth {
            req = req.basic_auth(user, Some(pass));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| IndexerError::BadGateway(e.to_string()))?;

        match resp.status() {
            StatusCode::NOT_FOUND => Err(IndexerError::NotFound(path.to_string())),
            status if status.is_success() => Ok(Box::pin(
                resp.bytes_stream()
                    .map_err(|e| IndexerError::GatewayTimeout(e.to_string())),
            )),
            status => Err(IndexerError::BadGateway(format!(
                "upstream returned {status}"
            ))),
        }
    }

    async fn upload(&self, path: &str, data: Vec<u8>) -> IndexerResult<()> {
        let mut req = self
            .client
            .put(Self::join(&self.write_base_url, path))
            .body(data);
        if let Some((user, pass)) = &self.auth {
            req = req.basic_auth(user, Some(pass));
        }

        let resp = req
            .send()
            .await
            .map_err(|e| IndexerError::BadGateway(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(IndexerError::BadGateway(format!(
                "upstream returned {}",
                resp.status()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_strips_duplicate_slashes() {
        assert_eq!(
            HttpBackend::join("https://example.com/repo", "/org/x/y.jar"),
            "https://example.com/repo/org/x/y.jar"
        );
        assert_eq!(
            HttpBackend::join("https://example.com/repo", "org/x/y.jar"),
            "https://example.com/repo/org/x/y.jar"
        );
    }

    #[test]
    fn defaults_read_url_to_write_url() {
        let backend = HttpBackend::new("https://example.com/repo/", None, None);
        assert_eq!(backend.read_base_url, backend.write_base_url);
    }
}
