//! Cache-purge hook, invoked asynchronously after every successful commit
//! so a fronting CDN or caching proxy can drop its copy of a project's
//! metadata and artifacts.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{error, warn};

#[async_trait]
pub trait CachePurger: Send + Sync {
    async fn purge_project(&self, group: &str, artifact: &str);
}

/// Logs the purge and does nothing else. Used when no webhook is configured.
pub struct NoopPurger;

#[async_trait]
impl CachePurger for NoopPurger {
    async fn purge_project(&self, group: &str, artifact: &str) {
        warn!(%group, %artifact, "no cache-purge webhook configured, skipping purge");
    }
}

/// POSTs `{webhook}/purge/{group}/{artifact}`. Failures are logged, never
/// surfaced to the publisher: a missed purge means stale cached metadata,
/// not a lost release.
pub struct HttpPurger {
    client: Client,
    webhook: String,
}

impl HttpPurger {
    pub fn new(webhook: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            webhook: webhook.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl CachePurger for HttpPurger {
    async fn purge_project(&self, group: &str, artifact: &str) {
        let url = format!("{}/purge/{group}/{artifact}", self.webhook);
        match self.client.post(&url).send().await {
            Ok(resp) if resp.status().is_success() => {}
            Ok(resp) => error!(%url, status = %resp.status(), "cache purge webhook returned error"),
            Err(e) => error!(%url, error = %e, "cache purge webhook request failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_purger_does_not_panic() {
        NoopPurger.purge_project("org.example", "y").await;
    }
}
