use async_trait::async_trait;
use indexer_core::entities::Commit;
use indexer_util::errors::IndexerResult;

/// Produces the structured commit list between two revisions of a
/// repository. `tip` is the newly published commit, `base` the previous
/// release's commit on the same branch.
#[async_trait]
pub trait ChangelogProvider: Send + Sync {
    async fn generate(&self, repo_url: &str, tip: &str, base: &str) -> IndexerResult<Vec<Commit>>;
}
