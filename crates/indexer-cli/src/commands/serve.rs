use std::sync::Arc;

use indexer_server::{CachePurger, Config, Controller, HttpPurger, NoopPurger};
use indexer_vcs::{ChangelogProvider, GitChangelogProvider};
use miette::IntoDiagnostic;

/// Load configuration, connect to the catalog, and serve the ingestion
/// proxy until the process is killed.
pub async fn run() -> miette::Result<()> {
    let config = Config::from_env().into_diagnostic()?;
    let bind_addr = config.bind_addr.clone();

    let pool = indexer_db::connect_pool(&config.database_url).await.into_diagnostic()?;
    let projects = indexer_db::queries::load_projects(&pool).await.into_diagnostic()?;
    tracing::info!(count = projects.len(), "loaded projects");

    let storage = indexer_storage::backend_for_url(&config.storage_url).into_diagnostic()?;
    let changelog: Arc<dyn ChangelogProvider> = Arc::new(GitChangelogProvider::new("./vcs-cache"));
    let purger: Arc<dyn CachePurger> = match &config.cache_purge_webhook {
        Some(webhook) => Arc::new(HttpPurger::new(webhook.clone())),
        None => Arc::new(NoopPurger),
    };

    let controller = Arc::new(Controller::new(config, pool, projects, storage, changelog, purger));
    let app = indexer_server::build_router(controller);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await.into_diagnostic()?;
    tracing::info!(%bind_addr, "listening");
    axum::serve(listener, app).await.into_diagnostic()?;

    Ok(())
}
