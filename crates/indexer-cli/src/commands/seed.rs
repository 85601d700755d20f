use indexer_db::seed::{seed_build_types, seed_project, ProjectSeed};
use indexer_server::Config;
use miette::IntoDiagnostic;

use crate::cli::SeedAction;

pub async fn run(action: SeedAction) -> miette::Result<()> {
    let config = Config::from_env().into_diagnostic()?;
    let pool = indexer_db::connect_pool(&config.database_url).await.into_diagnostic()?;

    match action {
        SeedAction::BuildTypes => {
            seed_build_types(&pool).await.into_diagnostic()?;
            println!("{}", console::style("seeded default build types").green());
        }
        SeedAction::Project {
            group,
            artifact,
            name,
            plugin_id,
            github_owner,
            github_repo,
            use_snapshots,
            use_semver,
            build_types,
        } => {
            let build_type_refs: Vec<&str> = build_types.iter().map(String::as_str).collect();
            let seed = ProjectSeed {
                group: &group,
                artifact: &artifact,
                name: &name,
                plugin_id: plugin_id.as_deref(),
                github_owner: &github_owner,
                github_repo: &github_repo,
                use_snapshots,
                use_semver,
                allowed_build_types: &build_type_refs,
            };

            let project_id = seed_project(&pool, &seed).await.into_diagnostic()?;
            println!(
                "{} project {group}:{artifact} (id={project_id})",
                console::style("seeded").green()
            );
        }
    }

    Ok(())
}
