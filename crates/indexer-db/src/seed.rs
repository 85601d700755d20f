//! Typed builders for the out-of-band data an operator registers before
//! the proxy can accept uploads: build types, projects, and each
//! project's initial branch. Exposed as a library function and a small
//! CLI subcommand, never run automatically at boot.

use indexer_util::errors::{IndexerError, IndexerResult};
use sqlx::PgPool;

/// The three build types every deployment needs; only `stable` allows a
/// download to be labeled `recommended`.
pub const DEFAULT_BUILD_TYPES: &[(&str, bool)] = &[("stable", true), ("bleeding", false), ("unstable", false)];

/// Create `DEFAULT_BUILD_TYPES`, skipping any that already exist.
pub async fn seed_build_types(pool: &PgPool) -> IndexerResult<()> {
    for (name, allows_promotion) in DEFAULT_BUILD_TYPES {
        sqlx::query(
            "INSERT INTO build_types (name, allows_promotion) VALUES ($1, $2) \
             ON CONFLICT (name) DO NOTHING",
        )
        .bind(name)
        .bind(allows_promotion)
        .execute(pool)
        .await
        .map_err(|e| IndexerError::InternalError(format!("failed to seed build type {name}: {e}")))?;
    }
    Ok(())
}

/// Describes one project to register, plus the build types it should
/// accept releases under.
pub struct ProjectSeed<'a> {
    pub group: &'a str,
    pub artifact: &'a str,
    pub name: &'a str,
    pub plugin_id: Option<&'a str>,
    pub github_owner: &'a str,
    pub github_repo: &'a str,
    pub use_snapshots: bool,
    pub use_semver: bool,
    pub allowed_build_types: &'a [&'a str],
}

/// Register a project, its allowed build types, and an initial `master`
/// branch under the first allowed build type. Idempotent: re-running with
/// the same `(group, artifact)` is a no-op for the project row.
pub async fn seed_project(pool: &PgPool, seed: &ProjectSeed<'_>) -> IndexerResult<i32> {
    let (project_id,): (i32,) = sqlx::query_as(
        "INSERT INTO projects (group_id, artifact_id, plugin_id, github_owner, github_repo, \
         use_snapshots, use_semver, name) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
         ON CONFLICT (group_id, artifact_id) DO UPDATE SET name = EXCLUDED.name \
         RETURNING project_id",
    )
    .bind(seed.group)
    .bind(seed.artifact)
    .bind(seed.plugin_id)
    .bind(seed.github_owner)
    .bind(seed.github_repo)
    .bind(seed.use_snapshots)
    .bind(seed.use_semver)
    .bind(seed.name)
    .fetch_one(pool)
    .await
    .map_err(|e| IndexerError::InternalError(format!("failed to seed project: {e}")))?;

    let mut first_build_type_id = None;
    for build_type_name in seed.allowed_build_types {
        let (build_type_id,): (i32,) = sqlx::query_as("SELECT build_type_id FROM build_types WHERE name = $1")
            .bind(build_type_name)
            .fetch_one(pool)
            .await
            .map_err(|e| {
                IndexerError::InternalError(format!("unknown build type {build_type_name}: {e}"))
            })?;

        first_build_type_id.get_or_insert(build_type_id);

        sqlx::query(
            "INSERT INTO project_build_types (project_id, build_type_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(project_id)
        .bind(build_type_id)
        .execute(pool)
        .await
        .map_err(|e| IndexerError::InternalError(format!("failed to link build type: {e}")))?;
    }

    if let Some(build_type_id) = first_build_type_id {
        sqlx::query(
            "INSERT INTO branches (project_id, build_type_id, name) VALUES ($1, $2, 'master') \
             ON CONFLICT (project_id, name) DO NOTHING",
        )
        .bind(project_id)
        .bind(build_type_id)
        .execute(pool)
        .await
        .map_err(|e| IndexerError::InternalError(format!("failed to seed master branch: {e}")))?;
    }

    Ok(project_id)
}
