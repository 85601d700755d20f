//! Hand-written parameterized queries against the catalog schema.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexer_core::entities::{ArtifactKey, BuildType, Commit, Project};
use indexer_util::errors::{IndexerError, IndexerResult};
use sqlx::{PgPool, Postgres, Transaction};

fn db_err(action: &str, e: sqlx::Error) -> IndexerError {
    IndexerError::InternalError(format!("database error ({action}): {e}"))
}

#[derive(sqlx::FromRow)]
struct ProjectRow {
    project_id: i32,
    group_id: String,
    artifact_id: String,
    plugin_id: Option<String>,
    github_owner: String,
    github_repo: String,
    use_snapshots: bool,
    use_semver: bool,
    name: String,
}

#[derive(sqlx::FromRow)]
struct BuildTypeRow {
    project_id: i32,
    build_type_id: i32,
    name: String,
    allows_promotion: bool,
}

/// Load every registered project, with its allowed build types, once at
/// boot. The returned map is meant to be held read-only for the lifetime
/// of the process.
pub async fn load_projects(pool: &PgPool) -> IndexerResult<Vec<Project>> {
    let project_rows: Vec<ProjectRow> = sqlx::query_as(
        "SELECT project_id, group_id, artifact_id, plugin_id, github_owner, github_repo, \
         use_snapshots, use_semver, name FROM projects",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| db_err("load projects", e))?;

    let build_type_rows: Vec<BuildTypeRow> = sqlx::query_as(
        "SELECT pbt.project_id, bt.build_type_id, bt.name, bt.allows_promotion \
         FROM project_build_types pbt JOIN build_types bt USING (build_type_id)",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| db_err("load project build types", e))?;

    let mut allowed: HashMap<i32, Vec<BuildType>> = HashMap::new();
    for row in build_type_rows {
        allowed.entry(row.project_id).or_default().push(BuildType {
            id: row.build_type_id,
            name: row.name,
            allows_promotion: row.allows_promotion,
        });
    }

    Ok(project_rows
        .into_iter()
        .map(|row| Project {
            id: row.project_id,
            group: row.group_id,
            artifact: row.artifact_id,
            plugin_id: row.plugin_id,
            github_owner: row.github_owner,
            github_repo: row.github_repo,
            use_snapshots: row.use_snapshots,
            use_semver: row.use_semver,
            name: row.name,
            allowed_build_types: allowed.remove(&row.project_id).unwrap_or_default(),
        })
        .collect())
}

/// Resolve an existing branch by name. Runs inside the session's
/// transaction so the whole branch-resolution step is atomic with the
/// download/artifact rows it gates, per the session commit/rollback unit.
pub async fn find_branch(
    tx: &mut Transaction<'_, Postgres>,
    project_id: i32,
    name: &str,
) -> IndexerResult<Option<(i32, i32)>> {
    let row: Option<(i32, i32)> =
        sqlx::query_as("SELECT branch_id, build_type_id FROM branches WHERE project_id = $1 AND name = $2")
            .bind(project_id)
            .bind(name)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| db_err("find branch", e))?;
    Ok(row)
}

/// Insert a newly observed branch. Runs inside the session's transaction
/// so it rolls back with everything else if the release fails.
pub async fn insert_branch(
    tx: &mut Transaction<'_, Postgres>,
    project_id: i32,
    build_type_id: i32,
    name: &str,
) -> IndexerResult<i32> {
    let (branch_id,): (i32,) = sqlx::query_as(
        "INSERT INTO branches (project_id, build_type_id, name) VALUES ($1, $2, $3) RETURNING branch_id",
    )
    .bind(project_id)
    .bind(build_type_id)
    .bind(name)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| db_err("insert branch", e))?;
    Ok(branch_id)
}

/// The commit of the most recent download on `branch_id`, if any. Runs
/// inside the session's transaction, same rationale as `find_branch`.
pub async fn latest_download_commit(
    tx: &mut Transaction<'_, Postgres>,
    branch_id: i32,
) -> IndexerResult<Option<String>> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT commit FROM downloads WHERE branch_id = $1 ORDER BY published DESC LIMIT 1")
            .bind(branch_id)
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| db_err("find latest download", e))?;
    Ok(row.map(|(commit,)| commit))
}

#[allow(clippy::too_many_arguments)]
pub async fn insert_download(
    tx: &mut Transaction<'_, Postgres>,
    project_id: i32,
    branch_id: i32,
    version: &str,
    snapshot_version: Option<&str>,
    published: DateTime<Utc>,
    commit: &str,
    label: Option<&str>,
    changelog: Option<&[Commit]>,
) -> IndexerResult<i32> {
    let changelog_json = changelog
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| IndexerError::InternalError(format!("failed to serialize changelog: {e}")))?;

    let (download_id,): (i32,) = sqlx::query_as(
        "INSERT INTO downloads (project_id, branch_id, version, snapshot_version, published, commit, label, changelog) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING download_id",
    )
    .bind(project_id)
    .bind(branch_id)
    .bind(version)
    .bind(snapshot_version)
    .bind(published)
    .bind(commit)
    .bind(label)
    .bind(changelog_json)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| db_err("insert download", e))?;

    Ok(download_id)
}

pub async fn insert_dependency(
    tx: &mut Transaction<'_, Postgres>,
    download_id: i32,
    name: &str,
    version: &str,
) -> IndexerResult<()> {
    sqlx::query("INSERT INTO dependencies (download_id, name, version) VALUES ($1, $2, $3)")
        .bind(download_id)
        .bind(name)
        .bind(version)
        .execute(&mut **tx)
        .await
        .map_err(|e| db_err("insert dependency", e))?;
    Ok(())
}

pub async fn insert_artifact(
    tx: &mut Transaction<'_, Postgres>,
    download_id: i32,
    key: &ArtifactKey,
    size: i64,
    sha1: &str,
    md5: &str,
) -> IndexerResult<()> {
    sqlx::query(
        "INSERT INTO artifacts (download_id, classifier, extension, size, sha1, md5) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(download_id)
    .bind(key.classifier.as_deref().unwrap_or(""))
    .bind(&key.extension)
    .bind(size)
    .bind(sha1)
    .bind(md5)
    .execute(&mut **tx)
    .await
    .map_err(|e| db_err("insert artifact", e))?;
    Ok(())
}

/// Bump a project's `last_updated` to now. Called asynchronously after a
/// successful commit; failures are logged, never surfaced to the
/// publisher.
pub async fn bump_last_updated(pool: &PgPool, project_id: i32) -> IndexerResult<()> {
    sqlx::query("UPDATE projects SET last_updated = now() WHERE project_id = $1")
        .bind(project_id)
        .execute(pool)
        .await
        .map_err(|e| db_err("bump last_updated", e))?;
    Ok(())
}

/// Begin the session's transaction.
pub async fn begin(pool: &PgPool) -> IndexerResult<Transaction<'static, Postgres>> {
    pool.begin().await.map_err(|e| db_err("begin transaction", e))
}

pub async fn commit(tx: Transaction<'_, Postgres>) -> IndexerResult<()> {
    tx.commit().await.map_err(|e| db_err("commit transaction", e))
}

pub async fn rollback(tx: Transaction<'_, Postgres>) -> IndexerResult<()> {
    tx.rollback().await.map_err(|e| db_err("rollback transaction", e))
}
