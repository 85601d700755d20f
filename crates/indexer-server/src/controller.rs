//! Ingestion Controller: the two HTTP routes (`GET`/`PUT`) a publisher
//! talks to, and the state machine that turns a stream of PUTs into a
//! committed `downloads` row.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use indexer_core::entities::{ArtifactKey, Project};
use indexer_core::session::MetaState;
use indexer_maven::{auth::BasicAuth, checksum, jar, path};
use indexer_storage::{ByteStream, StorageBackend};
use indexer_util::errors::{IndexerError, IndexerResult};
use indexer_vcs::ChangelogProvider;
use rand::RngCore;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::purge::CachePurger;
use crate::session::{Session, SessionHandle, SessionStore};

fn new_session_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn to_key(artifact: &path::ArtifactType) -> ArtifactKey {
    ArtifactKey {
        classifier: artifact.classifier.clone(),
        extension: artifact.extension.clone(),
    }
}

/// Trim one matching pair of surrounding `[...]` brackets, as used to
/// denote a dependency version range in plugin metadata.
fn strip_brackets(s: &str) -> &str {
    if s.len() >= 2 && s.starts_with('[') && s.ends_with(']') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

pub struct GetOutcome {
    pub cookie: Option<String>,
    pub stream: ByteStream,
}

pub struct PutOutcome {
    pub cookie: Option<String>,
}

pub struct Controller {
    projects: HashMap<(String, String), Arc<Project>>,
    project_locks: HashMap<(String, String), Arc<Mutex<()>>>,
    sessions: Arc<SessionStore>,
    pool: PgPool,
    storage: Arc<dyn StorageBackend>,
    changelog: Arc<dyn ChangelogProvider>,
    purger: Arc<dyn CachePurger>,
    pub auth: BasicAuth,
    config: Config,
}

impl Controller {
    pub fn new(
        config: Config,
        pool: PgPool,
        projects: Vec<Project>,
        storage: Arc<dyn StorageBackend>,
        changelog: Arc<dyn ChangelogProvider>,
        purger: Arc<dyn CachePurger>,
    ) -> Self {
        let auth = BasicAuth::new(&config.auth_username, &config.auth_password);
        let sessions = SessionStore::new(Duration::from_secs(config.session_timeout_secs));

        let mut project_map = HashMap::with_capacity(projects.len());
        let mut lock_map = HashMap::with_capacity(projects.len());
        for project in projects {
            let key = project.identifier();
            lock_map.insert(key.clone(), Arc::new(Mutex::new(())));
            project_map.insert(key, Arc::new(project));
        }

        Self {
            projects: project_map,
            project_locks: lock_map,
            sessions,
            pool,
            storage,
            changelog,
            purger,
            auth,
            config,
        }
    }

    pub fn upload_prefix(&self) -> &str {
        &self.config.upload_prefix
    }

    async fn require_session(&self, cookie: &Option<String>, project: &Arc<Project>) -> IndexerResult<Option<SessionHandle>> {
        let Some(token) = cookie else {
            return Ok(None);
        };
        let Some(handle) = self.sessions.get(token).await else {
            return Err(IndexerError::Forbidden("unknown session".to_string()));
        };
        {
            let session = handle.lock().await;
            if session.project.id != project.id {
                return Err(IndexerError::Forbidden("session does not belong to this project".to_string()));
            }
        }
        Ok(Some(handle))
    }

    async fn create_session(&self, project: Arc<Project>, version: String) -> SessionHandle {
        let lock = self
            .project_locks
            .get(&project.identifier())
            .cloned()
            .expect("every loaded project has a lock entry");
        let guard = lock.lock_owned().await;
        let token = new_session_token();
        let session = Session::new(token, project, version, guard);
        self.sessions.register(session).await
    }

    async fn get_or_create_session(
        &self,
        project: &Arc<Project>,
        version: &str,
        cookie: Option<String>,
    ) -> IndexerResult<(SessionHandle, Option<String>)> {
        if let Some(handle) = self.require_session(&cookie, project).await? {
            return Ok((handle, None));
        }
        let handle = self.create_session(project.clone(), version.to_string()).await;
        let token = handle.lock().await.id.clone();
        Ok((handle, Some(token)))
    }

    /// §4.5.2 — `GET {prefix}/*path`.
    pub async fn handle_get(
        &self,
        path_str: &str,
        cookie: Option<String>,
    ) -> IndexerResult<GetOutcome> {
        let parsed = path::parse_path(path_str, false)?;
        if !parsed.metadata {
            return Err(IndexerError::Forbidden("can only download maven metadata".to_string()));
        }

        let Some(project) = self
            .projects
            .get(&(parsed.group_id.clone(), parsed.artifact_id.clone()))
            .cloned()
        else {
            let stream = self.storage.download(path_str).await?;
            return Ok(GetOutcome { cookie: None, stream });
        };

        let version_level = !parsed.version.is_empty();

        let (handle, new_cookie) = if version_level {
            if !project.use_snapshots {
                return Err(IndexerError::BadRequest("project does not use snapshots".to_string()));
            }
            self.get_or_create_session(&project, &parsed.version, cookie).await?
        } else {
            let handle = self
                .require_session(&cookie, &project)
                .await?
                .ok_or_else(|| IndexerError::Forbidden("missing session".to_string()))?;
            (handle, None)
        };

        let result = self.lock_and_stream(&handle, version_level, path_str).await;

        if let Err(e) = &result {
            if !matches!(e, IndexerError::NotFound(_)) {
                handle.lock().await.fail().await;
            }
        }

        Ok(GetOutcome {
            cookie: new_cookie,
            stream: result?,
        })
    }

    async fn lock_and_stream(&self, handle: &SessionHandle, version_level: bool, path_str: &str) -> IndexerResult<ByteStream> {
        let mut session = handle.lock().await;
        if session.failed {
            return Err(IndexerError::FailedDependency);
        }
        let state = if version_level {
            &mut session.version_meta
        } else {
            &mut session.project_meta
        };
        state.lock()?;
        self.storage.download(path_str).await
    }

    /// §4.5.3 — `PUT {prefix}/*path`.
    pub async fn handle_put(
        &self,
        path_str: &str,
        cookie: Option<String>,
        content_length: Option<u64>,
        body: Vec<u8>,
        query: &HashMap<String, String>,
    ) -> IndexerResult<PutOutcome> {
        let length = content_length.ok_or(IndexerError::LengthRequired)?;
        if length == 0 {
            return Err(IndexerError::LengthRequired);
        }
        if length > indexer_core::MAX_FILE_SIZE {
            return Err(IndexerError::PayloadTooLarge);
        }

        let parsed = path::parse_path(path_str, true)?;

        let Some(project) = self
            .projects
            .get(&(parsed.group_id.clone(), parsed.artifact_id.clone()))
            .cloned()
        else {
            self.storage.upload(path_str, body).await?;
            return Ok(PutOutcome { cookie: None });
        };

        if parsed.snapshot && !project.use_snapshots {
            return Err(IndexerError::BadRequest("project does not use snapshots".to_string()));
        }

        let is_metadata = parsed.metadata && parsed.sidecar == path::SidecarKind::File;
        let is_sidecar = matches!(parsed.sidecar, path::SidecarKind::Md5 | path::SidecarKind::Sha1);
        let is_primary = parsed.is_primary_jar();

        let (handle, new_cookie) = if is_primary && !parsed.snapshot {
            if let Some(handle) = self.require_session(&cookie, &project).await? {
                (handle, None)
            } else {
                let handle = self.create_session(project.clone(), parsed.version.clone()).await;
                handle.lock().await.version_meta = MetaState::Done;
                let token = handle.lock().await.id.clone();
                (handle, Some(token))
            }
        } else {
            let handle = self
                .require_session(&cookie, &project)
                .await?
                .ok_or_else(|| IndexerError::Forbidden("missing session".to_string()))?;
            (handle, None)
        };

        let apply_result = self
            .apply_put(&handle, &project, &parsed, &body, query, is_metadata, is_sidecar, is_primary)
            .await;

        let result = match apply_result {
            Ok(()) => self.storage.upload(path_str, body).await,
            Err(e) => Err(e),
        };

        if result.is_err() {
            handle.lock().await.fail().await;
        }
        result?;

        Ok(PutOutcome { cookie: new_cookie })
    }

    #[allow(clippy::too_many_arguments)]
    async fn apply_put(
        &self,
        handle: &SessionHandle,
        project: &Arc<Project>,
        parsed: &path::ParsedPath,
        body: &[u8],
        query: &HashMap<String, String>,
        is_metadata: bool,
        is_sidecar: bool,
        is_primary: bool,
    ) -> IndexerResult<()> {
        let mut session = handle.lock().await;
        if session.failed {
            return Err(IndexerError::FailedDependency);
        }

        if is_metadata {
            let version_level = !parsed.version.is_empty();
            let state = if version_level {
                &mut session.version_meta
            } else {
                &mut session.project_meta
            };
            state.finish()?;

            let should_commit =
                session.project_meta == MetaState::Done && session.version_meta == MetaState::Done && session.tx.is_some();

            if should_commit {
                let tx = session.tx.take().expect("checked above");
                indexer_db::queries::commit(tx).await?;
                session.release_project_lock();

                let project_id = project.id;
                let group = project.group.clone();
                let artifact = project.artifact.clone();
                let pool = self.pool.clone();
                let purger = self.purger.clone();
                tokio::spawn(async move {
                    if let Err(e) = indexer_db::queries::bump_last_updated(&pool, project_id).await {
                        tracing::error!(error = %e, "failed to bump project last_updated");
                    }
                    purger.purge_project(&group, &artifact).await;
                });

                let id = session.id.clone();
                drop(session);
                self.sessions.evict(&id).await;
            }

            return Ok(());
        }

        if is_sidecar {
            let artifact_type = parsed
                .artifact
                .as_ref()
                .ok_or_else(|| IndexerError::BadRequest("sidecar without an artifact target".to_string()))?;
            let key = to_key(artifact_type);
            let decoded = checksum::decode_hash(body);
            let entry = session.artifacts.entry(key).or_default();
            match parsed.sidecar {
                path::SidecarKind::Md5 => entry.set_or_verify_md5(&decoded)?,
                path::SidecarKind::Sha1 => entry.set_or_verify_sha1(&decoded)?,
                path::SidecarKind::File => unreachable!("sidecar dispatch only reached for md5/sha1"),
            }
            return Ok(());
        }

        let artifact_type = parsed
            .artifact
            .as_ref()
            .ok_or_else(|| IndexerError::BadRequest("missing artifact classifier/extension".to_string()))?;
        let key = to_key(artifact_type);

        if is_primary {
            if session.download_id.is_none() {
                if session.tx.is_none() {
                    session.tx = Some(indexer_db::queries::begin(&self.pool).await?);
                }
                let jar_contents = jar::read_jar(body, project.plugin_id.is_some())?;
                self.create_download(&mut session, project, parsed, &jar_contents, query).await?;
            }
        } else if session.download_id.is_none() {
            return Err(IndexerError::BadRequest(
                "classifier artifact uploaded before the primary jar".to_string(),
            ));
        }

        self.artifact_create(&mut session, &key, body).await
    }

    /// §4.5.4 — invoked once per session, the first time the primary jar
    /// is processed.
    async fn create_download(
        &self,
        session: &mut Session,
        project: &Arc<Project>,
        parsed: &path::ParsedPath,
        jar_contents: &jar::JarContents,
        query: &HashMap<String, String>,
    ) -> IndexerResult<()> {
        let manifest = jar_contents
            .manifest
            .as_ref()
            .ok_or_else(|| IndexerError::BadRequest("missing JAR manifest".to_string()))?;

        let commit = manifest
            .get("Git-Commit")
            .cloned()
            .ok_or_else(|| IndexerError::BadRequest("manifest missing Git-Commit".to_string()))?;

        let branch_name = if self.config.dev_mode { query.get("branch").cloned() } else { None }
            .or_else(|| manifest.get("Git-Branch").map(|b| b.trim_start_matches("origin/").to_string()))
            .ok_or_else(|| IndexerError::BadRequest("manifest missing Git-Branch".to_string()))?;

        if branch_name.contains('/') {
            return Err(IndexerError::BadRequest(format!("invalid branch name: {branch_name}")));
        }

        let published = if self.config.dev_mode {
            query
                .get("publishedAt")
                .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
                .map(|dt| dt.with_timezone(&Utc))
        } else {
            None
        }
        .or_else(|| jar_contents.manifest_time.and_then(|t| DateTime::from_timestamp(t.unix_timestamp(), 0)))
        .ok_or_else(|| IndexerError::BadRequest("no manifest modification time and no override".to_string()))?;

        let tx = session.tx.as_mut().expect("transaction started before createDownload");
        let existing = indexer_db::queries::find_branch(tx, project.id, &branch_name).await?;
        let (branch_id, build_type) = match existing {
            Some((branch_id, build_type_id)) => {
                let build_type = project.allowed_build_types.iter().find(|bt| bt.id == build_type_id).cloned();
                (branch_id, build_type)
            }
            None => {
                let build_type_name = path::substring_before_dash(&branch_name);
                let build_type = project
                    .build_type_by_name(build_type_name)
                    .cloned()
                    .ok_or_else(|| IndexerError::BadRequest("unknown build type".to_string()))?;
                let tx = session.tx.as_mut().expect("transaction started before createDownload");
                let branch_id = indexer_db::queries::insert_branch(tx, project.id, build_type.id, &branch_name).await?;
                (branch_id, Some(build_type))
            }
        };

        let build_type = build_type
            .ok_or_else(|| IndexerError::InternalError("resolved branch has no known build type".to_string()))?;

        let recommended = query.get("recommended").map(String::as_str) == Some("true");
        if recommended && !build_type.allows_promotion {
            return Err(IndexerError::BadRequest("build type does not allow promotion".to_string()));
        }

        let mut matched_plugin_metadata = None;
        if let Some(plugin_id) = &project.plugin_id {
            let entries = jar_contents
                .plugin_metadata
                .as_ref()
                .ok_or_else(|| IndexerError::BadRequest("missing plugin metadata".to_string()))?;
            let matched = entries
                .iter()
                .find(|e| &e.modid == plugin_id)
                .ok_or_else(|| IndexerError::BadRequest("plugin id not found in metadata".to_string()))?;
            if matched.version != session.version {
                return Err(IndexerError::BadRequest("plugin metadata version mismatch".to_string()));
            }
            matched_plugin_metadata = Some(matched.clone());
        }

        let predecessor_commit = {
            let tx = session.tx.as_mut().expect("transaction started before createDownload");
            indexer_db::queries::latest_download_commit(tx, branch_id).await?
        };

        let require_changelog = if self.config.dev_mode {
            query
                .get("requireChangelog")
                .map(|v| v == "true")
                .unwrap_or(self.config.require_changelog)
        } else {
            self.config.require_changelog
        };

        let changelog = match &predecessor_commit {
            Some(parent) if parent != &commit => match self.changelog.generate(&project.repo_url(), &commit, parent).await {
                Ok(commits) => Some(commits),
                Err(e) if !require_changelog => {
                    tracing::warn!(error = %e, "changelog synthesis failed, continuing without one");
                    None
                }
                Err(e) => return Err(e),
            },
            Some(_) => Some(Vec::new()),
            None => None,
        };

        let snapshot_version = if parsed.snapshot { Some(parsed.display_version.as_str()) } else { None };
        let label = recommended.then_some("recommended");

        let tx = session.tx.as_mut().expect("transaction started before createDownload");
        let download_id = indexer_db::queries::insert_download(
            tx,
            project.id,
            branch_id,
            &session.version,
            snapshot_version,
            published,
            &commit,
            label,
            changelog.as_deref(),
        )
        .await?;

        if let Some(meta) = matched_plugin_metadata {
            for dep in &meta.required_mods {
                let (name, version) = jar::split_dependency(dep);
                if let Some(version) = version {
                    if !version.is_empty() {
                        let tx = session.tx.as_mut().expect("transaction still open");
                        indexer_db::queries::insert_dependency(tx, download_id, &name, strip_brackets(&version)).await?;
                    }
                }
            }
        }

        session.download_id = Some(download_id);
        Ok(())
    }

    /// §4.5.5 — checksum rendezvous plus cataloging.
    async fn artifact_create(&self, session: &mut Session, key: &ArtifactKey, body: &[u8]) -> IndexerResult<()> {
        let md5 = checksum::hex_md5(body);
        let sha1 = checksum::hex_sha1(body);

        let entry = session.artifacts.entry(key.clone()).or_default();
        if entry.uploaded {
            return Err(IndexerError::Conflict("artifact already uploaded".to_string()));
        }
        entry.set_or_verify_md5(&md5)?;
        entry.set_or_verify_sha1(&sha1)?;
        entry.uploaded = true;

        if key.extension == indexer_core::INDEXED_EXTENSION {
            let download_id = session
                .download_id
                .ok_or_else(|| IndexerError::InternalError("indexing artifact without a download row".to_string()))?;
            let tx = session
                .tx
                .as_mut()
                .ok_or_else(|| IndexerError::InternalError("indexing artifact outside a transaction".to_string()))?;
            indexer_db::queries::insert_artifact(tx, download_id, key, body.len() as i64, &sha1, &md5).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_brackets_trims_one_pair() {
        assert_eq!(strip_brackets("[1.2,1.3]"), "1.2,1.3");
        assert_eq!(strip_brackets("1.2"), "1.2");
        assert_eq!(strip_brackets("["), "[");
    }

    #[test]
    fn session_token_is_64_hex_chars() {
        let token = new_session_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
