//! Session Store: the registry of in-flight publishing sessions, each
//! guarded by its own mutex and backed by an idle timer that rolls back
//! and evicts an abandoned session after `SESSION_TIMEOUT_SECS`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use indexer_core::entities::{ArtifactKey, Project};
use indexer_core::session::{InFlightArtifact, MetaState};
use sqlx::{Postgres, Transaction};
use tokio::sync::{watch, Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

/// One publisher's in-flight release. Lives inside `Arc<Mutex<Session>>` so
/// the store can hand out a clonable handle while the controller holds the
/// lock for the whole request.
pub struct Session {
    pub id: String,
    pub project: Arc<Project>,
    pub version: String,
    pub tx: Option<Transaction<'static, Postgres>>,
    pub download_id: Option<i32>,
    pub artifacts: HashMap<ArtifactKey, InFlightArtifact>,
    pub failed: bool,
    pub project_meta: MetaState,
    pub version_meta: MetaState,
    /// Held from session creation until explicit release (on commit or
    /// failure) or the session itself is dropped, whichever comes first.
    project_guard: Option<OwnedMutexGuard<()>>,
}

impl Session {
    pub fn new(id: String, project: Arc<Project>, version: String, project_guard: OwnedMutexGuard<()>) -> Self {
        Self {
            id,
            project,
            version,
            tx: None,
            download_id: None,
            artifacts: HashMap::new(),
            failed: false,
            project_meta: MetaState::default(),
            version_meta: MetaState::default(),
            project_guard: Some(project_guard),
        }
    }

    /// Roll back the transaction if one is open. Idempotent.
    pub async fn rollback(&mut self) {
        if let Some(tx) = self.tx.take() {
            if let Err(e) = indexer_db::queries::rollback(tx).await {
                tracing::error!(session = %self.id, error = %e, "failed to roll back session transaction");
            }
        }
    }

    /// Drop the project mutex guard, letting a waiting publisher for the
    /// same project proceed. Safe to call more than once.
    pub fn release_project_lock(&mut self) {
        self.project_guard.take();
    }

    /// Mark the session failed and unwind it: roll back the transaction
    /// and release the project lock, but leave it registered so a
    /// publisher that keeps retrying observes `FailedDependency` until
    /// the idle timeout cleans it up.
    pub async fn fail(&mut self) {
        self.failed = true;
        self.rollback().await;
        self.release_project_lock();
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

struct Entry {
    session: SessionHandle,
    touch: watch::Sender<()>,
}

/// Registry of live sessions. Read-heavy (`get`) vs. write-rare
/// (`register`/`evict`), so a single reader/writer lock guards the map.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Entry>>,
    timeout: Duration,
}

impl SessionStore {
    pub fn new(timeout: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: RwLock::new(HashMap::new()),
            timeout,
        })
    }

    pub async fn get(&self, id: &str) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(id)?;
        let _ = entry.touch.send(());
        Some(entry.session.clone())
    }

    /// Register a newly created session and spawn its idle-timeout task.
    pub async fn register(self: &Arc<Self>, session: Session) -> SessionHandle {
        let id = session.id.clone();
        let handle: SessionHandle = Arc::new(Mutex::new(session));
        let (touch_tx, touch_rx) = watch::channel(());

        self.sessions.write().await.insert(
            id.clone(),
            Entry {
                session: handle.clone(),
                touch: touch_tx,
            },
        );

        let store = self.clone();
        tokio::spawn(async move {
            store.idle_watch(id, touch_rx).await;
        });

        handle
    }

    /// Remove a session from the registry without touching its transaction
    /// (the caller is expected to have already rolled back or committed).
    pub async fn evict(&self, id: &str) {
        if self.sessions.write().await.remove(id).is_some() {
            debug!(session = id, "evicted session");
        }
    }

    async fn idle_watch(self: Arc<Self>, id: String, mut touch_rx: watch::Receiver<()>) {
        loop {
            tokio::select! {
                changed = touch_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
                _ = tokio::time::sleep(self.timeout) => {
                    break;
                }
            }
        }

        if let Some(handle) = self.get_without_touch(&id).await {
            let mut session = handle.lock().await;
            session.rollback().await;
            session.release_project_lock();
            info!(session = %id, "session idle timeout, rolled back");
        }
        self.evict(&id).await;
    }

    async fn get_without_touch(&self, id: &str) -> Option<SessionHandle> {
        self.sessions.read().await.get(id).map(|e| e.session.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_get_roundtrips() {
        let store = SessionStore::new(Duration::from_secs(300));
        let project = Arc::new(test_project());
        let guard = Arc::new(Mutex::new(())).lock_owned().await;
        let session = Session::new("tok1".to_string(), project, "1.0.0".to_string(), guard);

        store.register(session).await;
        let found = store.get("tok1").await;
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn evict_removes_session() {
        let store = SessionStore::new(Duration::from_secs(300));
        let project = Arc::new(test_project());
        let guard = Arc::new(Mutex::new(())).lock_owned().await;
        let session = Session::new("tok2".to_string(), project, "1.0.0".to_string(), guard);

        store.register(session).await;
        store.evict("tok2").await;
        assert!(store.get("tok2").await.is_none());
    }

    fn test_project() -> Project {
        Project {
            id: 1,
            group: "org.example".to_string(),
            artifact: "y".to_string(),
            plugin_id: None,
            github_owner: "example".to_string(),
            github_repo: "y".to_string(),
            use_snapshots: true,
            use_semver: false,
            name: "Y".to_string(),
            allowed_build_types: vec![],
        }
    }
}
