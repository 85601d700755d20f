//! In-flight, memory-only state a publishing session accumulates (§ 3.2).
//!
//! `MetaState` and `InFlightArtifact` are pure state machines: the runtime
//! scaffolding that drives them (session registry, idle timers, database
//! transactions) belongs to `indexer-server`, which wraps these types in
//! its own `Session` struct alongside a `sqlx::Transaction`.

use indexer_util::errors::{IndexerError, IndexerResult};

/// Lock state of a project- or version-level `maven-metadata.xml`.
///
/// Pending: never touched this session. Locked: a GET has streamed the
/// current bytes and the publisher owes a PUT back. Done: the publisher
/// has written the merged file back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetaState {
    #[default]
    Pending,
    Locked,
    Done,
}

impl MetaState {
    /// Transition Pending -> Locked. Any other starting state is an error
    /// the caller must map according to which state it was (`Locked` means
    /// another session holds it, `Done` means it was already uploaded).
    pub fn lock(&mut self) -> IndexerResult<()> {
        match self {
            MetaState::Pending => {
                *self = MetaState::Locked;
                Ok(())
            }
            MetaState::Locked => Err(IndexerError::Locked),
            MetaState::Done => Err(IndexerError::BadRequest(
                "metadata was already uploaded".to_string(),
            )),
        }
    }

    /// Transition Locked -> Done; any other starting state means the
    /// publisher tried to write metadata it never locked.
    pub fn finish(&mut self) -> IndexerResult<()> {
        if *self != MetaState::Locked {
            return Err(IndexerError::Forbidden(
                "cannot modify metadata without a lock".to_string(),
            ));
        }
        *self = MetaState::Done;
        Ok(())
    }
}

/// Rendezvous point between an uploaded artifact body and its (possibly
/// out-of-order) `.md5`/`.sha1` sidecars.
#[derive(Debug, Clone, Default)]
pub struct InFlightArtifact {
    pub uploaded: bool,
    pub md5: Option<String>,
    pub sha1: Option<String>,
}

impl InFlightArtifact {
    /// Fill the expected MD5 if empty, otherwise require it match.
    pub fn set_or_verify_md5(&mut self, computed: &str) -> IndexerResult<()> {
        set_or_verify(&mut self.md5, computed, "MD5")
    }

    /// Fill the expected SHA-1 if empty, otherwise require it match.
    pub fn set_or_verify_sha1(&mut self, computed: &str) -> IndexerResult<()> {
        set_or_verify(&mut self.sha1, computed, "SHA1")
    }
}

fn set_or_verify(slot: &mut Option<String>, computed: &str, label: &str) -> IndexerResult<()> {
    match slot {
        None => {
            *slot = Some(computed.to_string());
            Ok(())
        }
        Some(expected) if expected == computed => Ok(()),
        Some(expected) => Err(IndexerError::BadRequest(format!(
            "{label} checksum mismatch: {expected} != {computed}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_state_lock_then_finish() {
        let mut state = MetaState::default();
        state.lock().unwrap();
        assert_eq!(state, MetaState::Locked);
        state.finish().unwrap();
        assert_eq!(state, MetaState::Done);
    }

    #[test]
    fn meta_state_lock_while_locked_is_locked_error() {
        let mut state = MetaState::Locked;
        assert!(matches!(state.lock(), Err(IndexerError::Locked)));
    }

    #[test]
    fn meta_state_lock_while_done_is_bad_request() {
        let mut state = MetaState::Done;
        assert!(matches!(state.lock(), Err(IndexerError::BadRequest(_))));
    }

    #[test]
    fn meta_state_finish_without_lock_is_forbidden() {
        let mut state = MetaState::Pending;
        assert!(matches!(state.finish(), Err(IndexerError::Forbidden(_))));
    }

    #[test]
    fn set_or_verify_md5_fills_then_matches() {
        let mut artifact = InFlightArtifact::default();
        artifact.set_or_verify_md5("aaa").unwrap();
        artifact.set_or_verify_md5("aaa").unwrap();
        assert_eq!(artifact.md5.as_deref(), Some("aaa"));
    }

    #[test]
    fn set_or_verify_md5_rejects_mismatch() {
        let mut artifact = InFlightArtifact::default();
        artifact.set_or_verify_md5("aaa").unwrap();
        let err = artifact.set_or_verify_md5("bbb").unwrap_err();
        assert!(matches!(err, IndexerError::BadRequest(_)));
    }

    #[test]
    fn set_or_verify_sha1_independent_of_md5() {
        let mut artifact = InFlightArtifact::default();
        artifact.set_or_verify_md5("aaa").unwrap();
        artifact.set_or_verify_sha1("bbb").unwrap();
        assert_eq!(artifact.md5.as_deref(), Some("aaa"));
        assert_eq!(artifact.sha1.as_deref(), Some("bbb"));
    }
}
