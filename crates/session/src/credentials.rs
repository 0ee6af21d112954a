//! Durable storage for session credentials.
//!
//! One logical blob under `<root>/credentials/session.creds`.  The blob is
//! only ever replaced whole — the transport supplies a complete fresh copy
//! on every rotation — so writes go through a temp file and an atomic
//! rename.  Losing the latest rotation can make future resumption fail,
//! which is why `save` errors are surfaced to the caller instead of being
//! swallowed here.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::transport::SessionCredentials;

/// Credential storage I/O failure.  Never panics the process; the session
/// manager logs these and applies its own policy.
#[derive(thiserror::Error, Debug)]
#[error("credential store at {path}: {source}")]
pub struct PersistenceError {
    path: PathBuf,
    #[source]
    source: std::io::Error,
}

/// File-backed store for the single credential blob.
pub struct CredentialStore {
    dir: PathBuf,
    blob_path: PathBuf,
}

impl CredentialStore {
    /// Open (creating if needed) the store under `state_path/credentials`.
    pub fn new(state_path: &Path) -> Result<Self, PersistenceError> {
        let dir = state_path.join("credentials");
        std::fs::create_dir_all(&dir).map_err(|source| PersistenceError {
            path: dir.clone(),
            source,
        })?;
        let blob_path = dir.join("session.creds");
        Ok(Self { dir, blob_path })
    }

    /// Read the persisted blob.  `None` if never paired or after logout.
    pub fn load(&self) -> Result<Option<SessionCredentials>, PersistenceError> {
        match std::fs::read(&self.blob_path) {
            Ok(bytes) => Ok(Some(SessionCredentials::new(bytes))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(PersistenceError {
                path: self.blob_path.clone(),
                source,
            }),
        }
    }

    /// Atomically overwrite the blob: write to a temp file in the same
    /// directory, then rename over the old one.
    pub fn save(&self, credentials: &SessionCredentials) -> Result<(), PersistenceError> {
        let io_err = |source| PersistenceError {
            path: self.blob_path.clone(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(credentials.as_bytes()).map_err(io_err)?;
        tmp.flush().map_err(io_err)?;
        tmp.persist(&self.blob_path)
            .map_err(|e| io_err(e.error))?;

        tracing::debug!(path = %self.blob_path.display(), "session credentials saved");
        Ok(())
    }

    /// Delete the blob.  Missing file is not an error (logout is idempotent).
    pub fn clear(&self) -> Result<(), PersistenceError> {
        match std::fs::remove_file(&self.blob_path) {
            Ok(()) => {
                tracing::info!(path = %self.blob_path.display(), "session credentials cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(PersistenceError {
                path: self.blob_path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, CredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn load_absent_before_first_save() {
        let (_dir, store) = store();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_dir, store) = store();
        let creds = SessionCredentials::new(b"blob-v1".to_vec());
        store.save(&creds).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), creds);
    }

    #[test]
    fn save_replaces_whole_blob() {
        let (_dir, store) = store();
        store
            .save(&SessionCredentials::new(b"first rotation, long blob".to_vec()))
            .unwrap();
        let fresh = SessionCredentials::new(b"v2".to_vec());
        store.save(&fresh).unwrap();
        assert_eq!(store.load().unwrap().unwrap(), fresh);
    }

    #[test]
    fn clear_is_idempotent() {
        let (_dir, store) = store();
        store.clear().unwrap();
        store.save(&SessionCredentials::new(b"x".to_vec())).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }
}
