//! File-backed session storage and browser capture/restore.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cdp_driver::PageDriver;
use inkpost_core_types::StoredSession;
use tracing::{debug, info, warn};

use crate::errors::SessionStoreError;

/// Owns the session file. All reads are tolerant: a missing or corrupt file
/// means "no session", it never aborts a run.
#[derive(Clone, Debug)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Option<StoredSession> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) => {
                debug!(path = %self.path.display(), %error, "no session file to load");
                return None;
            }
        };
        match serde_json::from_str::<StoredSession>(&raw) {
            Ok(session) => {
                info!(
                    path = %self.path.display(),
                    captured_at = %session.captured_at,
                    cookies = session.cookies.len(),
                    "loaded stored session"
                );
                Some(session)
            }
            Err(error) => {
                warn!(path = %self.path.display(), %error, "session file is corrupt, ignoring");
                None
            }
        }
    }

    pub fn save(&self, session: &StoredSession) -> Result<(), SessionStoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, raw)?;
        info!(
            path = %self.path.display(),
            cookies = session.cookies.len(),
            storage = session.storage.len(),
            "persisted session"
        );
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionStoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error.into()),
        }
    }
}

/// Capture the browser's current authentication artifacts.
pub async fn capture(page: &Arc<dyn PageDriver>) -> Result<StoredSession, SessionStoreError> {
    let cookies = page.cookies().await?;
    let storage = page.local_storage().await?;
    debug!(cookies = cookies.len(), storage = storage.len(), "captured session artifacts");
    Ok(StoredSession::new(cookies, storage))
}

/// Write stored artifacts back into the browser. Meant to run before the
/// first platform navigation of a run.
pub async fn restore(
    page: &Arc<dyn PageDriver>,
    session: &StoredSession,
) -> Result<(), SessionStoreError> {
    page.set_cookies(&session.cookies).await?;
    if !session.storage.is_empty() {
        page.set_local_storage(&session.storage).await?;
    }
    debug!(cookies = session.cookies.len(), "restored session artifacts");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cdp_driver::fixture::FixturePage;
    use inkpost_core_types::{CookieRecord, StorageEntry};

    fn sample_session() -> StoredSession {
        StoredSession::new(
            vec![CookieRecord {
                name: "sid".into(),
                value: "s3cr3t-token".into(),
                domain: ".blog.example.com".into(),
                path: "/".into(),
                secure: true,
                http_only: true,
                expiry: None,
            }],
            vec![StorageEntry {
                key: "deviceToken".into(),
                value: "trusted".into(),
            }],
        )
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        let session = sample_session();
        store.save(&session).unwrap();
        assert_eq!(store.load(), Some(session));
    }

    #[test]
    fn missing_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("absent.json"));
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_file_is_ignored_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = SessionStore::new(&path);
        assert_eq!(store.load(), None);
    }

    #[test]
    fn clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path().join("session.json"));
        store.save(&sample_session()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }

    #[tokio::test]
    async fn capture_and_restore_move_artifacts_through_the_driver() {
        let page: Arc<dyn PageDriver> = Arc::new(FixturePage::new());
        let session = sample_session();
        restore(&page, &session).await.unwrap();
        let captured = capture(&page).await.unwrap();
        assert_eq!(captured.cookies, session.cookies);
        assert_eq!(captured.storage, session.storage);
    }
}
