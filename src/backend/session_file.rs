//! Persisted session
//!
//! Keeps the current session on disk as JSON so a restarted client
//! resumes without signing in again.

use std::path::{Path, PathBuf};

use super::error::{BackendError, BackendResult};
use super::types::AuthSession;

/// JSON file holding the current session
#[derive(Debug, Clone)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<local data dir>/futurecal/session.json`
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .map(|p| p.join("futurecal").join("session.json"))
            .unwrap_or_else(|| PathBuf::from("./futurecal_session.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session; a missing file is `None`
    pub fn load(&self) -> BackendResult<Option<AuthSession>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BackendError::SessionFile(format!(
                    "{}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        match serde_json::from_str(&content) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Discarding unreadable session file");
                Ok(None)
            }
        }
    }

    pub fn save(&self, session: &AuthSession) -> BackendResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| BackendError::SessionFile(format!("{}: {}", parent.display(), e)))?;
        }
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, content)
            .map_err(|e| BackendError::SessionFile(format!("{}: {}", self.path.display(), e)))
    }

    pub fn clear(&self) -> BackendResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BackendError::SessionFile(format!(
                "{}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::types::AuthUser;
    use chrono::Utc;
    use tempfile::tempdir;

    fn session() -> AuthSession {
        AuthSession {
            access_token: "access".to_string(),
            refresh_token: Some("refresh".to_string()),
            expires_at: Some(Utc::now().timestamp() + 3600),
            user: AuthUser {
                id: "u-1".to_string(),
                email: Some("ana@example.com".to_string()),
                email_confirmed_at: Some(Utc::now()),
                created_at: Utc::now(),
            },
        }
    }

    #[test]
    fn test_save_load_clear() {
        let dir = tempdir().unwrap();
        let file = SessionFile::new(dir.path().join("nested").join("session.json"));

        assert!(file.load().unwrap().is_none());

        let stored = session();
        file.save(&stored).unwrap();
        assert_eq!(file.load().unwrap(), Some(stored));

        file.clear().unwrap();
        assert!(file.load().unwrap().is_none());
        // Clearing twice is fine
        file.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "{not json").unwrap();

        let file = SessionFile::new(&path);
        assert!(file.load().unwrap().is_none());
    }
}
