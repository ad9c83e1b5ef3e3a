//! File-based session store with atomic writes.
//!
//! Stores the session record under `dirs::data_dir()/<namespace>/session.json`.
//! Each save writes a uniquely named owner-only temp file in the same
//! directory and renames it over the record, so concurrent saves never share
//! a temp path and the tokens are never readable by other users.

use crate::errors::RemoteError;
use crate::session::record::SessionRecord;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

const SESSION_FILE: &str = "session.json";

/// File-based session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    /// Directory holding the session file.
    dir: PathBuf,
}

impl SessionStore {
    /// Create a store with the given namespace.
    ///
    /// Files are stored under `dirs::data_dir()/<namespace>/`.
    pub fn new(namespace: &str) -> Result<Self, RemoteError> {
        let base_dir = dirs::data_dir().ok_or_else(|| {
            RemoteError::SessionStore("Could not find data directory".to_string())
        })?;

        Self::with_path(base_dir.join(namespace))
    }

    /// Create a store rooted at a specific directory.
    pub fn with_path(dir: PathBuf) -> Result<Self, RemoteError> {
        fs::create_dir_all(&dir).map_err(|e| {
            RemoteError::SessionStore(format!("Failed to create session dir: {}", e))
        })?;
        Ok(Self { dir })
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Save the session record atomically.
    pub fn save(&self, record: &SessionRecord) -> Result<(), RemoteError> {
        let json = record.to_json()?;

        let mut temp = NamedTempFile::new_in(&self.dir).map_err(|e| {
            RemoteError::SessionStore(format!("Failed to create temp file: {}", e))
        })?;
        temp.write_all(json.as_bytes())
            .and_then(|()| temp.as_file().sync_all())
            .map_err(|e| RemoteError::SessionStore(format!("Failed to write temp file: {}", e)))?;

        temp.persist(self.session_path()).map_err(|e| {
            RemoteError::SessionStore(format!("Failed to rename session file: {}", e.error))
        })?;

        Ok(())
    }

    /// Load the session record, if one was saved.
    pub fn load(&self) -> Result<Option<SessionRecord>, RemoteError> {
        let path = self.session_path();

        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)
            .map_err(|e| RemoteError::SessionStore(format!("Failed to read session file: {}", e)))?;

        SessionRecord::from_json(&json).map(Some)
    }

    /// Delete the session record.
    pub fn clear(&self) -> Result<(), RemoteError> {
        let path = self.session_path();

        if path.exists() {
            fs::remove_file(&path).map_err(|e| {
                RemoteError::SessionStore(format!("Failed to delete session: {}", e))
            })?;
        }

        Ok(())
    }
}
