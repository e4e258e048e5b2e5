//! Persistent storage for cotrace data.
//!
//! Uses JSON documents in a single data directory: the proximity event
//! ledger, the device registration, the secret key (base64 text), and the
//! serialized user state blob.

use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::events::ProximityEvent;

const EVENTS_FILE: &str = "events.json";
const REGISTRATION_FILE: &str = "registration.json";
const SECRET_KEY_FILE: &str = "secret.key";
const USER_STATE_FILE: &str = "user_state.json";

/// Storage backend for cotrace data.
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Create a new storage instance rooted at `data_dir`.
    #[must_use]
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Get the default storage location.
    ///
    /// On Linux deployments: `/var/lib/cotrace/`.
    /// Elsewhere: the platform data directory.
    pub fn default_location() -> Result<Self> {
        #[cfg(target_os = "linux")]
        {
            Ok(Self::new(PathBuf::from("/var/lib/cotrace")))
        }
        #[cfg(not(target_os = "linux"))]
        {
            let dirs = directories::ProjectDirs::from("", "", "cotrace").ok_or_else(|| {
                CoreError::Storage("Cannot determine data directory".to_string())
            })?;
            Ok(Self::new(dirs.data_dir().to_path_buf()))
        }
    }

    /// Load the proximity event ledger. Missing file means an empty ledger.
    pub fn load_events(&self) -> Result<Vec<ProximityEvent>> {
        match self.read_document(EVENTS_FILE)? {
            Some(content) => Ok(serde_json::from_str(&content)?),
            None => Ok(Vec::new()),
        }
    }

    /// Persist the proximity event ledger.
    pub fn save_events(&self, events: &[ProximityEvent]) -> Result<()> {
        let content = serde_json::to_string(events)?;
        self.write_document(EVENTS_FILE, &content)
    }

    /// Load the registration document, if one was ever stored.
    pub fn load_registration(&self) -> Result<Option<String>> {
        self.read_document(REGISTRATION_FILE)
    }

    /// Persist the registration document.
    pub fn save_registration(&self, content: &str) -> Result<()> {
        self.write_document(REGISTRATION_FILE, content)
    }

    /// Load the base64 secret key text, if one was ever stored.
    pub fn load_secret_key(&self) -> Result<Option<String>> {
        self.read_document(SECRET_KEY_FILE)
    }

    /// Persist the base64 secret key text, overwriting any prior key.
    pub fn save_secret_key(&self, base64_key: &str) -> Result<()> {
        self.write_document(SECRET_KEY_FILE, base64_key)
    }

    /// Load the serialized user state blob.
    pub fn load_user_state(&self) -> Result<Option<String>> {
        self.read_document(USER_STATE_FILE)
    }

    /// Persist the serialized user state blob.
    pub fn save_user_state(&self, content: &str) -> Result<()> {
        self.write_document(USER_STATE_FILE, content)
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    fn read_document(&self, name: &str) -> Result<Option<String>> {
        let path = self.document_path(name);
        if path.exists() {
            Ok(Some(read_to_string(&path)?))
        } else {
            Ok(None)
        }
    }

    fn write_document(&self, name: &str, content: &str) -> Result<()> {
        let path = self.document_path(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(CoreError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::new(dir.path().to_path_buf());
        (dir, storage)
    }

    #[test]
    fn test_missing_documents_are_absent() {
        let (_dir, storage) = storage();
        assert!(storage.load_events().unwrap().is_empty());
        assert!(storage.load_registration().unwrap().is_none());
        assert!(storage.load_secret_key().unwrap().is_none());
        assert!(storage.load_user_state().unwrap().is_none());
    }

    #[test]
    fn test_events_round_trip() {
        let (_dir, storage) = storage();
        let seen = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
        let event = ProximityEvent::new(vec![1, 2, 3], vec![-60], vec![seen], seen, 0).unwrap();

        storage.save_events(std::slice::from_ref(&event)).unwrap();
        let loaded = storage.load_events().unwrap();
        assert_eq!(loaded, vec![event]);
    }

    #[test]
    fn test_secret_key_overwrite() {
        let (_dir, storage) = storage();
        storage.save_secret_key("older-key").unwrap();
        storage.save_secret_key("newer-key").unwrap();
        assert_eq!(storage.load_secret_key().unwrap().as_deref(), Some("newer-key"));
    }

    #[test]
    fn test_user_state_blob_round_trip() {
        let (_dir, storage) = storage();
        storage.save_user_state(r#"{"type":"Default"}"#).unwrap();
        assert_eq!(
            storage.load_user_state().unwrap().as_deref(),
            Some(r#"{"type":"Default"}"#)
        );
    }
}
