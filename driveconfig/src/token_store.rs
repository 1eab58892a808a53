use crate::APP_NAME;
use drivesafe::TokenStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

const AUTH_CONFIG: &str = "auth";

#[derive(Debug, Default, Serialize, Deserialize)]
struct AuthPrefs {
    access_token: Option<String>,
}

/// Bearer token persisted in its own confy file next to the main config.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileTokenStore {
    /// Opens the store at the standard OS location.
    ///
    /// # Errors
    /// Returns an error if the configuration directory cannot be determined.
    pub fn open() -> crate::Result<Self> {
        let path = confy::get_configuration_file_path(APP_NAME, Some(AUTH_CONFIG))?;
        Ok(Self::at(path))
    }

    /// Opens the store backed by `path`. The file is created on first write.
    #[must_use]
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&self, prefs: &AuthPrefs) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = confy::store_path(&self.path, prefs) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to persist token");
        }
    }
}

impl TokenStore for FileTokenStore {
    fn save(&self, token: &str) {
        self.write(&AuthPrefs {
            access_token: Some(token.to_string()),
        });
    }

    fn get(&self) -> Option<String> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        if !self.path.exists() {
            return None;
        }
        match confy::load_path::<AuthPrefs>(&self.path) {
            Ok(prefs) => prefs.access_token.filter(|token| !token.is_empty()),
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "failed to read token");
                None
            }
        }
    }

    fn clear(&self) {
        self.write(&AuthPrefs::default());
    }
}

#[cfg(test)]
mod tests {
    use super::FileTokenStore;
    use drivesafe::TokenStore;

    #[test]
    fn save_get_clear_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::at(dir.path().join("auth.toml"));

        assert_eq!(store.get(), None);
        store.save("A");
        assert_eq!(store.get().as_deref(), Some("A"));
        store.clear();
        assert_eq!(store.get(), None);
    }

    #[test]
    fn token_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.toml");
        FileTokenStore::at(&path).save("persisted");

        let reopened = FileTokenStore::at(&path);
        assert_eq!(reopened.get().as_deref(), Some("persisted"));
    }

    #[test]
    fn empty_token_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileTokenStore::at(dir.path().join("auth.toml"));
        store.save("");
        assert_eq!(store.get(), None);
    }
}
