//! User credential storage — the API key for the upstream provider.
//!
//! Persisted independently from chat data as a small versioned JSON file
//! (`credential.json`) in the app data directory. Loaded once at startup;
//! every change is written atomically (temp file + rename) so a crash can
//! never leave a torn file. The key itself is never logged.

use std::fs;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Bump when the on-disk layout changes.
const CREDENTIAL_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct CredentialFile {
    version: u32,
    api_key: String,
}

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Credential file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// In-memory view of the stored credential, kept in sync with disk.
pub struct ApiKeyStore {
    path: PathBuf,
    key: Mutex<Option<String>>,
}

impl ApiKeyStore {
    /// Load the credential from `path`. A missing file means no credential;
    /// an unreadable or mismatched file is treated the same (with a warning)
    /// rather than blocking startup.
    pub fn load(path: PathBuf) -> Self {
        let key = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<CredentialFile>(&raw) {
                Ok(file) if file.version == CREDENTIAL_SCHEMA_VERSION && !file.api_key.is_empty() => {
                    Some(file.api_key)
                }
                Ok(file) => {
                    if file.version != CREDENTIAL_SCHEMA_VERSION {
                        tracing::warn!(
                            version = file.version,
                            "Unknown credential schema version, ignoring stored key"
                        );
                    }
                    None
                }
                Err(e) => {
                    tracing::warn!("Credential file unreadable, ignoring: {e}");
                    None
                }
            },
            Err(_) => None,
        };

        Self {
            path,
            key: Mutex::new(key),
        }
    }

    /// The stored API key, if any. Empty keys are never stored.
    pub fn api_key(&self) -> Option<String> {
        self.key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Store a new key and persist it. An empty (after trim) key clears the
    /// credential instead.
    pub fn set_api_key(&self, key: &str) -> Result<(), CredentialError> {
        let trimmed = key.trim();
        if trimmed.is_empty() {
            return self.clear();
        }

        let file = CredentialFile {
            version: CREDENTIAL_SCHEMA_VERSION,
            api_key: trimmed.to_string(),
        };
        self.write_atomic(&serde_json::to_string_pretty(&file)?)?;

        *self.key.lock().unwrap_or_else(PoisonError::into_inner) = Some(trimmed.to_string());
        Ok(())
    }

    /// Forget the credential and remove the file.
    pub fn clear(&self) -> Result<(), CredentialError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *self.key.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }

    /// Write via temp file + rename so readers never see a partial file.
    fn write_atomic(&self, contents: &str) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
