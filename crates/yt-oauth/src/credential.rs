use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::OAuthError;

/// Tokens are considered expired this many seconds before their real expiry.
pub const EXPIRY_SKEW_SECS: u64 = 60;

/// OAuth 2.0 credential as persisted between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Access token for API requests
    pub access_token: String,
    /// Refresh token for getting new access tokens, if the authority issued one
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type (usually "Bearer")
    pub token_type: String,
    /// Expiry time as Unix timestamp (seconds since epoch)
    pub expires_at: u64,
    /// Scopes granted to this credential
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Token endpoint that issued the credential
    pub token_uri: String,
    /// OAuth client the credential was issued to
    pub client_id: String,
}

impl Credential {
    /// Check if the token is expired or will expire within [`EXPIRY_SKEW_SECS`]
    pub fn is_expired(&self, now: u64) -> bool {
        self.access_token.is_empty() || now.saturating_add(EXPIRY_SKEW_SECS) >= self.expires_at
    }

    /// Check that every required scope was granted
    pub fn has_scopes(&self, required: &[String]) -> bool {
        let granted: BTreeSet<&str> = self.scopes.iter().map(String::as_str).collect();
        required.iter().all(|scope| granted.contains(scope.as_str()))
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token
            .as_deref()
            .is_some_and(|token| !token.is_empty())
    }
}

/// Current time as Unix seconds
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

/// On-disk home of a single [`Credential`].
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored credential.
    ///
    /// A missing file yields `None`. So does an unreadable or malformed one,
    /// after logging a warning: the caller re-authorizes and overwrites it.
    pub fn load(&self) -> Option<Credential> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No stored OAuth token");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to read OAuth token file");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring malformed OAuth token file");
                None
            }
        }
    }

    /// Fail early when the credential could not be saved later.
    ///
    /// Creates the parent directories and a throwaway temporary file in them.
    pub fn ensure_writable(&self) -> Result<(), OAuthError> {
        self.temp_file()
            .map(drop)
            .map_err(|source| OAuthError::Storage {
                path: self.path.clone(),
                source,
            })
    }

    fn temp_file(&self) -> std::io::Result<tempfile::NamedTempFile> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;
        tempfile::NamedTempFile::new_in(&dir)
    }

    /// Save the credential, replacing any previous content atomically.
    ///
    /// The JSON is written to a temporary file next to the target and renamed
    /// over it, so a later run sees either the old or the new credential.
    /// The temporary file is created owner read/write only on Unix-like systems.
    pub fn save(&self, credential: &Credential) -> Result<(), OAuthError> {
        let storage_error = |source: std::io::Error| OAuthError::Storage {
            path: self.path.clone(),
            source,
        };

        let content = serde_json::to_string_pretty(credential)
            .map_err(|e| storage_error(std::io::Error::other(e)))?;

        let mut file = self.temp_file().map_err(storage_error)?;
        file.write_all(content.as_bytes()).map_err(storage_error)?;
        file.as_file().sync_all().map_err(storage_error)?;
        file.persist(&self.path)
            .map_err(|e| storage_error(e.error))?;

        tracing::debug!(path = %self.path.display(), "OAuth token saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credential(expires_at: u64) -> Credential {
        Credential {
            access_token: "ya29.access".to_string(),
            refresh_token: Some("1//refresh".to_string()),
            token_type: "Bearer".to_string(),
            expires_at,
            scopes: vec!["https://www.googleapis.com/auth/youtube.force-ssl".to_string()],
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
            client_id: "client.apps.googleusercontent.com".to_string(),
        }
    }

    #[test]
    fn expiry_includes_skew() {
        let token = credential(1_000);
        assert!(!token.is_expired(1_000 - EXPIRY_SKEW_SECS - 1));
        assert!(token.is_expired(1_000 - EXPIRY_SKEW_SECS));
        assert!(token.is_expired(2_000));
    }

    #[test]
    fn empty_access_token_is_expired() {
        let mut token = credential(u64::MAX / 2);
        token.access_token.clear();
        assert!(token.is_expired(0));
    }

    #[test]
    fn scope_superset_is_satisfied() {
        let mut token = credential(0);
        token.scopes.push("openid".to_string());
        assert!(token.has_scopes(&["openid".to_string()]));
        assert!(token.has_scopes(&[]));
        assert!(!token.has_scopes(&["email".to_string()]));
    }

    #[test]
    fn blank_refresh_token_does_not_count() {
        let mut token = credential(0);
        token.refresh_token = Some(String::new());
        assert!(!token.has_refresh_token());
        token.refresh_token = None;
        assert!(!token.has_refresh_token());
    }

    #[test]
    fn save_then_load_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("nested").join("token.json"));
        let token = credential(1_700_000_000);

        store.save(&token).unwrap();
        assert_eq!(store.load(), Some(token));
    }

    #[test]
    fn save_overwrites_previous_credential() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        store.save(&credential(1)).unwrap();

        let mut newer = credential(2);
        newer.refresh_token = None;
        store.save(&newer).unwrap();

        assert_eq!(store.load(), Some(newer));
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn missing_or_malformed_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        let store = CredentialStore::new(&path);
        assert_eq!(store.load(), None);

        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(store.load(), None);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("token.json"));
        store.save(&credential(1)).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn unwritable_location_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();
        let store = CredentialStore::new(blocker.join("token.json"));

        let err = store.save(&credential(1)).unwrap_err();
        assert!(err.is_configuration());
        assert!(store.ensure_writable().unwrap_err().is_configuration());
    }

    #[test]
    fn writable_check_leaves_no_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("nested").join("token.json"));

        store.ensure_writable().unwrap();

        let nested = dir.path().join("nested");
        assert!(nested.is_dir());
        assert_eq!(std::fs::read_dir(&nested).unwrap().count(), 0);
        assert_eq!(store.load(), None);
    }
}
